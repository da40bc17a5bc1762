//! FFmpeg-based encoder implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::config::EncoderConfig;
use super::error::EncoderError;
use super::traits::MediaEncoder;
use super::types::{
    AudioConstraints, EmbeddedMetadata, EncodeJob, EncodeResult, MediaInfo, MergeJob,
};
use crate::progress::ProgressReporter;

static OUT_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"out_time_ms=(\d+)").expect("out_time pattern is valid"));

/// FFmpeg-based encoder implementation.
pub struct FfmpegEncoder {
    config: EncoderConfig,
}

impl FfmpegEncoder {
    /// Creates a new FFmpeg encoder with the given configuration.
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Creates an encoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EncoderConfig::default())
    }

    /// Returns the encoder configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Builds ffmpeg arguments for a single-input encode.
    ///
    /// `length_secs` is the length of the encoded range, needed to place the
    /// fade-out.
    fn build_encode_args(&self, job: &EncodeJob, length_secs: Option<f64>) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        // Input seek
        if let Some(range) = job.range.filter(|r| r.start_ms > 0) {
            args.extend(["-ss".to_string(), format_secs(range.start_ms)]);
        }

        args.extend([
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
        ]);

        // Range length, relative to the seek point
        if let Some(range) = job.range {
            if let Some(end_ms) = range.end_ms {
                args.extend([
                    "-t".to_string(),
                    format_secs(end_ms.saturating_sub(range.start_ms)),
                ]);
            }
        }

        args.extend([
            "-map".to_string(),
            "0:a:0".to_string(),
            "-vn".to_string(),
        ]);

        // Fade-out at the end of the range
        if let (Some(fade), Some(length)) = (job.fade_out, length_secs) {
            let fade_secs = fade.as_secs_f64().min(length);
            if fade_secs > 0.0 {
                args.extend([
                    "-af".to_string(),
                    format!(
                        "afade=t=out:st={:.3}:d={:.3}",
                        (length - fade_secs).max(0.0),
                        fade_secs
                    ),
                ]);
            }
        }

        self.push_output_args(
            &mut args,
            &job.constraints,
            job.metadata.as_ref(),
            &job.output_path,
        );
        args
    }

    /// Builds ffmpeg arguments for concatenating inputs with the concat filter.
    fn build_merge_args(&self, job: &MergeJob) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        for input in &job.inputs {
            args.extend(["-i".to_string(), input.to_string_lossy().to_string()]);
        }

        let streams: String = (0..job.inputs.len())
            .map(|i| format!("[{}:a:0]", i))
            .collect();
        args.extend([
            "-filter_complex".to_string(),
            format!("{}concat=n={}:v=0:a=1[outa]", streams, job.inputs.len()),
            "-map".to_string(),
            "[outa]".to_string(),
        ]);

        self.push_output_args(
            &mut args,
            &job.constraints,
            job.metadata.as_ref(),
            &job.output_path,
        );
        args
    }

    fn push_output_args(
        &self,
        args: &mut Vec<String>,
        constraints: &AudioConstraints,
        metadata: Option<&EmbeddedMetadata>,
        output_path: &Path,
    ) {
        args.extend(constraints.to_ffmpeg_args());

        // Metadata
        if let Some(metadata) = metadata {
            args.extend(metadata.to_ffmpeg_args());
        }

        // Log level and progress
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push(output_path.to_string_lossy().to_string());
    }

    /// Parses ffprobe JSON output into MediaInfo.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, EncoderError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: String,
            duration: Option<String>,
            size: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            bit_rate: Option<String>,
            sample_rate: Option<String>,
            channels: Option<u8>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| EncoderError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let duration_secs = probe
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let size_bytes = probe
            .format
            .size
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");

        let format_name = probe
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("unknown");

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs,
            format: format_name.to_string(),
            audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
            audio_bitrate_kbps: audio_stream
                .and_then(|s| s.bit_rate.as_ref())
                .and_then(|b| b.parse::<u32>().ok())
                .map(|b| b / 1000),
            audio_sample_rate: audio_stream
                .and_then(|s| s.sample_rate.as_ref())
                .and_then(|r| r.parse::<u32>().ok()),
            audio_channels: audio_stream.and_then(|s| s.channels),
        })
    }

    async fn ensure_parent(path: &Path) -> Result<(), EncoderError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                EncoderError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }
        Ok(())
    }

    /// Runs ffmpeg, reporting `out_time` against `total_secs`.
    async fn run_ffmpeg(
        &self,
        job_id: &str,
        args: &[String],
        total_secs: Option<f64>,
        progress: &dyn ProgressReporter,
    ) -> Result<(), EncoderError> {
        debug!(job_id = %job_id, args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncoderError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    EncoderError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EncoderError::conversion_failed("ffmpeg stderr not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_output = String::new();

            while let Some(line) = reader.next_line().await? {
                // Capture error output
                if line.contains("Error") || line.contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }

                if let Some(secs) = parse_out_time(&line) {
                    if let Some(total) = total_secs.filter(|t| *t > 0.0) {
                        progress.report((secs / total).min(1.0));
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    return Err(EncoderError::conversion_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
                Ok(())
            }
            Ok(Err(e)) => Err(EncoderError::Io(e)),
            Err(_) => {
                // Kill the process on timeout
                let _ = child.kill().await;
                Err(EncoderError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        }
    }

    /// Verifies the output exists and is non-empty, returning its size.
    async fn verify_output(path: &Path) -> Result<u64, EncoderError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| EncoderError::conversion_failed("Output file not created", None))?;

        if meta.len() == 0 {
            return Err(EncoderError::EmptyOutput {
                path: path.to_path_buf(),
            });
        }
        Ok(meta.len())
    }
}

/// Formats milliseconds as ffmpeg seconds.
fn format_secs(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Extracts the processed time in seconds from a `-progress` line.
fn parse_out_time(line: &str) -> Option<f64> {
    let caps = OUT_TIME.captures(line)?;
    // Despite its name, out_time_ms is in microseconds.
    let micros: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(micros / 1_000_000.0)
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, EncoderError> {
        if !path.exists() {
            return Err(EncoderError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncoderError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    EncoderError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(EncoderError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn convert(
        &self,
        job: EncodeJob,
        progress: &dyn ProgressReporter,
    ) -> Result<EncodeResult, EncoderError> {
        let start = Instant::now();

        if !job.input_path.exists() {
            return Err(EncoderError::InputNotFound {
                path: job.input_path.clone(),
            });
        }
        Self::ensure_parent(&job.output_path).await?;

        // Input duration for progress and fade placement
        let input_ms = self
            .probe(&job.input_path)
            .await
            .ok()
            .and_then(|info| info.duration_ms());
        let length_ms = match job.range {
            Some(range) => range.length_ms(input_ms),
            None => input_ms,
        };
        let length_secs = length_ms.map(|ms| ms as f64 / 1000.0);

        let args = self.build_encode_args(&job, length_secs);
        self.run_ffmpeg(&job.job_id, &args, length_secs, progress)
            .await?;

        let output_size_bytes = Self::verify_output(&job.output_path).await?;
        progress.report(1.0);

        Ok(EncodeResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn merge(
        &self,
        job: MergeJob,
        progress: &dyn ProgressReporter,
    ) -> Result<EncodeResult, EncoderError> {
        let start = Instant::now();

        if job.inputs.is_empty() {
            return Err(EncoderError::conversion_failed("No inputs to merge", None));
        }
        if let Some(missing) = job.inputs.iter().find(|p| !p.exists()) {
            return Err(EncoderError::InputNotFound {
                path: missing.clone(),
            });
        }
        Self::ensure_parent(&job.output_path).await?;

        let mut total_secs = 0.0;
        for input in &job.inputs {
            if let Ok(info) = self.probe(input).await {
                total_secs += info.duration_secs.max(0.0);
            }
        }

        let args = self.build_merge_args(&job);
        self.run_ffmpeg(&job.job_id, &args, Some(total_secs), progress)
            .await?;

        let output_size_bytes = Self::verify_output(&job.output_path).await?;
        progress.report(1.0);

        Ok(EncodeResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), EncoderError> {
        // Check ffmpeg exists
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(EncoderError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(EncoderError::Io(e));
        }

        // Check ffprobe exists
        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(EncoderError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(EncoderError::Io(e));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::types::TimeRange;
    use crate::progress::NoProgress;
    use std::path::PathBuf;

    fn job(range: Option<TimeRange>) -> EncodeJob {
        let mut job = EncodeJob::new(
            "item-1",
            "/tmp/in.webm",
            "/out/Album/02 - Second.mp3",
            AudioConstraints::default(),
        );
        job.range = range;
        job
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_build_encode_args_whole_item() {
        let encoder = FfmpegEncoder::with_defaults();
        let args = encoder.build_encode_args(&job(None), Some(180.0));

        assert!(!args.contains(&"-ss".to_string()));
        assert!(!args.contains(&"-t".to_string()));
        assert!(!args.contains(&"-af".to_string()));
        assert_eq!(value_after(&args, "-c:a"), Some("libmp3lame"));
        assert_eq!(value_after(&args, "-q:a"), Some("2"));
        assert_eq!(value_after(&args, "-progress"), Some("pipe:2"));
        assert_eq!(args.last().map(String::as_str), Some("/out/Album/02 - Second.mp3"));
    }

    #[test]
    fn test_build_encode_args_bounded_range() {
        let encoder = FfmpegEncoder::with_defaults();
        let job = job(Some(TimeRange::new(60_000, Some(125_000))));
        let args = encoder.build_encode_args(&job, None);

        assert_eq!(value_after(&args, "-ss"), Some("60.000"));
        assert_eq!(value_after(&args, "-t"), Some("65.000"));
        // Seek goes before the input
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
    }

    #[test]
    fn test_build_encode_args_open_range_has_no_length() {
        let encoder = FfmpegEncoder::with_defaults();
        let job = job(Some(TimeRange::new(125_000, None)));
        let args = encoder.build_encode_args(&job, None);

        assert_eq!(value_after(&args, "-ss"), Some("125.000"));
        assert!(!args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_build_encode_args_fade_out() {
        let encoder = FfmpegEncoder::with_defaults();
        let mut job = job(Some(TimeRange::new(0, Some(60_000))));
        job.fade_out = Some(Duration::from_secs(1));
        job.metadata = Some(EmbeddedMetadata::titled("First"));

        let args = encoder.build_encode_args(&job, Some(60.0));

        assert_eq!(value_after(&args, "-af"), Some("afade=t=out:st=59.000:d=1.000"));
        assert!(args.contains(&"title=First".to_string()));
    }

    #[test]
    fn test_fade_out_skipped_without_length() {
        let encoder = FfmpegEncoder::with_defaults();
        let mut job = job(None);
        job.fade_out = Some(Duration::from_secs(1));

        let args = encoder.build_encode_args(&job, None);
        assert!(!args.contains(&"-af".to_string()));
    }

    #[test]
    fn test_build_merge_args() {
        let encoder = FfmpegEncoder::with_defaults();
        let job = MergeJob {
            job_id: "merge".to_string(),
            inputs: vec![
                PathBuf::from("/tmp/a.webm"),
                PathBuf::from("/tmp/b.webm"),
                PathBuf::from("/tmp/c.webm"),
            ],
            output_path: PathBuf::from("/out/Playlist.mp3"),
            constraints: AudioConstraints::default(),
            metadata: None,
        };

        let args = encoder.build_merge_args(&job);

        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 3);
        assert_eq!(
            value_after(&args, "-filter_complex"),
            Some("[0:a:0][1:a:0][2:a:0]concat=n=3:v=0:a=1[outa]")
        );
        assert_eq!(value_after(&args, "-map"), Some("[outa]"));
    }

    #[test]
    fn test_parse_out_time() {
        assert_eq!(parse_out_time("out_time_ms=1500000"), Some(1.5));
        assert_eq!(parse_out_time("speed=1.5x"), None);
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(0), "0.000");
        assert_eq!(format_secs(125_007), "125.007");
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "format": {
                "filename": "raw.webm",
                "format_name": "matroska,webm",
                "duration": "180.000000",
                "size": "3000000"
            },
            "streams": [
                {
                    "codec_type": "audio",
                    "codec_name": "opus",
                    "sample_rate": "48000",
                    "channels": 2
                }
            ]
        }"#;

        let info = FfmpegEncoder::parse_probe_output(Path::new("raw.webm"), json).unwrap();
        assert_eq!(info.format, "matroska");
        assert_eq!(info.duration_ms(), Some(180_000));
        assert_eq!(info.audio_codec, Some("opus".to_string()));
        assert_eq!(info.audio_sample_rate, Some(48000));
        assert!(info.has_audio());
    }

    #[test]
    fn test_parse_probe_output_without_audio() {
        let json = r#"{
            "format": {"format_name": "mp4", "duration": "10.0"},
            "streams": [{"codec_type": "video", "codec_name": "h264"}]
        }"#;

        let info = FfmpegEncoder::parse_probe_output(Path::new("v.mp4"), json).unwrap();
        assert!(!info.has_audio());
    }

    #[tokio::test]
    async fn test_convert_missing_input() {
        let encoder = FfmpegEncoder::with_defaults();
        let err = encoder
            .convert(job(None), &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, EncoderError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_verify_output_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mp3");
        tokio::fs::write(&path, b"").await.unwrap();

        let err = FfmpegEncoder::verify_output(&path).await.unwrap_err();
        assert!(matches!(err, EncoderError::EmptyOutput { .. }));

        tokio::fs::write(&path, b"ID3").await.unwrap();
        assert_eq!(FfmpegEncoder::verify_output(&path).await.unwrap(), 3);
    }
}
