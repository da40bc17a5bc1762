//! Types for the encoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::segment::{Segment, SegmentEnd};

/// Audio format specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// MPEG Audio Layer III
    Mp3,
    /// Advanced Audio Coding
    Aac,
    /// Ogg Vorbis
    OggVorbis,
    /// Opus (modern, efficient)
    Opus,
    /// Free Lossless Audio Codec (lossless)
    Flac,
    /// WAVE (uncompressed)
    Wav,
}

impl AudioFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Aac => "m4a",
            Self::OggVorbis => "ogg",
            Self::Opus => "opus",
            Self::Flac => "flac",
            Self::Wav => "wav",
        }
    }

    /// Returns the ffmpeg codec name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Aac => "aac",
            Self::OggVorbis => "libvorbis",
            Self::Opus => "libopus",
            Self::Flac => "flac",
            Self::Wav => "pcm_s16le",
        }
    }

    /// Whether this format is lossless.
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Flac | Self::Wav)
    }
}

/// Constraints for audio encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConstraints {
    /// Target audio format.
    #[serde(default = "default_format")]
    pub format: AudioFormat,
    /// Target bitrate in kbps (for lossy formats). Takes precedence over quality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    /// Variable bitrate quality (`-q:a`), lower is better for MP3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Target sample rate in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate_hz: Option<u32>,
    /// Number of audio channels (1 = mono, 2 = stereo).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
}

fn default_format() -> AudioFormat {
    AudioFormat::Mp3
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            format: default_format(),
            bitrate_kbps: None,
            quality: Some(2),
            sample_rate_hz: None, // Keep original
            channels: None,       // Keep original
        }
    }
}

impl AudioConstraints {
    /// ffmpeg arguments selecting codec and quality.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec!["-c:a".to_string(), self.format.ffmpeg_codec().to_string()];

        if !self.format.is_lossless() {
            if let Some(bitrate) = self.bitrate_kbps {
                args.extend(["-b:a".to_string(), format!("{}k", bitrate)]);
            } else if let Some(quality) = self.quality {
                args.extend(["-q:a".to_string(), quality.to_string()]);
            }
        }

        if let Some(rate) = self.sample_rate_hz {
            args.extend(["-ar".to_string(), rate.to_string()]);
        }

        if let Some(channels) = self.channels {
            args.extend(["-ac".to_string(), channels.to_string()]);
        }

        args
    }
}

/// Metadata to embed in the output file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedMetadata {
    /// Track title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Artist/creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// Album name (the source item for split parts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Track number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u16>,
    /// Total tracks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_total: Option<u16>,
    /// Comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl EmbeddedMetadata {
    /// Metadata carrying only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Convert to ffmpeg metadata arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(ref title) = self.title {
            args.extend(["-metadata".to_string(), format!("title={}", title)]);
        }
        if let Some(ref artist) = self.artist {
            args.extend(["-metadata".to_string(), format!("artist={}", artist)]);
        }
        if let Some(ref album) = self.album {
            args.extend(["-metadata".to_string(), format!("album={}", album)]);
        }
        if let Some(track) = self.track_number {
            if let Some(total) = self.track_total {
                args.extend(["-metadata".to_string(), format!("track={}/{}", track, total)]);
            } else {
                args.extend(["-metadata".to_string(), format!("track={}", track)]);
            }
        }
        if let Some(ref comment) = self.comment {
            args.extend(["-metadata".to_string(), format!("comment={}", comment)]);
        }

        args
    }
}

/// A time window of the input to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start offset in milliseconds.
    pub start_ms: u64,
    /// Exclusive end offset in milliseconds; `None` runs to the end of input.
    pub end_ms: Option<u64>,
}

impl TimeRange {
    /// Range covering `[start_ms, end_ms)`.
    pub fn new(start_ms: u64, end_ms: Option<u64>) -> Self {
        Self { start_ms, end_ms }
    }

    /// Length of the range, given the input's total length if known.
    pub fn length_ms(&self, total_ms: Option<u64>) -> Option<u64> {
        self.end_ms
            .or(total_ms)
            .map(|end| end.saturating_sub(self.start_ms))
    }

    /// Whether the range covers the whole input.
    pub fn is_whole(&self) -> bool {
        self.start_ms == 0 && self.end_ms.is_none()
    }
}

impl From<&Segment> for TimeRange {
    fn from(segment: &Segment) -> Self {
        let end_ms = match segment.end {
            SegmentEnd::At(ms) => Some(ms),
            SegmentEnd::EndOfMedia => None,
        };
        Self::new(segment.start_ms, end_ms)
    }
}

/// A single-input encoding request.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// Job ID, used in logs.
    pub job_id: String,
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path.
    pub output_path: PathBuf,
    /// Portion of the input to encode; `None` encodes everything.
    pub range: Option<TimeRange>,
    /// Encoding constraints.
    pub constraints: AudioConstraints,
    /// Metadata to embed.
    pub metadata: Option<EmbeddedMetadata>,
    /// Fade-out applied to the end of the output.
    pub fade_out: Option<Duration>,
}

impl EncodeJob {
    /// Whole-input job with default options.
    pub fn new(
        job_id: impl Into<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        constraints: AudioConstraints,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            range: None,
            constraints,
            metadata: None,
            fade_out: None,
        }
    }
}

/// A multi-input concatenation request.
#[derive(Debug, Clone)]
pub struct MergeJob {
    /// Job ID, used in logs.
    pub job_id: String,
    /// Inputs in output order.
    pub inputs: Vec<PathBuf>,
    /// Output file path.
    pub output_path: PathBuf,
    /// Encoding constraints.
    pub constraints: AudioConstraints,
    /// Metadata to embed.
    pub metadata: Option<EmbeddedMetadata>,
}

/// Result of a successful encode or merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeResult {
    /// Job ID.
    pub job_id: String,
    /// Output file path.
    pub output_path: PathBuf,
    /// Output file size in bytes.
    pub output_size_bytes: u64,
    /// Wall-clock encoding time in milliseconds.
    pub duration_ms: u64,
}

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// File path.
    pub path: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Container format (e.g., "webm", "mp4").
    pub format: String,
    /// Audio codec (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    /// Audio bitrate in kbps (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bitrate_kbps: Option<u32>,
    /// Audio sample rate (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_sample_rate: Option<u32>,
    /// Audio channels (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u8>,
}

impl MediaInfo {
    /// Whether the file carries an audio stream.
    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }

    /// Duration in milliseconds, if the container reports one.
    pub fn duration_ms(&self) -> Option<u64> {
        if self.duration_secs.is_finite() && self.duration_secs > 0.0 {
            Some((self.duration_secs * 1000.0).round() as u64)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_extension() {
        assert_eq!(AudioFormat::Mp3.extension(), "mp3");
        assert_eq!(AudioFormat::Aac.extension(), "m4a");
        assert_eq!(AudioFormat::OggVorbis.extension(), "ogg");
        assert_eq!(AudioFormat::Opus.extension(), "opus");
    }

    #[test]
    fn test_default_constraints_use_vbr_quality() {
        let args = AudioConstraints::default().to_ffmpeg_args();
        assert_eq!(args, vec!["-c:a", "libmp3lame", "-q:a", "2"]);
    }

    #[test]
    fn test_bitrate_wins_over_quality() {
        let constraints = AudioConstraints {
            format: AudioFormat::Opus,
            bitrate_kbps: Some(160),
            quality: Some(5),
            sample_rate_hz: Some(48000),
            channels: Some(2),
        };
        let args = constraints.to_ffmpeg_args();
        assert!(args.contains(&"160k".to_string()));
        assert!(!args.contains(&"-q:a".to_string()));
        assert!(args.contains(&"48000".to_string()));
    }

    #[test]
    fn test_lossless_ignores_bitrate() {
        let constraints = AudioConstraints {
            format: AudioFormat::Flac,
            bitrate_kbps: Some(320),
            ..Default::default()
        };
        assert_eq!(constraints.to_ffmpeg_args(), vec!["-c:a", "flac"]);
    }

    #[test]
    fn test_embedded_metadata_to_ffmpeg_args() {
        let metadata = EmbeddedMetadata {
            title: Some("Second".to_string()),
            album: Some("Live Set".to_string()),
            track_number: Some(2),
            track_total: Some(3),
            ..Default::default()
        };

        let args = metadata.to_ffmpeg_args();
        assert!(args.contains(&"title=Second".to_string()));
        assert!(args.contains(&"album=Live Set".to_string()));
        assert!(args.contains(&"track=2/3".to_string()));
    }

    #[test]
    fn test_time_range_from_segment() {
        let bounded = Segment {
            name: "A".to_string(),
            start_ms: 60_000,
            end: SegmentEnd::At(125_000),
        };
        let range = TimeRange::from(&bounded);
        assert_eq!(range, TimeRange::new(60_000, Some(125_000)));
        assert_eq!(range.length_ms(None), Some(65_000));

        let open = Segment::whole("B");
        let range = TimeRange::from(&open);
        assert!(range.is_whole());
        assert_eq!(range.length_ms(None), None);
        assert_eq!(range.length_ms(Some(180_000)), Some(180_000));
    }

    #[test]
    fn test_media_info_duration_ms() {
        let info = MediaInfo {
            path: PathBuf::from("a.webm"),
            size_bytes: 1,
            duration_secs: 180.25,
            format: "webm".to_string(),
            audio_codec: Some("opus".to_string()),
            audio_bitrate_kbps: None,
            audio_sample_rate: None,
            audio_channels: None,
        };
        assert_eq!(info.duration_ms(), Some(180_250));
        assert!(info.has_audio());
    }
}
