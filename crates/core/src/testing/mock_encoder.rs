//! Mock encoder for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::encoder::{EncodeJob, EncodeResult, EncoderError, MediaEncoder, MediaInfo, MergeJob};
use crate::progress::ProgressReporter;

/// A recorded encoder job for test assertions.
#[derive(Debug, Clone)]
pub enum RecordedJob {
    Convert(EncodeJob),
    Merge(MergeJob),
}

impl RecordedJob {
    /// The convert job, if this was one.
    pub fn as_convert(&self) -> Option<&EncodeJob> {
        match self {
            Self::Convert(job) => Some(job),
            Self::Merge(_) => None,
        }
    }

    /// The merge job, if this was one.
    pub fn as_merge(&self) -> Option<&MergeJob> {
        match self {
            Self::Merge(job) => Some(job),
            Self::Convert(_) => None,
        }
    }
}

/// Mock implementation of the MediaEncoder trait.
///
/// Inputs are identified by file stem, which for [`MockSource`] downloads is
/// the item ID. Provides controllable behavior for testing:
/// - Per-input probe durations and missing audio streams
/// - Per-input conversion failures and panics
/// - Merge failure
/// - Track submitted jobs for assertions
///
/// Successful jobs write a small non-empty output file.
///
/// [`MockSource`]: super::MockSource
#[derive(Debug, Clone)]
pub struct MockEncoder {
    jobs: Arc<RwLock<Vec<RecordedJob>>>,
    durations: Arc<RwLock<HashMap<String, Duration>>>,
    default_duration: Arc<RwLock<Duration>>,
    silent_inputs: Arc<RwLock<HashSet<String>>>,
    failing_inputs: Arc<RwLock<HashSet<String>>>,
    panicking_inputs: Arc<RwLock<HashSet<String>>>,
    fail_merge: Arc<RwLock<bool>>,
    convert_delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn input_key(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn write_output(path: &Path, label: &str) -> Result<u64, EncoderError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = format!("encoded {}", label);
    tokio::fs::write(path, &contents).await?;
    Ok(contents.len() as u64)
}

impl MockEncoder {
    /// Create a new mock encoder. Probed inputs last 180 seconds by default.
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            durations: Arc::new(RwLock::new(HashMap::new())),
            default_duration: Arc::new(RwLock::new(Duration::from_secs(180))),
            silent_inputs: Arc::new(RwLock::new(HashSet::new())),
            failing_inputs: Arc::new(RwLock::new(HashSet::new())),
            panicking_inputs: Arc::new(RwLock::new(HashSet::new())),
            fail_merge: Arc::new(RwLock::new(false)),
            convert_delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets the probed duration of one input.
    pub async fn set_duration(&self, input: &str, duration: Duration) {
        self.durations
            .write()
            .await
            .insert(input.to_string(), duration);
    }

    /// Sets the probed duration of inputs without their own.
    pub async fn set_default_duration(&self, duration: Duration) {
        *self.default_duration.write().await = duration;
    }

    /// Makes the probe of an input report no audio stream.
    pub async fn set_no_audio(&self, input: &str) {
        self.silent_inputs.write().await.insert(input.to_string());
    }

    /// Makes every conversion of an input fail.
    pub async fn fail_convert(&self, input: &str) {
        self.failing_inputs.write().await.insert(input.to_string());
    }

    /// Makes every conversion of an input panic.
    pub async fn panic_on_convert(&self, input: &str) {
        self.panicking_inputs
            .write()
            .await
            .insert(input.to_string());
    }

    /// Makes merges fail.
    pub async fn fail_merges(&self) {
        *self.fail_merge.write().await = true;
    }

    /// Delays every conversion by `delay`.
    pub async fn set_convert_delay(&self, delay: Duration) {
        *self.convert_delay.write().await = Some(delay);
    }

    /// Every submitted job, in call order.
    pub async fn recorded_jobs(&self) -> Vec<RecordedJob> {
        self.jobs.read().await.clone()
    }

    /// Submitted convert jobs, in call order.
    pub async fn convert_jobs(&self) -> Vec<EncodeJob> {
        self.jobs
            .read()
            .await
            .iter()
            .filter_map(|job| job.as_convert().cloned())
            .collect()
    }

    /// Submitted merge jobs, in call order.
    pub async fn merge_jobs(&self) -> Vec<MergeJob> {
        self.jobs
            .read()
            .await
            .iter()
            .filter_map(|job| job.as_merge().cloned())
            .collect()
    }
}

#[async_trait]
impl MediaEncoder for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, EncoderError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| EncoderError::InputNotFound {
                path: path.to_path_buf(),
            })?;

        let key = input_key(path);
        let duration = match self.durations.read().await.get(&key) {
            Some(duration) => *duration,
            None => *self.default_duration.read().await,
        };
        let silent = self.silent_inputs.read().await.contains(&key);

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            duration_secs: duration.as_secs_f64(),
            format: "webm".to_string(),
            audio_codec: (!silent).then(|| "opus".to_string()),
            audio_bitrate_kbps: (!silent).then_some(160),
            audio_sample_rate: (!silent).then_some(48_000),
            audio_channels: (!silent).then_some(2),
        })
    }

    async fn convert(
        &self,
        job: EncodeJob,
        progress: &dyn ProgressReporter,
    ) -> Result<EncodeResult, EncoderError> {
        self.jobs
            .write()
            .await
            .push(RecordedJob::Convert(job.clone()));

        let key = input_key(&job.input_path);
        if self.panicking_inputs.read().await.contains(&key) {
            panic!("mock encoder panic for {}", key);
        }
        if self.failing_inputs.read().await.contains(&key) {
            return Err(EncoderError::conversion_failed(
                format!("mock failure for {}", key),
                None,
            ));
        }

        progress.report(0.5);
        let delay = *self.convert_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let size = write_output(&job.output_path, &key).await?;
        progress.report(1.0);

        Ok(EncodeResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: size,
            duration_ms: 1,
        })
    }

    async fn merge(
        &self,
        job: MergeJob,
        progress: &dyn ProgressReporter,
    ) -> Result<EncodeResult, EncoderError> {
        self.jobs.write().await.push(RecordedJob::Merge(job.clone()));

        if *self.fail_merge.read().await {
            return Err(EncoderError::conversion_failed("mock merge failure", None));
        }

        let inputs = job.inputs.len().max(1);
        for done in 1..=inputs {
            progress.report(done as f64 / inputs as f64);
        }

        let size = write_output(&job.output_path, &job.job_id).await?;
        Ok(EncodeResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: size,
            duration_ms: 1,
        })
    }

    async fn validate(&self) -> Result<(), EncoderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::AudioConstraints;
    use crate::progress::NoProgress;

    #[tokio::test]
    async fn test_probe_uses_configured_duration() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.webm");
        std::fs::write(&input, b"raw").unwrap();

        let encoder = MockEncoder::new();
        encoder.set_duration("a", Duration::from_secs(42)).await;

        let info = encoder.probe(&input).await.unwrap();
        assert_eq!(info.duration_ms(), Some(42_000));
        assert!(info.has_audio());
    }

    #[tokio::test]
    async fn test_probe_missing_input() {
        let encoder = MockEncoder::new();
        let result = encoder.probe(Path::new("/nonexistent/a.webm")).await;
        assert!(matches!(result, Err(EncoderError::InputNotFound { .. })));
    }

    #[tokio::test]
    async fn test_convert_failure_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = MockEncoder::new();
        encoder.fail_convert("b").await;

        let job = EncodeJob::new(
            "job-1",
            dir.path().join("b.webm"),
            dir.path().join("out/B.mp3"),
            AudioConstraints::default(),
        );
        let result = encoder.convert(job, &NoProgress).await;

        assert!(result.is_err());
        assert_eq!(encoder.convert_jobs().await.len(), 1);
        assert!(!dir.path().join("out/B.mp3").exists());
    }

    #[tokio::test]
    async fn test_convert_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = MockEncoder::new();
        let output = dir.path().join("out/A.mp3");

        let job = EncodeJob::new(
            "job-1",
            dir.path().join("a.webm"),
            output.clone(),
            AudioConstraints::default(),
        );
        let result = encoder.convert(job, &NoProgress).await.unwrap();

        assert_eq!(result.output_path, output);
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }
}
