//! Trait definitions for the encoder module.

use async_trait::async_trait;
use std::path::Path;

use super::error::EncoderError;
use super::types::{EncodeJob, EncodeResult, MediaInfo, MergeJob};
use crate::progress::ProgressReporter;

/// An encoder that transcodes, trims and concatenates audio.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Returns the name of this encoder implementation.
    fn name(&self) -> &str;

    /// Probes a media file to get its information.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, EncoderError>;

    /// Encodes one input (or a time range of it) into one output.
    ///
    /// Progress is reported as the fraction of the encoded range processed.
    async fn convert(
        &self,
        job: EncodeJob,
        progress: &dyn ProgressReporter,
    ) -> Result<EncodeResult, EncoderError>;

    /// Concatenates several inputs, in order, into one output.
    ///
    /// Progress is reported as the fraction of the combined input duration
    /// processed.
    async fn merge(
        &self,
        job: MergeJob,
        progress: &dyn ProgressReporter,
    ) -> Result<EncodeResult, EncoderError>;

    /// Validates that the encoder is properly configured and ready.
    async fn validate(&self) -> Result<(), EncoderError>;
}
