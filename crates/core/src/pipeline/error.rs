//! Error types for the item pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::encoder::EncoderError;
use crate::source::SourceError;

/// Errors that abort a single item run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The media source failed to resolve or download the item.
    #[error("Source error: {0}")]
    Source(SourceError),

    /// The item has no audio stream.
    #[error("No audio stream found for item {item_id}")]
    NoAudioStream { item_id: String },

    /// The encoder failed.
    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    /// The scoped temporary directory could not be created.
    #[error("Failed to create temporary directory under {path}: {source}")]
    TempDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled.
    #[error("Item run cancelled")]
    Cancelled,

    /// The run panicked.
    #[error("Item run panicked: {reason}")]
    Panicked { reason: String },
}

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceUnavailable,
    NoAudioStream,
    EncoderFailure,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceUnavailable => "source_unavailable",
            Self::NoAudioStream => "no_audio_stream",
            Self::EncoderFailure => "encoder_failure",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl PipelineError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Source(_) => ErrorKind::SourceUnavailable,
            Self::NoAudioStream { .. } => ErrorKind::NoAudioStream,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Encoder(_) => ErrorKind::EncoderFailure,
            Self::TempDir { .. } | Self::Panicked { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the run ended because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    /// Whether running the item again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source(SourceError::Timeout { .. } | SourceError::Io(_)) => true,
            Self::Encoder(e) => e.is_retryable(),
            Self::TempDir { .. } => true,
            _ => false,
        }
    }
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NoAudioStream { item_id } => Self::NoAudioStream { item_id },
            other => Self::Source(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_no_audio_maps_to_no_audio_stream() {
        let err = PipelineError::from(SourceError::NoAudioStream {
            item_id: "v1".to_string(),
        });
        assert!(matches!(err, PipelineError::NoAudioStream { ref item_id } if item_id == "v1"));
        assert_eq!(err.kind(), ErrorKind::NoAudioStream);
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            PipelineError::from(SourceError::unavailable("gone")).kind(),
            ErrorKind::SourceUnavailable
        );
        assert_eq!(
            PipelineError::from(EncoderError::conversion_failed("boom", None)).kind(),
            ErrorKind::EncoderFailure
        );
        assert!(PipelineError::Cancelled.is_cancelled());
        assert_eq!(
            PipelineError::Panicked {
                reason: "oops".to_string()
            }
            .kind()
            .as_str(),
            "internal"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(PipelineError::from(SourceError::Timeout { timeout_secs: 30 }).is_retryable());
        assert!(PipelineError::from(EncoderError::Timeout { timeout_secs: 30 }).is_retryable());
        assert!(!PipelineError::from(SourceError::unavailable("gone")).is_retryable());
        assert!(
            !PipelineError::from(EncoderError::conversion_failed("boom", None)).is_retryable()
        );
        assert!(!PipelineError::NoAudioStream {
            item_id: "v1".to_string()
        }
        .is_retryable());
        assert!(!PipelineError::Cancelled.is_retryable());
    }
}
