//! Error types for the media source module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to a media source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The URL is not an item or collection this source understands.
    #[error("Unsupported URL: {url}")]
    UnsupportedUrl { url: String },

    /// The item or collection cannot be resolved or fetched.
    #[error("Media unavailable: {reason}")]
    Unavailable { reason: String },

    /// The item has no audio stream to extract.
    #[error("No audio stream found for item {item_id}")]
    NoAudioStream { item_id: String },

    /// No chapter markers could be extracted.
    #[error("Chapter markers unavailable: {reason}")]
    MarkersUnavailable { reason: String },

    /// The backing tool is not installed.
    #[error("Tool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// The backing tool exited with an error.
    #[error("Source command failed: {reason}")]
    CommandFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The source produced output we could not parse.
    #[error("Failed to parse source output: {reason}")]
    Parse { reason: String },

    /// The operation did not finish in time.
    #[error("Source operation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a command failed error with stderr output.
    pub fn command_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::CommandFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }
}
