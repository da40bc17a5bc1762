//! Configuration for the media source module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the yt-dlp based source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// yt-dlp format selector for audio downloads.
    #[serde(default = "default_format_selector")]
    pub format_selector: String,

    /// Timeout for metadata requests in seconds.
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,

    /// Timeout for a single download in seconds.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Additional yt-dlp arguments, added to every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_format_selector() -> String {
    "bestaudio/best".to_string()
}

fn default_metadata_timeout() -> u64 {
    120
}

fn default_download_timeout() -> u64 {
    3600 // 1 hour
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            format_selector: default_format_selector(),
            metadata_timeout_secs: default_metadata_timeout(),
            download_timeout_secs: default_download_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl SourceConfig {
    /// Creates a config with a custom yt-dlp path.
    pub fn with_path(ytdlp_path: PathBuf) -> Self {
        Self {
            ytdlp_path,
            ..Default::default()
        }
    }

    /// Sets the format selector.
    pub fn with_format(mut self, selector: impl Into<String>) -> Self {
        self.format_selector = selector.into();
        self
    }

    /// Sets the download timeout in seconds.
    pub fn with_download_timeout(mut self, timeout_secs: u64) -> Self {
        self.download_timeout_secs = timeout_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SourceConfig::default();
        assert_eq!(config.ytdlp_path, PathBuf::from("yt-dlp"));
        assert_eq!(config.format_selector, "bestaudio/best");
        assert_eq!(config.download_timeout_secs, 3600);
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: SourceConfig = toml::from_str(r#"ytdlp_path = "/opt/yt-dlp""#).unwrap();
        assert_eq!(config.ytdlp_path, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(config.metadata_timeout_secs, 120);
        assert!(config.extra_args.is_empty());
    }
}
