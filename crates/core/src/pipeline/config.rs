//! Configuration for the item pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for item runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root under which each run creates its scoped temporary directory.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("audiodrop")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
        }
    }
}

impl PipelineConfig {
    /// Sets the temp root.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }
}
