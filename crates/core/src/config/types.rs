use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::encoder::EncoderConfig;
pub use crate::orchestrator::OrchestratorConfig;
pub use crate::pipeline::PipelineConfig;
pub use crate::source::SourceConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory artifacts are written under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            source: SourceConfig::default(),
            encoder: EncoderConfig::default(),
            pipeline: PipelineConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}
