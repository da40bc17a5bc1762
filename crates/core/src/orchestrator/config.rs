//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the collection orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum item runs in flight in streaming mode (0 = unlimited).
    /// When the limit is reached, enumeration waits until a run finishes.
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,
}

fn default_max_concurrent_items() -> usize {
    4
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_items: default_max_concurrent_items(),
        }
    }
}

impl OrchestratorConfig {
    /// Sets the concurrency limit.
    pub fn with_max_concurrent_items(mut self, max: usize) -> Self {
        self.max_concurrent_items = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_concurrent_items, 4);
    }

    #[test]
    fn test_deserialize_unbounded() {
        let toml = r#"
            max_concurrent_items = 0
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_concurrent_items, 0);
    }

    #[test]
    fn test_deserialize_empty() {
        let config: OrchestratorConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_concurrent_items, 4);
    }
}
