//! Collection orchestrator.
//!
//! Runs every accepted member of a collection through the item pipeline:
//! - **Streaming**: concurrent item runs, bounded by `max_concurrent_items`,
//!   each producing its own artifacts. Failures land in the report.
//! - **Bulk merge**: sequential downloads, then one concatenated artifact.
//!   All-or-nothing.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{prepare_output_dir, CollectionOrchestrator};
pub use types::{
    CollectionOptions, CollectionReport, CollectionState, ItemFailure, OrchestratorError,
};
