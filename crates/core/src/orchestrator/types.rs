//! Types for the collection orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::filter::{FilterSet, ItemFilter};
use crate::pipeline::{ConversionOptions, ErrorKind, ItemArtifacts, PipelineError};
use crate::source::{CollectionInfo, SourceError};

/// Errors that abort a whole collection run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The output directory is unusable.
    #[error("invalid output directory {path}: {reason}")]
    InvalidOutputDir { path: PathBuf, reason: String },

    /// A bulk-mode download or probe failed; nothing was merged.
    #[error("bulk download failed for item {item_id}: {source}")]
    BulkDownloadFailed {
        item_id: String,
        #[source]
        source: PipelineError,
    },

    /// The bulk-mode merge failed.
    #[error("merge failed: {0}")]
    MergeFailed(#[source] PipelineError),

    /// The media source failed outside of an item run.
    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

/// Options for one collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// Exclusion filters; an item is skipped if any filter flags it.
    pub filters: FilterSet,
    /// Merge all accepted items into one artifact instead of one per item.
    pub concatenate: bool,
    /// Options for items without an override.
    pub default_options: ConversionOptions,
    /// Per-item options keyed by item identity.
    pub overrides: HashMap<String, ConversionOptions>,
}

impl CollectionOptions {
    /// Options with no filters, no merge and no splitting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exclusion filter.
    pub fn with_filter(mut self, filter: impl ItemFilter + 'static) -> Self {
        self.filters = self.filters.with(filter);
        self
    }

    /// Enables bulk-merge mode.
    pub fn concatenated(mut self) -> Self {
        self.concatenate = true;
        self
    }

    /// Sets the options for items without an override.
    pub fn with_default_options(mut self, options: ConversionOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Overrides the options of one item.
    pub fn with_override(mut self, item_id: impl Into<String>, options: ConversionOptions) -> Self {
        self.overrides.insert(item_id.into(), options);
        self
    }

    /// Effective options for an item.
    pub fn options_for(&self, item_id: &str) -> ConversionOptions {
        self.overrides
            .get(item_id)
            .copied()
            .unwrap_or(self.default_options)
    }
}

/// Where a collection run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
    /// Pulling the next member from the source.
    Enumerating,
    /// Checking a member against the filters.
    Filtering,
    /// Starting work for an accepted member.
    Dispatching,
    /// Enumeration finished; waiting for work in flight.
    Awaiting,
    /// Every accepted item succeeded.
    Completed,
    /// At least one item or the enumeration failed.
    CompletedWithErrors,
    /// The run was cancelled.
    Cancelled,
}

impl CollectionState {
    /// Whether the run is over.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Cancelled
        )
    }
}

/// A failed item (or a failed enumeration, keyed by the collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Item identity, or the collection identity for enumeration errors.
    pub item_id: String,
    /// Item title, if known.
    pub title: String,
    /// Failure classification.
    pub kind: ErrorKind,
    /// Human-readable error.
    pub error: String,
    /// Whether running the item again may succeed.
    #[serde(default)]
    pub retryable: bool,
}

impl ItemFailure {
    /// Failure of one item run.
    pub fn item(item_id: impl Into<String>, title: impl Into<String>, err: &PipelineError) -> Self {
        Self {
            item_id: item_id.into(),
            title: title.into(),
            kind: err.kind(),
            error: err.to_string(),
            retryable: err.is_retryable(),
        }
    }

    /// Enumeration failure, recorded against the collection.
    pub fn enumeration(collection: &CollectionInfo, err: &SourceError) -> Self {
        Self {
            item_id: collection.id.clone(),
            title: collection.title.clone(),
            kind: ErrorKind::SourceUnavailable,
            error: err.to_string(),
            retryable: matches!(err, SourceError::Timeout { .. } | SourceError::Io(_)),
        }
    }
}

/// Outcome of a collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReport {
    /// Unique ID of this run.
    pub run_id: String,
    /// Collection identity.
    pub collection_id: String,
    /// Collection title.
    pub title: String,
    /// Final state.
    pub state: CollectionState,
    /// Artifacts per successful item (one merged entry in bulk mode).
    pub artifacts: Vec<ItemArtifacts>,
    /// Failed items.
    pub failures: Vec<ItemFailure>,
    /// Members skipped by filters.
    pub excluded: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl CollectionReport {
    /// Empty report for a run that is starting now.
    pub fn new(collection: &CollectionInfo) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            collection_id: collection.id.clone(),
            title: collection.title.clone(),
            state: CollectionState::Enumerating,
            artifacts: Vec::new(),
            failures: Vec::new(),
            excluded: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Closes the report with `state`.
    pub fn finish(&mut self, state: CollectionState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }

    /// Whether the run completed without failures.
    pub fn is_success(&self) -> bool {
        self.state == CollectionState::Completed
    }

    /// All produced files.
    pub fn artifact_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.artifacts.iter().flat_map(|a| a.artifacts.iter())
    }
}
