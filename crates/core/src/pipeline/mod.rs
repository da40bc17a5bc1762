//! Item pipeline: one media item from download to audio artifacts.
//!
//! A run downloads the raw media into a scoped temporary directory, probes
//! it, converts it whole or split along its chapter markers, and deletes the
//! temporary directory whatever the outcome.
//!
//! # Example
//!
//! ```ignore
//! use audiodrop_core::pipeline::{ConversionOptions, ItemPipeline, PipelineConfig};
//! use audiodrop_core::progress::ProgressSink;
//!
//! let pipeline = ItemPipeline::new(PipelineConfig::default(), source, encoder);
//! let sink = ProgressSink::new();
//! let artifacts = pipeline
//!     .run(&item, &ConversionOptions::split(), Path::new("/music"), Some(&sink), &cancel)
//!     .await?;
//! ```

mod config;
mod error;
mod item;
mod naming;
mod types;

pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError};
pub use item::ItemPipeline;
pub use naming::{item_artifact_path, item_stem, sanitize_filename, segment_artifact_path};
pub use types::{ConversionOptions, DownloadedItem, ItemArtifacts};

pub(crate) use item::cancellable;
