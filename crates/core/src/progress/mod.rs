//! Progress tracking for item downloads and conversions.
//!
//! Every item carries a [`ProgressSink`] with two independent stages
//! (download and conversion). Each stage is a monotonic fraction in
//! `[0.0, 1.0]`; the combined value is the mean of both stages and is
//! published to observers on every update.
//!
//! Collaborators never see a sink directly. They receive a
//! [`ProgressReporter`], which lets the pipeline rescale sub-task progress
//! (one segment out of many, one input out of a merge) before it lands in
//! the sink.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use audiodrop_core::progress::{ProgressSink, ProgressReporter, Stage};
//!
//! let sink = Arc::new(ProgressSink::new());
//! let mut rx = sink.subscribe();
//!
//! sink.reporter(Stage::Download).report(0.5);
//! assert_eq!(rx.borrow_and_update().combined(), 0.25);
//! ```

mod collection;
mod reporter;
mod sink;

pub use collection::CollectionProgress;
pub use reporter::{
    MergeProgressFanout, NoProgress, ProgressReporter, ScaledReporter, StageReporter,
};
pub use sink::{ItemProgress, ProgressSink, Stage};
