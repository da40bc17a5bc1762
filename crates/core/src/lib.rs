//! Acquisition and conversion of online media into audio files.
//!
//! A [`MediaSource`] resolves URLs and downloads raw media, a
//! [`MediaEncoder`] turns it into audio artifacts, and the [`ItemPipeline`]
//! and [`CollectionOrchestrator`] drive one item or a whole collection
//! through both. [`AudioDrop`] is the entry point that wires them together.

pub mod config;
pub mod encoder;
pub mod filter;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod segment;
pub mod service;
pub mod source;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config,
    ConfigError,
};
pub use encoder::{
    AudioConstraints, AudioFormat, EncoderConfig, EncoderError, FfmpegEncoder, MediaEncoder,
};
pub use filter::{FilterSet, IdFilter, ItemFilter};
pub use orchestrator::{
    CollectionOptions, CollectionOrchestrator, CollectionReport, CollectionState, ItemFailure,
    OrchestratorConfig, OrchestratorError,
};
pub use pipeline::{
    ConversionOptions, ErrorKind, ItemArtifacts, ItemPipeline, PipelineConfig, PipelineError,
};
pub use progress::{CollectionProgress, ItemProgress, ProgressReporter, ProgressSink, Stage};
pub use segment::{plan_segments, Marker, Segment, SegmentEnd, SegmentError};
pub use service::{AudioDrop, Outcome, ProcessRequest, ServiceError};
pub use source::{
    CollectionInfo, CollectionItem, ItemInfo, MediaItem, MediaSource, SourceConfig, SourceError,
    UrlKind, YtDlpSource,
};
