//! Caller-facing entry points.
//!
//! [`AudioDrop`] wires a media source and an encoder into an item pipeline
//! and a collection orchestrator, and resolves URLs into item or collection
//! runs.
//!
//! # Example
//!
//! ```ignore
//! use audiodrop_core::service::{AudioDrop, ProcessRequest};
//! use audiodrop_core::load_config;
//!
//! let config = load_config(Path::new("audiodrop.toml"))?;
//! let service = AudioDrop::from_config(&config);
//! service.validate().await?;
//!
//! let outcome = service
//!     .process_url(url, &ProcessRequest::default(), &config.output_dir, &cancel)
//!     .await?;
//! ```

use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::encoder::{EncoderError, FfmpegEncoder, MediaEncoder};
use crate::orchestrator::{
    prepare_output_dir, CollectionOptions, CollectionOrchestrator, CollectionReport,
    OrchestratorError,
};
use crate::pipeline::{ConversionOptions, ItemArtifacts, ItemPipeline, PipelineError};
use crate::progress::{CollectionProgress, ProgressSink};
use crate::source::{
    CollectionInfo, CollectionItem, ItemInfo, MediaItem, MediaSource, SourceError, UrlKind,
    YtDlpSource,
};

/// Errors returned by the service facade.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unsupported url: {url}")]
    UnsupportedUrl { url: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl ServiceError {
    fn unsupported(url: &str) -> Self {
        Self::UnsupportedUrl {
            url: url.to_string(),
        }
    }
}

/// What to do with a URL of either kind.
#[derive(Debug, Default)]
pub struct ProcessRequest {
    /// Filters, merge mode and per-item options. A single item uses its
    /// override if one exists, otherwise the default options.
    pub options: CollectionOptions,
    /// Progress sinks keyed by item identity.
    pub progress: CollectionProgress,
}

impl ProcessRequest {
    pub fn new(options: CollectionOptions) -> Self {
        Self {
            options,
            progress: CollectionProgress::new(),
        }
    }

    pub fn with_progress(mut self, progress: CollectionProgress) -> Self {
        self.progress = progress;
        self
    }
}

/// Result of [`AudioDrop::process_url`].
#[derive(Debug, Clone)]
pub enum Outcome {
    Item(ItemArtifacts),
    Collection(CollectionReport),
}

impl Outcome {
    /// Whether everything requested was produced.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Item(_) => true,
            Self::Collection(report) => report.is_success(),
        }
    }

    /// All produced files.
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        match self {
            Self::Item(artifacts) => artifacts.artifacts.clone(),
            Self::Collection(report) => report.artifact_paths().cloned().collect(),
        }
    }
}

/// Acquires media from a source and converts it into audio artifacts.
pub struct AudioDrop<S: MediaSource, E: MediaEncoder> {
    pipeline: Arc<ItemPipeline<S, E>>,
    orchestrator: CollectionOrchestrator<S, E>,
}

impl AudioDrop<YtDlpSource, FfmpegEncoder> {
    /// Builds the yt-dlp + ffmpeg service described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config,
            Arc::new(YtDlpSource::new(config.source.clone())),
            Arc::new(FfmpegEncoder::new(config.encoder.clone())),
        )
    }
}

impl<S: MediaSource + 'static, E: MediaEncoder + 'static> AudioDrop<S, E> {
    /// Wires `source` and `encoder` with the pipeline and orchestrator
    /// settings of `config`.
    pub fn new(config: &Config, source: Arc<S>, encoder: Arc<E>) -> Self {
        let pipeline = Arc::new(
            ItemPipeline::new(config.pipeline.clone(), source, encoder)
                .with_audio(config.encoder.audio.clone())
                .with_fade_out(config.encoder.fade_out()),
        );
        let orchestrator =
            CollectionOrchestrator::new(config.orchestrator.clone(), Arc::clone(&pipeline));
        Self {
            pipeline,
            orchestrator,
        }
    }

    pub fn pipeline(&self) -> &Arc<ItemPipeline<S, E>> {
        &self.pipeline
    }

    /// Checks that the external tools are usable.
    pub async fn validate(&self) -> Result<(), ServiceError> {
        self.pipeline.source().validate().await?;
        self.pipeline.encoder().validate().await?;
        Ok(())
    }

    /// Tells whether `url` points at an item, a collection, or neither.
    pub fn classify(&self, url: &str) -> UrlKind {
        self.pipeline.source().classify(url)
    }

    /// Downloads and converts a single item.
    pub async fn process_item(
        &self,
        url: &str,
        options: &ConversionOptions,
        output_dir: &Path,
        progress: Option<&ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<ItemArtifacts, ServiceError> {
        let info = self.resolve_item(url, output_dir).await?;
        self.run_item(info, options, output_dir, progress, cancel).await
    }

    /// Processes every accepted member of a collection.
    pub async fn process_collection(
        &self,
        url: &str,
        options: &CollectionOptions,
        output_dir: &Path,
        progress: &CollectionProgress,
        cancel: &CancellationToken,
    ) -> Result<CollectionReport, ServiceError> {
        let collection = self.resolve_collection(url).await?;
        let report = self
            .orchestrator
            .run(&collection, options, output_dir, progress, cancel)
            .await?;
        Ok(report)
    }

    /// Classifies `url` and runs it as an item or a collection.
    pub async fn process_url(
        &self,
        url: &str,
        request: &ProcessRequest,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ServiceError> {
        match self.classify(url) {
            UrlKind::Item => {
                let info = self.resolve_item(url, output_dir).await?;
                let options = request.options.options_for(&info.id);
                let sink = request.progress.get(&info.id);
                let artifacts = self
                    .run_item(info, &options, output_dir, sink.as_deref(), cancel)
                    .await?;
                Ok(Outcome::Item(artifacts))
            }
            UrlKind::Collection => {
                let report = self
                    .process_collection(
                        url,
                        &request.options,
                        output_dir,
                        &request.progress,
                        cancel,
                    )
                    .await?;
                Ok(Outcome::Collection(report))
            }
            UrlKind::Unsupported => Err(ServiceError::unsupported(url)),
        }
    }

    /// Resolves a collection and lists its members.
    ///
    /// Callers use this to register progress sinks before a run.
    pub async fn collection_items(
        &self,
        url: &str,
    ) -> Result<(CollectionInfo, Vec<CollectionItem>), ServiceError> {
        let collection = self.resolve_collection(url).await?;
        let items: Vec<CollectionItem> = self
            .pipeline
            .source()
            .collection_items(&collection)
            .try_collect()
            .await?;
        info!(
            collection_id = %collection.id,
            items = items.len(),
            "Listed collection"
        );
        Ok((collection, items))
    }

    /// Fetches item metadata once `url` is known to be an item and the
    /// output directory is usable.
    async fn resolve_item(&self, url: &str, output_dir: &Path) -> Result<ItemInfo, ServiceError> {
        if self.classify(url) != UrlKind::Item {
            return Err(ServiceError::unsupported(url));
        }
        prepare_output_dir(output_dir).await?;
        Ok(self.pipeline.source().item_info(url).await?)
    }

    async fn run_item(
        &self,
        info: ItemInfo,
        options: &ConversionOptions,
        output_dir: &Path,
        progress: Option<&ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<ItemArtifacts, ServiceError> {
        let item = MediaItem::Single(info);
        Ok(self
            .pipeline
            .run(&item, options, output_dir, progress, cancel)
            .await?)
    }

    async fn resolve_collection(&self, url: &str) -> Result<CollectionInfo, ServiceError> {
        if self.classify(url) != UrlKind::Collection {
            return Err(ServiceError::unsupported(url));
        }
        Ok(self.pipeline.source().collection_info(url).await?)
    }
}
