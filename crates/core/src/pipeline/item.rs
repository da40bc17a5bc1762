//! Single-item pipeline: download, convert (whole or per chapter), clean up.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::encoder::{
    AudioConstraints, EmbeddedMetadata, EncodeJob, MediaEncoder, MediaInfo, TimeRange,
};
use crate::metrics;
use crate::progress::{ProgressReporter, ProgressSink, ScaledReporter, Stage, StageReporter};
use crate::segment::{plan_segments, Segment};
use crate::source::{MediaItem, MediaSource};

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::naming::{item_artifact_path, item_stem, segment_artifact_path};
use super::types::{ConversionOptions, DownloadedItem, ItemArtifacts};

/// Races `fut` against cancellation.
pub(crate) async fn cancellable<T, E, F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<PipelineError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = fut => result.map_err(Into::into),
    }
}

/// Runs one item from download to artifacts.
pub struct ItemPipeline<S: MediaSource, E: MediaEncoder> {
    config: PipelineConfig,
    audio: AudioConstraints,
    fade_out: Option<Duration>,
    source: Arc<S>,
    encoder: Arc<E>,
}

impl<S: MediaSource, E: MediaEncoder> ItemPipeline<S, E> {
    /// Creates a pipeline with default output audio settings.
    pub fn new(config: PipelineConfig, source: Arc<S>, encoder: Arc<E>) -> Self {
        Self {
            config,
            audio: AudioConstraints::default(),
            fade_out: None,
            source,
            encoder,
        }
    }

    /// Sets the output audio constraints.
    pub fn with_audio(mut self, audio: AudioConstraints) -> Self {
        self.audio = audio;
        self
    }

    /// Sets the fade-out applied to split parts.
    pub fn with_fade_out(mut self, fade_out: Option<Duration>) -> Self {
        self.fade_out = fade_out;
        self
    }

    /// The media source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// The encoder.
    pub fn encoder(&self) -> &Arc<E> {
        &self.encoder
    }

    /// Output audio constraints.
    pub fn audio(&self) -> &AudioConstraints {
        &self.audio
    }

    /// Downloads, converts and cleans up one item.
    ///
    /// The temporary directory is removed whatever the outcome. Artifacts of
    /// a multi-segment run that failed midway stay on disk.
    pub async fn run(
        &self,
        item: &MediaItem,
        options: &ConversionOptions,
        output_dir: &Path,
        progress: Option<&ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<ItemArtifacts, PipelineError> {
        let span = info_span!("item", item_id = %item.id());

        let result = async {
            info!(title = %item.title(), split = options.split, "Starting item");

            let downloaded = self.download(item, progress, cancel).await?;
            let result = self
                .convert_downloaded(&downloaded, options, output_dir, progress, cancel)
                .await;
            downloaded.release().await;
            result
        }
        .instrument(span)
        .await;

        match &result {
            Ok(artifacts) => {
                metrics::ITEMS_PROCESSED.with_label_values(&["success"]).inc();
                info!(
                    item_id = %item.id(),
                    artifacts = artifacts.artifacts.len(),
                    "Item completed"
                );
            }
            Err(e) => {
                metrics::ITEMS_PROCESSED
                    .with_label_values(&[e.kind().as_str()])
                    .inc();
            }
        }

        result
    }

    /// Downloads an item into a fresh scoped temporary directory.
    ///
    /// The download stage of `progress` is forced to 1.0 on success.
    pub async fn download(
        &self,
        item: &MediaItem,
        progress: Option<&ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<DownloadedItem, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let root = &self.config.temp_dir;
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| PipelineError::TempDir {
                path: root.clone(),
                source,
            })?;
        let temp_dir = tempfile::Builder::new()
            .prefix("audiodrop-")
            .tempdir_in(root)
            .map_err(|source| PipelineError::TempDir {
                path: root.clone(),
                source,
            })?;

        debug!(item_id = %item.id(), dir = %temp_dir.path().display(), "Downloading");

        let reporter = StageReporter::optional(progress, Stage::Download);
        let path = cancellable(
            cancel,
            self.source.download(item.info(), temp_dir.path(), &reporter),
        )
        .await?;
        reporter.finish();

        Ok(DownloadedItem::new(item.clone(), path, temp_dir))
    }

    /// Probes downloaded media, rejecting files without audio.
    pub async fn probe(
        &self,
        downloaded: &DownloadedItem,
        cancel: &CancellationToken,
    ) -> Result<MediaInfo, PipelineError> {
        let info = cancellable(cancel, self.encoder.probe(downloaded.path())).await?;
        if !info.has_audio() {
            return Err(PipelineError::NoAudioStream {
                item_id: downloaded.item().id().to_string(),
            });
        }
        Ok(info)
    }

    async fn convert_downloaded(
        &self,
        downloaded: &DownloadedItem,
        options: &ConversionOptions,
        output_dir: &Path,
        progress: Option<&ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<ItemArtifacts, PipelineError> {
        let started = Instant::now();
        let item = downloaded.item();

        let info = self.probe(downloaded, cancel).await?;
        let total_ms = info.duration_ms().or_else(|| item.info().duration_ms());

        let segments = if options.split {
            self.plan(item, total_ms, cancel).await?
        } else {
            vec![Segment::whole(item.title())]
        };

        let stem = item_stem(item);
        let split_output = segments.len() > 1;
        let count = segments.len();
        let ext = self.audio.format.extension();
        let conversion = StageReporter::optional(progress, Stage::Conversion);
        let mut artifacts = Vec::with_capacity(count);

        for (index, segment) in segments.iter().enumerate() {
            let (offset, span) = segment_window(segment, index, count, total_ms);
            let reporter = ScaledReporter::new(&conversion, offset, span);

            let mut job = EncodeJob::new(
                format!("{}-{}", item.id(), index + 1),
                downloaded.path(),
                if split_output {
                    segment_artifact_path(output_dir, &stem, index, &segment.name, ext)
                } else {
                    item_artifact_path(output_dir, &stem, ext)
                },
                self.audio.clone(),
            );

            if split_output {
                job.range = Some(TimeRange::from(segment));
                job.fade_out = self.fade_out;
                job.metadata = Some(EmbeddedMetadata {
                    title: Some(segment.name.clone()),
                    album: Some(item.title().to_string()),
                    track_number: u16::try_from(index + 1).ok(),
                    track_total: u16::try_from(count).ok(),
                    ..Default::default()
                });
            } else {
                job.metadata = Some(EmbeddedMetadata::titled(item.title()));
            }

            debug!(segment = %segment.name, index, count, "Encoding segment");
            let result = cancellable(cancel, self.encoder.convert(job, &reporter)).await?;
            metrics::SEGMENTS_ENCODED.inc();
            artifacts.push(result.output_path);
        }

        conversion.finish();
        metrics::CONVERSION_DURATION
            .with_label_values(&["item"])
            .observe(started.elapsed().as_secs_f64());

        Ok(ItemArtifacts {
            item_id: item.id().to_string(),
            title: item.title().to_string(),
            artifacts,
        })
    }

    /// Plans chapter segments, degrading to one whole-item segment when
    /// markers are missing, unavailable or inconsistent.
    async fn plan(
        &self,
        item: &MediaItem,
        total_ms: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Segment>, PipelineError> {
        let whole = || vec![Segment::whole(item.title())];

        let markers = match cancellable(cancel, self.source.markers(item.info())).await {
            Ok(markers) => markers,
            Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(e) => {
                warn!(item_id = %item.id(), error = %e, "Chapter markers unavailable, not splitting");
                return Ok(whole());
            }
        };

        if markers.is_empty() {
            warn!(item_id = %item.id(), "Item has no chapter markers, not splitting");
            return Ok(whole());
        }

        match plan_segments(&markers, item.title(), total_ms) {
            Ok(segments) => Ok(segments),
            Err(e) => {
                warn!(item_id = %item.id(), error = %e, "Chapter markers rejected, not splitting");
                Ok(whole())
            }
        }
    }
}

/// Window of the conversion stage covered by one segment.
///
/// Weighted by time when the total duration is known, by count otherwise.
fn segment_window(
    segment: &Segment,
    index: usize,
    count: usize,
    total_ms: Option<u64>,
) -> (f64, f64) {
    if let Some(total) = total_ms.filter(|t| *t > 0) {
        let total_f = total as f64;
        let start = segment.start_ms.min(total) as f64;
        let end = segment.end.resolve(Some(total)).unwrap_or(total).min(total) as f64;
        return (start / total_f, (end - start).max(0.0) / total_f);
    }

    let count = count.max(1) as f64;
    (index as f64 / count, 1.0 / count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentEnd;

    fn segment(start_ms: u64, end: SegmentEnd) -> Segment {
        Segment {
            name: "s".to_string(),
            start_ms,
            end,
        }
    }

    #[test]
    fn test_segment_window_by_time() {
        let total = Some(180_000);
        let (offset, span) = segment_window(&segment(0, SegmentEnd::At(60_000)), 0, 3, total);
        assert!((offset - 0.0).abs() < 1e-9);
        assert!((span - 1.0 / 3.0).abs() < 1e-9);

        let (offset, span) = segment_window(&segment(125_000, SegmentEnd::EndOfMedia), 2, 3, total);
        assert!((offset - 125.0 / 180.0).abs() < 1e-9);
        assert!((offset + span - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_window_by_count() {
        let (offset, span) = segment_window(&segment(0, SegmentEnd::At(1)), 1, 4, None);
        assert!((offset - 0.25).abs() < 1e-9);
        assert!((span - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), PipelineError> =
            cancellable(&cancel, async { Ok::<(), PipelineError>(()) }).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }
}
