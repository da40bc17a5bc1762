//! Collection orchestrator implementation.

use futures::future::join_all;
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::encoder::{EmbeddedMetadata, MediaEncoder, MergeJob};
use crate::metrics;
use crate::pipeline::{
    cancellable, item_artifact_path, sanitize_filename, DownloadedItem, ItemArtifacts,
    ItemPipeline, PipelineError,
};
use crate::progress::{CollectionProgress, MergeProgressFanout};
use crate::source::{CollectionInfo, MediaItem, MediaSource};

use super::config::OrchestratorConfig;
use super::types::{
    CollectionOptions, CollectionReport, CollectionState, ItemFailure, OrchestratorError,
};

/// Drives a collection through enumeration, filtering and item runs.
///
/// - **Streaming mode**: each accepted member gets its own item run, with at
///   most `max_concurrent_items` in flight. Failures are collected into the
///   report and never stop sibling runs.
/// - **Bulk-merge mode**: accepted members are downloaded one after another
///   and merged into a single artifact. Any download failure aborts the batch.
pub struct CollectionOrchestrator<S: MediaSource, E: MediaEncoder> {
    config: OrchestratorConfig,
    pipeline: Arc<ItemPipeline<S, E>>,
}

/// Tracks and logs state transitions of one run.
struct StateTracker<'a> {
    collection_id: &'a str,
    state: CollectionState,
}

impl<'a> StateTracker<'a> {
    fn new(collection_id: &'a str) -> Self {
        Self {
            collection_id,
            state: CollectionState::Enumerating,
        }
    }

    fn set(&mut self, next: CollectionState) {
        if self.state != next {
            debug!(
                collection_id = %self.collection_id,
                from = ?self.state,
                to = ?next,
                "Collection state change"
            );
            self.state = next;
        }
    }
}

/// Creates the output directory if missing and checks it is a directory.
pub async fn prepare_output_dir(path: &Path) -> Result<(), OrchestratorError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(OrchestratorError::InvalidOutputDir {
            path: path.to_path_buf(),
            reason: "exists and is not a directory".to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| OrchestratorError::InvalidOutputDir {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
        }
        Err(e) => Err(OrchestratorError::InvalidOutputDir {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn release_all(downloads: Vec<DownloadedItem>) {
    join_all(downloads.into_iter().map(DownloadedItem::release)).await;
}

impl<S: MediaSource + 'static, E: MediaEncoder + 'static> CollectionOrchestrator<S, E> {
    /// Creates a new orchestrator over `pipeline`.
    pub fn new(config: OrchestratorConfig, pipeline: Arc<ItemPipeline<S, E>>) -> Self {
        Self { config, pipeline }
    }

    /// The item pipeline used for each member.
    pub fn pipeline(&self) -> &Arc<ItemPipeline<S, E>> {
        &self.pipeline
    }

    /// Processes every accepted member of `collection`.
    ///
    /// `progress` maps item identities to their sinks; members without a sink
    /// run with progress discarded.
    pub async fn run(
        &self,
        collection: &CollectionInfo,
        options: &CollectionOptions,
        output_dir: &Path,
        progress: &CollectionProgress,
        cancel: &CancellationToken,
    ) -> Result<CollectionReport, OrchestratorError> {
        prepare_output_dir(output_dir).await?;

        info!(
            collection_id = %collection.id,
            title = %collection.title,
            concatenate = options.concatenate,
            "Starting collection"
        );

        let report = if options.concatenate {
            self.run_bulk(collection, options, output_dir, progress, cancel)
                .await?
        } else {
            self.run_streaming(collection, options, output_dir, progress, cancel)
                .await?
        };

        info!(
            collection_id = %collection.id,
            state = ?report.state,
            artifacts = report.artifacts.len(),
            failures = report.failures.len(),
            excluded = report.excluded,
            "Collection finished"
        );
        Ok(report)
    }

    async fn run_streaming(
        &self,
        collection: &CollectionInfo,
        options: &CollectionOptions,
        output_dir: &Path,
        progress: &CollectionProgress,
        cancel: &CancellationToken,
    ) -> Result<CollectionReport, OrchestratorError> {
        let dest: PathBuf = output_dir.join(sanitize_filename(&collection.title));
        prepare_output_dir(&dest).await?;

        let limit = match self.config.max_concurrent_items {
            0 => None,
            max => Some(Arc::new(Semaphore::new(max))),
        };

        let mut report = CollectionReport::new(collection);
        let mut state = StateTracker::new(&collection.id);
        let mut tasks = JoinSet::new();
        let mut items = self.pipeline.source().collection_items(collection);

        loop {
            state.set(CollectionState::Enumerating);
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = items.next() => next,
            };

            let member = match next {
                None => break,
                Some(Ok(member)) => member,
                Some(Err(e)) => {
                    error!(collection_id = %collection.id, error = %e, "Enumeration failed");
                    report.failures.push(ItemFailure::enumeration(collection, &e));
                    break;
                }
            };

            state.set(CollectionState::Filtering);
            if options.filters.excludes(&member.info.id) {
                debug!(item_id = %member.info.id, "Item excluded");
                report.excluded += 1;
                metrics::ITEMS_EXCLUDED.inc();
                continue;
            }

            state.set(CollectionState::Dispatching);
            let permit = match &limit {
                Some(semaphore) => {
                    let acquired = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        permit = Arc::clone(semaphore).acquire_owned() => permit,
                    };
                    match acquired {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    }
                }
                None => None,
            };

            let pipeline = Arc::clone(&self.pipeline);
            let sink = progress.get(&member.info.id);
            let item_options = options.options_for(&member.info.id);
            let dest = dest.clone();
            let cancel = cancel.clone();
            let item = MediaItem::Member(member);

            debug!(item_id = %item.id(), "Dispatching item run");
            tasks.spawn(async move {
                let _permit = permit;
                let run = pipeline.run(&item, &item_options, &dest, sink.as_deref(), &cancel);
                let result = match AssertUnwindSafe(run).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => Err(PipelineError::Panicked {
                        reason: panic_message(&*panic),
                    }),
                };
                (item, result)
            });
        }
        drop(items);

        state.set(CollectionState::Awaiting);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(artifacts))) => report.artifacts.push(artifacts),
                Ok((item, Err(e))) => {
                    if e.is_cancelled() {
                        warn!(item_id = %item.id(), "Item run cancelled");
                    } else {
                        error!(
                            item_id = %item.id(),
                            kind = e.kind().as_str(),
                            retryable = e.is_retryable(),
                            error = %e,
                            "Item run failed"
                        );
                    }
                    report
                        .failures
                        .push(ItemFailure::item(item.id(), item.title(), &e));
                }
                Err(join_error) => {
                    // Tasks catch their own panics, so this is an abort.
                    error!(error = %join_error, "Item task did not complete");
                    report.failures.push(ItemFailure::item(
                        "unknown",
                        "",
                        &PipelineError::Panicked {
                            reason: join_error.to_string(),
                        },
                    ));
                }
            }
        }

        let final_state = if cancel.is_cancelled() {
            CollectionState::Cancelled
        } else if report.failures.is_empty() {
            CollectionState::Completed
        } else {
            CollectionState::CompletedWithErrors
        };
        state.set(final_state);
        report.finish(final_state);
        Ok(report)
    }

    async fn run_bulk(
        &self,
        collection: &CollectionInfo,
        options: &CollectionOptions,
        output_dir: &Path,
        progress: &CollectionProgress,
        cancel: &CancellationToken,
    ) -> Result<CollectionReport, OrchestratorError> {
        let mut report = CollectionReport::new(collection);
        let mut state = StateTracker::new(&collection.id);
        let mut downloads: Vec<DownloadedItem> = Vec::new();
        let mut durations: Vec<u64> = Vec::new();

        let mut items = self.pipeline.source().collection_items(collection);
        loop {
            state.set(CollectionState::Enumerating);
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = items.next() => next,
            };

            let member = match next {
                None => break,
                Some(Ok(member)) => member,
                Some(Err(e)) => {
                    drop(items);
                    release_all(downloads).await;
                    metrics::BULK_MERGES
                        .with_label_values(&["download_failed"])
                        .inc();
                    return Err(OrchestratorError::Source(e));
                }
            };

            state.set(CollectionState::Filtering);
            if options.filters.excludes(&member.info.id) {
                debug!(item_id = %member.info.id, "Item excluded");
                report.excluded += 1;
                metrics::ITEMS_EXCLUDED.inc();
                continue;
            }

            state.set(CollectionState::Dispatching);
            let item = MediaItem::Member(member);
            let sink = progress.get(item.id());

            let fetched = match self.pipeline.download(&item, sink.as_deref(), cancel).await {
                Ok(downloaded) => match self.pipeline.probe(&downloaded, cancel).await {
                    Ok(info) => Ok((downloaded, info)),
                    Err(e) => {
                        downloaded.release().await;
                        Err(e)
                    }
                },
                Err(e) => Err(e),
            };

            match fetched {
                Ok((downloaded, info)) => {
                    durations.push(
                        info.duration_ms()
                            .or_else(|| item.info().duration_ms())
                            .unwrap_or(0),
                    );
                    downloads.push(downloaded);
                }
                Err(PipelineError::Cancelled) => break,
                Err(e) => {
                    error!(item_id = %item.id(), error = %e, "Bulk download failed, aborting batch");
                    drop(items);
                    release_all(downloads).await;
                    metrics::BULK_MERGES
                        .with_label_values(&["download_failed"])
                        .inc();
                    return Err(OrchestratorError::BulkDownloadFailed {
                        item_id: item.id().to_string(),
                        source: e,
                    });
                }
            }
        }
        drop(items);

        if cancel.is_cancelled() {
            release_all(downloads).await;
            metrics::BULK_MERGES.with_label_values(&["cancelled"]).inc();
            report.finish(CollectionState::Cancelled);
            return Ok(report);
        }

        state.set(CollectionState::Awaiting);
        if downloads.is_empty() {
            info!(collection_id = %collection.id, "No items to merge");
            report.finish(CollectionState::Completed);
            return Ok(report);
        }

        let fanout = MergeProgressFanout::new(
            downloads
                .iter()
                .zip(&durations)
                .map(|(d, duration)| (*duration, progress.get(d.item().id())))
                .collect(),
        );

        let audio = self.pipeline.audio().clone();
        let job = MergeJob {
            job_id: format!("{}-merge", collection.id),
            inputs: downloads.iter().map(|d| d.path().to_path_buf()).collect(),
            output_path: item_artifact_path(output_dir, &collection.title, audio.format.extension()),
            constraints: audio,
            metadata: Some(EmbeddedMetadata::titled(&collection.title)),
        };

        info!(
            collection_id = %collection.id,
            inputs = job.inputs.len(),
            output = %job.output_path.display(),
            "Merging collection"
        );

        let started = Instant::now();
        let result = cancellable(cancel, self.pipeline.encoder().merge(job, &fanout)).await;
        release_all(downloads).await;

        match result {
            Ok(merged) => {
                fanout.finish();
                metrics::BULK_MERGES.with_label_values(&["success"]).inc();
                metrics::CONVERSION_DURATION
                    .with_label_values(&["merge"])
                    .observe(started.elapsed().as_secs_f64());
                report.artifacts.push(ItemArtifacts {
                    item_id: collection.id.clone(),
                    title: collection.title.clone(),
                    artifacts: vec![merged.output_path],
                });
                report.finish(CollectionState::Completed);
                Ok(report)
            }
            Err(e) if e.is_cancelled() => {
                metrics::BULK_MERGES.with_label_values(&["cancelled"]).inc();
                report.finish(CollectionState::Cancelled);
                Ok(report)
            }
            Err(e) => {
                error!(collection_id = %collection.id, error = %e, "Merge failed");
                metrics::BULK_MERGES
                    .with_label_values(&["merge_failed"])
                    .inc();
                Err(OrchestratorError::MergeFailed(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*boxed), "static message");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(&*boxed), "owned message");

        let boxed: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }

    #[tokio::test]
    async fn test_prepare_output_dir_creates_missing() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("a").join("b");

        prepare_output_dir(&out).await.unwrap();
        assert!(out.is_dir());
        // Idempotent
        prepare_output_dir(&out).await.unwrap();
    }

    #[tokio::test]
    async fn test_prepare_output_dir_rejects_file() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("taken");
        tokio::fs::write(&file, b"x").await.unwrap();

        let err = prepare_output_dir(&file).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidOutputDir { .. }));
    }
}
