//! Mock media source for testing.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::progress::ProgressReporter;
use crate::segment::Marker;
use crate::source::{
    CollectionInfo, CollectionItem, ItemInfo, MediaSource, SourceError, UrlKind,
};

#[derive(Debug, Clone)]
struct MockCollection {
    info: CollectionInfo,
    items: Vec<CollectionItem>,
    /// Enumeration fails after yielding this many members.
    fail_after: Option<usize>,
}

#[derive(Debug, Clone)]
enum DownloadFailure {
    Unavailable(String),
    NoAudio,
}

/// Counts a download as in flight until dropped.
struct InFlight<'a> {
    active: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(active: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the MediaSource trait.
///
/// Provides controllable behavior for testing:
/// - Register items and collections by URL
/// - Inject download, marker and enumeration failures
/// - Slow down downloads to test cancellation
/// - Track downloads and their peak concurrency for assertions
///
/// Downloads write a small file named `<item id>.webm` into the destination
/// directory.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    items: Arc<RwLock<HashMap<String, ItemInfo>>>,
    collections: Arc<RwLock<HashMap<String, MockCollection>>>,
    markers: Arc<RwLock<HashMap<String, Vec<Marker>>>>,
    marker_failures: Arc<RwLock<HashSet<String>>>,
    download_failures: Arc<RwLock<HashMap<String, DownloadFailure>>>,
    download_delay: Arc<RwLock<Option<Duration>>>,
    downloads: Arc<RwLock<Vec<(String, PathBuf)>>>,
    active_downloads: Arc<AtomicUsize>,
    peak_downloads: Arc<AtomicUsize>,
}

impl MockSource {
    /// Create a new mock source with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a standalone item under its URL.
    pub async fn add_item(&self, item: ItemInfo) {
        self.items.write().await.insert(item.url.clone(), item);
    }

    /// Registers a collection and its members under the collection URL.
    pub async fn add_collection(&self, info: CollectionInfo, items: Vec<CollectionItem>) {
        self.collections.write().await.insert(
            info.url.clone(),
            MockCollection {
                info,
                items,
                fail_after: None,
            },
        );
    }

    /// Makes enumeration of `collection_id` fail after `count` members.
    pub async fn fail_enumeration_after(&self, collection_id: &str, count: usize) {
        let mut collections = self.collections.write().await;
        if let Some(collection) = collections
            .values_mut()
            .find(|c| c.info.id == collection_id)
        {
            collection.fail_after = Some(count);
        }
    }

    /// Sets the chapter markers of an item.
    pub async fn set_markers(&self, item_id: &str, markers: Vec<Marker>) {
        self.markers
            .write()
            .await
            .insert(item_id.to_string(), markers);
    }

    /// Makes the marker lookup of an item fail.
    pub async fn fail_markers(&self, item_id: &str) {
        self.marker_failures
            .write()
            .await
            .insert(item_id.to_string());
    }

    /// Makes the download of an item fail as unavailable.
    pub async fn fail_download(&self, item_id: &str, reason: &str) {
        self.download_failures.write().await.insert(
            item_id.to_string(),
            DownloadFailure::Unavailable(reason.to_string()),
        );
    }

    /// Makes the download of an item fail for lack of an audio stream.
    pub async fn fail_no_audio(&self, item_id: &str) {
        self.download_failures
            .write()
            .await
            .insert(item_id.to_string(), DownloadFailure::NoAudio);
    }

    /// Delays every download by `delay`.
    pub async fn set_download_delay(&self, delay: Duration) {
        *self.download_delay.write().await = Some(delay);
    }

    /// Item IDs downloaded so far, in call order.
    pub async fn downloaded_ids(&self) -> Vec<String> {
        self.downloads
            .read()
            .await
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Files written by successful downloads.
    pub async fn downloaded_paths(&self) -> Vec<PathBuf> {
        self.downloads
            .read()
            .await
            .iter()
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Most downloads ever in flight at the same time.
    pub fn peak_concurrent_downloads(&self) -> usize {
        self.peak_downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn classify(&self, url: &str) -> UrlKind {
        // Falls back to the URL shape while the maps are locked.
        if let Ok(items) = self.items.try_read() {
            if items.contains_key(url) {
                return UrlKind::Item;
            }
        }
        if let Ok(collections) = self.collections.try_read() {
            if collections.contains_key(url) {
                return UrlKind::Collection;
            }
        }
        if url.contains("/list/") {
            UrlKind::Collection
        } else if url.contains("watch?v=") {
            UrlKind::Item
        } else {
            UrlKind::Unsupported
        }
    }

    async fn item_info(&self, url: &str) -> Result<ItemInfo, SourceError> {
        self.items
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::unavailable(format!("no such item: {}", url)))
    }

    async fn collection_info(&self, url: &str) -> Result<CollectionInfo, SourceError> {
        self.collections
            .read()
            .await
            .get(url)
            .map(|c| c.info.clone())
            .ok_or_else(|| SourceError::unavailable(format!("no such collection: {}", url)))
    }

    fn collection_items<'a>(
        &'a self,
        collection: &'a CollectionInfo,
    ) -> BoxStream<'a, Result<CollectionItem, SourceError>> {
        let collections = Arc::clone(&self.collections);
        let id = collection.id.clone();

        stream::once(async move {
            let guard = collections.read().await;
            let mut results: Vec<Result<CollectionItem, SourceError>> = Vec::new();
            match guard.values().find(|c| c.info.id == id) {
                Some(mock) => {
                    let limit = mock.fail_after.unwrap_or(mock.items.len());
                    results.extend(mock.items.iter().take(limit).cloned().map(Ok));
                    if mock.fail_after.is_some() {
                        results.push(Err(SourceError::unavailable("enumeration interrupted")));
                    }
                }
                None => {
                    results.push(Err(SourceError::unavailable(format!(
                        "no such collection: {}",
                        id
                    ))));
                }
            }
            stream::iter(results)
        })
        .flatten()
        .boxed()
    }

    async fn download(
        &self,
        item: &ItemInfo,
        dest_dir: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, SourceError> {
        let _in_flight = InFlight::enter(&self.active_downloads, &self.peak_downloads);
        let delay = *self.download_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.download_failures.read().await.get(&item.id).cloned();
        match failure {
            Some(DownloadFailure::Unavailable(reason)) => {
                return Err(SourceError::unavailable(reason));
            }
            Some(DownloadFailure::NoAudio) => {
                return Err(SourceError::NoAudioStream {
                    item_id: item.id.clone(),
                });
            }
            None => {}
        }

        progress.report(0.5);
        let path = dest_dir.join(format!("{}.webm", item.id));
        tokio::fs::write(&path, format!("raw media for {}", item.id)).await?;
        progress.report(1.0);

        self.downloads
            .write()
            .await
            .push((item.id.clone(), path.clone()));
        Ok(path)
    }

    async fn markers(&self, item: &ItemInfo) -> Result<Vec<Marker>, SourceError> {
        if self.marker_failures.read().await.contains(&item.id) {
            return Err(SourceError::MarkersUnavailable {
                reason: "mock marker failure".to_string(),
            });
        }
        Ok(self
            .markers
            .read()
            .await
            .get(&item.id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::testing::fixtures;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_item_registration_and_classify() {
        let source = MockSource::new();
        let item = fixtures::item("a", "Song A", 120);
        source.add_item(item.clone()).await;

        assert_eq!(source.classify(&item.url), UrlKind::Item);
        assert_eq!(source.classify("ftp://nowhere"), UrlKind::Unsupported);
        assert_eq!(source.item_info(&item.url).await.unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_enumeration_failure_after_count() {
        let source = MockSource::new();
        let collection = fixtures::collection("pl", "Playlist", 3);
        let members = fixtures::members(&collection, &["a", "b", "c"]);
        source.add_collection(collection.clone(), members).await;
        source.fail_enumeration_after("pl", 2).await;

        let results: Vec<_> = source.collection_items(&collection).collect().await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
    }

    #[tokio::test]
    async fn test_enumeration_in_order() {
        let source = MockSource::new();
        let collection = fixtures::collection("pl", "Playlist", 2);
        let members = fixtures::members(&collection, &["x", "y"]);
        source.add_collection(collection.clone(), members).await;

        let items: Vec<CollectionItem> = source
            .collection_items(&collection)
            .try_collect()
            .await
            .unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.info.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_download_writes_file_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new();
        let item = fixtures::item("a", "Song A", 120);

        let path = source.download(&item, dir.path(), &NoProgress).await.unwrap();
        assert!(path.exists());
        assert_eq!(source.downloaded_ids().await, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_peak_concurrent_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new();
        source.set_download_delay(Duration::from_millis(50)).await;
        let (a, b) = (fixtures::item("a", "A", 10), fixtures::item("b", "B", 10));

        let (first, second) = tokio::join!(
            source.download(&a, dir.path(), &NoProgress),
            source.download(&b, dir.path(), &NoProgress),
        );
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(source.peak_concurrent_downloads(), 2);

        source.download(&a, dir.path(), &NoProgress).await.unwrap();
        assert_eq!(source.peak_concurrent_downloads(), 2);
    }

    #[tokio::test]
    async fn test_download_failure_injection() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new();
        source.fail_no_audio("a").await;

        let err = source
            .download(&fixtures::item("a", "A", 10), dir.path(), &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NoAudioStream { .. }));
        assert!(source.downloaded_ids().await.is_empty());
    }
}
