//! Types for the item pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::source::MediaItem;

/// Per-item conversion options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Split the item into one artifact per chapter.
    #[serde(default)]
    pub split: bool,
}

impl ConversionOptions {
    /// Options with splitting enabled.
    pub fn split() -> Self {
        Self { split: true }
    }
}

/// Artifacts produced for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemArtifacts {
    /// Item identity.
    pub item_id: String,
    /// Item title.
    pub title: String,
    /// Produced files, in segment order.
    pub artifacts: Vec<PathBuf>,
}

/// Raw media of one item, living in a scoped temporary directory.
///
/// The directory is deleted by [`DownloadedItem::release`], or on drop if the
/// owner never gets to release it (error paths, cancellation, panics).
#[derive(Debug)]
pub struct DownloadedItem {
    item: MediaItem,
    path: PathBuf,
    temp_dir: Option<TempDir>,
}

impl DownloadedItem {
    /// Pairs an item with its raw file inside `temp_dir`.
    pub fn new(item: MediaItem, path: PathBuf, temp_dir: TempDir) -> Self {
        Self {
            item,
            path,
            temp_dir: Some(temp_dir),
        }
    }

    /// The downloaded item.
    pub fn item(&self) -> &MediaItem {
        &self.item
    }

    /// Path of the raw media file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The scoped temporary directory.
    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(|dir| dir.path())
    }

    /// Deletes the temporary directory. Failures are logged, never returned.
    pub async fn release(mut self) {
        let Some(dir) = self.temp_dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();

        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => debug!(path = %path.display(), "Released temporary directory"),
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Failed to remove temporary directory")
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Temporary directory cleanup task failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ItemInfo;

    #[tokio::test]
    async fn test_release_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = tempfile::Builder::new()
            .prefix("audiodrop-")
            .tempdir_in(root.path())
            .unwrap();
        let file = dir.path().join("raw.webm");
        tokio::fs::write(&file, b"data").await.unwrap();

        let item = MediaItem::Single(ItemInfo::new("v1", "Song", "https://example.com/v1"));
        let downloaded = DownloadedItem::new(item, file, dir);
        let temp = downloaded.temp_path().unwrap().to_path_buf();
        assert!(temp.exists());

        downloaded.release().await;
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = tempfile::Builder::new().tempdir_in(root.path()).unwrap();
        let item = MediaItem::Single(ItemInfo::new("v1", "Song", "https://example.com/v1"));
        let downloaded = DownloadedItem::new(item, dir.path().join("raw"), dir);
        let temp = downloaded.temp_path().unwrap().to_path_buf();

        drop(downloaded);
        assert!(!temp.exists());
    }

    #[test]
    fn test_conversion_options_default() {
        assert!(!ConversionOptions::default().split);
        assert!(ConversionOptions::split().split);
    }
}
