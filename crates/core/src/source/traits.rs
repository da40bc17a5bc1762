//! Trait definitions for the media source module.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::{Path, PathBuf};

use super::error::SourceError;
use super::types::{CollectionInfo, CollectionItem, ItemInfo, UrlKind};
use crate::progress::ProgressReporter;
use crate::segment::Marker;

/// Resolves URLs and fetches raw media.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// Tells whether a URL points at an item, a collection, or neither.
    fn classify(&self, url: &str) -> UrlKind;

    /// Fetches metadata of a single item.
    async fn item_info(&self, url: &str) -> Result<ItemInfo, SourceError>;

    /// Fetches metadata of a collection.
    async fn collection_info(&self, url: &str) -> Result<CollectionInfo, SourceError>;

    /// Enumerates the members of a collection lazily, in collection order.
    ///
    /// Each call starts a fresh enumeration.
    fn collection_items<'a>(
        &'a self,
        collection: &'a CollectionInfo,
    ) -> BoxStream<'a, Result<CollectionItem, SourceError>>;

    /// Downloads the item's raw audio into `dest_dir`, returning the file path.
    async fn download(
        &self,
        item: &ItemInfo,
        dest_dir: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, SourceError>;

    /// Fetches chapter markers of an item. May fail or return nothing.
    async fn markers(&self, item: &ItemInfo) -> Result<Vec<Marker>, SourceError>;

    /// Validates that the source is properly configured and ready.
    async fn validate(&self) -> Result<(), SourceError> {
        Ok(())
    }
}
