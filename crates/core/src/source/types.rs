//! Types for the media source module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlKind {
    /// A single media item.
    Item,
    /// A collection of items (playlist).
    Collection,
    /// Nothing this source can handle.
    Unsupported,
}

/// Metadata of a single media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Identity, unique within the source.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Canonical URL of the item.
    pub url: String,
    /// Advertised duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl ItemInfo {
    /// Creates item info with the required fields.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            duration: None,
            thumbnail_url: None,
        }
    }

    /// Sets the advertised duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the thumbnail URL.
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// Advertised duration in milliseconds.
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration.map(|d| d.as_millis() as u64)
    }
}

/// An item enumerated from a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    /// The item itself.
    pub info: ItemInfo,
    /// Identity of the owning collection.
    pub collection_id: String,
    /// 1-based position in the collection.
    pub position: usize,
}

/// Either a standalone item or a collection member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaItem {
    /// Item requested directly.
    Single(ItemInfo),
    /// Item reached through a collection.
    Member(CollectionItem),
}

impl MediaItem {
    /// Common item metadata.
    pub fn info(&self) -> &ItemInfo {
        match self {
            Self::Single(info) => info,
            Self::Member(member) => &member.info,
        }
    }

    /// Item identity.
    pub fn id(&self) -> &str {
        &self.info().id
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.info().title
    }

    /// Advertised duration.
    pub fn duration(&self) -> Option<Duration> {
        self.info().duration
    }

    /// Thumbnail URL.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.info().thumbnail_url.as_deref()
    }

    /// Owning collection, for members.
    pub fn collection_id(&self) -> Option<&str> {
        match self {
            Self::Single(_) => None,
            Self::Member(member) => Some(&member.collection_id),
        }
    }

    /// Position inside the owning collection, for members.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Single(_) => None,
            Self::Member(member) => Some(member.position),
        }
    }
}

impl From<ItemInfo> for MediaItem {
    fn from(info: ItemInfo) -> Self {
        Self::Single(info)
    }
}

impl From<CollectionItem> for MediaItem {
    fn from(item: CollectionItem) -> Self {
        Self::Member(item)
    }
}

/// Metadata of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Identity, unique within the source.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Canonical URL of the collection.
    pub url: String,
    /// Number of items, if the source reports it up front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
}

impl CollectionInfo {
    /// Creates collection info.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            item_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_item_shares_base_capabilities() {
        let info = ItemInfo::new("v1", "Song", "https://example.com/v1")
            .with_duration(Duration::from_secs(180))
            .with_thumbnail("https://example.com/v1.jpg");

        let single = MediaItem::from(info.clone());
        let member = MediaItem::from(CollectionItem {
            info,
            collection_id: "pl".to_string(),
            position: 3,
        });

        for item in [&single, &member] {
            assert_eq!(item.id(), "v1");
            assert_eq!(item.title(), "Song");
            assert_eq!(item.duration(), Some(Duration::from_secs(180)));
            assert_eq!(item.thumbnail_url(), Some("https://example.com/v1.jpg"));
        }

        assert_eq!(single.collection_id(), None);
        assert_eq!(member.collection_id(), Some("pl"));
        assert_eq!(member.position(), Some(3));
    }

    #[test]
    fn test_item_info_serialization() {
        let info = ItemInfo::new("v1", "Song", "https://example.com/v1");
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("duration"));

        let parsed: ItemInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);
    }
}
