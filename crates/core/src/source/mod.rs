//! Media sources: URL classification, metadata, enumeration and download.
//!
//! A [`MediaSource`] resolves URLs into items or collections, enumerates the
//! members of a collection lazily, downloads raw audio into a caller-owned
//! directory and extracts chapter markers.
//!
//! # Example
//!
//! ```ignore
//! use audiodrop_core::source::{MediaSource, SourceConfig, UrlKind, YtDlpSource};
//!
//! let source = YtDlpSource::new(SourceConfig::default());
//! source.validate().await?;
//!
//! if source.classify(url) == UrlKind::Collection {
//!     let collection = source.collection_info(url).await?;
//!     let mut items = source.collection_items(&collection);
//!     while let Some(item) = items.next().await {
//!         println!("{}: {}", item?.position, item?.info.title);
//!     }
//! }
//! ```

mod config;
mod error;
mod traits;
mod types;
mod ytdlp;

pub use config::SourceConfig;
pub use error::SourceError;
pub use traits::MediaSource;
pub use types::{CollectionInfo, CollectionItem, ItemInfo, MediaItem, UrlKind};
pub use ytdlp::{classify_url, YtDlpSource};
