//! Testing utilities and mock implementations.
//!
//! The mocks stand in for yt-dlp and ffmpeg so pipelines and orchestrators
//! can be exercised end to end against real temporary directories.
//!
//! # Example
//!
//! ```rust,ignore
//! use audiodrop_core::testing::{fixtures, MockEncoder, MockSource};
//!
//! let source = MockSource::new();
//! source.add_item(fixtures::item("a", "Song A", 180)).await;
//! source.fail_download("b", "removed by uploader").await;
//!
//! let encoder = MockEncoder::new();
//! encoder.fail_convert("c").await;
//! ```

mod mock_encoder;
mod mock_source;

pub use mock_encoder::{MockEncoder, RecordedJob};
pub use mock_source::MockSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::time::Duration;

    use crate::source::{CollectionInfo, CollectionItem, ItemInfo};

    /// A standalone item with a known duration.
    pub fn item(id: &str, title: &str, duration_secs: u64) -> ItemInfo {
        ItemInfo::new(id, title, format!("https://mock.test/watch?v={}", id))
            .with_duration(Duration::from_secs(duration_secs))
    }

    /// A collection with the given member count.
    pub fn collection(id: &str, title: &str, item_count: usize) -> CollectionInfo {
        let mut info = CollectionInfo::new(id, title, format!("https://mock.test/list/{}", id));
        info.item_count = Some(item_count);
        info
    }

    /// Members `ids` of `collection`, titled "Track <id>", 3 minutes each.
    pub fn members(collection: &CollectionInfo, ids: &[&str]) -> Vec<CollectionItem> {
        ids.iter()
            .enumerate()
            .map(|(index, id)| CollectionItem {
                info: item(id, &format!("Track {}", id.to_uppercase()), 180),
                collection_id: collection.id.clone(),
                position: index + 1,
            })
            .collect()
    }

    /// Every file under `dir`, recursively.
    pub fn files_under(dir: &Path) -> Vec<std::path::PathBuf> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            let Ok(entries) = std::fs::read_dir(&current) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    files.push(path);
                }
            }
        }
        files.sort();
        files
    }
}
