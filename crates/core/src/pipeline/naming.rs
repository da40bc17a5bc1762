//! Artifact file naming.

use std::path::{Path, PathBuf};

use crate::source::MediaItem;

const MAX_NAME_CHARS: usize = 180;

/// Makes a title safe to use as a single path component.
///
/// Path separators, characters reserved on common filesystems and control
/// characters become `_`. Leading/trailing whitespace and dots are trimmed.
/// An empty result becomes `untitled`.
pub fn sanitize_filename(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        return "untitled".to_string();
    }

    if trimmed.chars().count() <= MAX_NAME_CHARS {
        return trimmed.to_string();
    }
    trimmed
        .chars()
        .take(MAX_NAME_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Base name of an item's artifacts.
///
/// Collection members are prefixed with their position (`NN - <title>`), so
/// two members of one collection never share a name.
pub fn item_stem(item: &MediaItem) -> String {
    match item.position() {
        Some(position) => format!("{:02} - {}", position, item.title()),
        None => item.title().to_string(),
    }
}

/// `<dir>/<title>.<ext>`
pub fn item_artifact_path(dir: &Path, title: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}.{}", sanitize_filename(title), ext))
}

/// `<dir>/<item title>/<NN> - <segment name>.<ext>`, numbered from 1.
pub fn segment_artifact_path(
    dir: &Path,
    item_title: &str,
    index: usize,
    segment_name: &str,
    ext: &str,
) -> PathBuf {
    dir.join(sanitize_filename(item_title)).join(format!(
        "{:02} - {}.{}",
        index + 1,
        sanitize_filename(segment_name),
        ext
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CollectionItem, ItemInfo};

    #[test]
    fn test_sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
        assert_eq!(sanitize_filename("a\\b|c\"d"), "a_b_c_d");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
    }

    #[test]
    fn test_sanitize_trims_and_defaults() {
        assert_eq!(sanitize_filename("  ..hidden.. "), "hidden");
        assert_eq!(sanitize_filename("..."), "untitled");
        assert_eq!(sanitize_filename(""), "untitled");
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize_filename("Café – 東京"), "Café – 東京");
    }

    #[test]
    fn test_sanitize_limits_length() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_filename(&long).chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn test_item_stem_prefixes_members_with_position() {
        let single = MediaItem::Single(ItemInfo::new("a", "Track A", "https://example.com/a"));
        assert_eq!(item_stem(&single), "Track A");

        let member = |id: &str, position| {
            MediaItem::Member(CollectionItem {
                info: ItemInfo::new(id, "Track A", format!("https://example.com/{}", id)),
                collection_id: "pl".to_string(),
                position,
            })
        };
        assert_eq!(item_stem(&member("a", 1)), "01 - Track A");
        assert_eq!(item_stem(&member("A", 12)), "12 - Track A");

        let dir = Path::new("/music/Playlist");
        assert_ne!(
            item_artifact_path(dir, &item_stem(&member("a", 1)), "mp3"),
            item_artifact_path(dir, &item_stem(&member("A", 2)), "mp3")
        );
    }

    #[test]
    fn test_artifact_paths() {
        let dir = Path::new("/music");
        assert_eq!(
            item_artifact_path(dir, "Song: Live", "mp3"),
            PathBuf::from("/music/Song_ Live.mp3")
        );
        assert_eq!(
            segment_artifact_path(dir, "Album", 1, "Second", "mp3"),
            PathBuf::from("/music/Album/02 - Second.mp3")
        );
    }
}
