//! Types for segment planning.

use serde::{Deserialize, Serialize};

/// A named chapter start inside an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Chapter title.
    pub title: String,
    /// Start offset in milliseconds.
    pub start_ms: u64,
}

impl Marker {
    /// Creates a marker.
    pub fn new(title: impl Into<String>, start_ms: u64) -> Self {
        Self {
            title: title.into(),
            start_ms,
        }
    }
}

/// Exclusive end of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "ms", rename_all = "snake_case")]
pub enum SegmentEnd {
    /// Ends at this offset in milliseconds.
    At(u64),
    /// Runs until the end of the media.
    EndOfMedia,
}

impl SegmentEnd {
    /// Resolves the end against a known total duration.
    pub fn resolve(&self, total_ms: Option<u64>) -> Option<u64> {
        match self {
            Self::At(ms) => Some(*ms),
            Self::EndOfMedia => total_ms,
        }
    }
}

/// A named `[start, end)` time range of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment name, used for the artifact file name.
    pub name: String,
    /// Inclusive start offset in milliseconds.
    pub start_ms: u64,
    /// Exclusive end.
    pub end: SegmentEnd,
}

impl Segment {
    /// A segment covering the whole item.
    pub fn whole(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_ms: 0,
            end: SegmentEnd::EndOfMedia,
        }
    }

    /// Whether this segment covers the whole item.
    pub fn is_whole(&self) -> bool {
        self.start_ms == 0 && self.end == SegmentEnd::EndOfMedia
    }

    /// Length in milliseconds, if the end is known.
    pub fn duration_ms(&self, total_ms: Option<u64>) -> Option<u64> {
        self.end
            .resolve(total_ms)
            .map(|end| end.saturating_sub(self.start_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_duration() {
        let seg = Segment {
            name: "a".to_string(),
            start_ms: 60_000,
            end: SegmentEnd::At(125_000),
        };
        assert_eq!(seg.duration_ms(None), Some(65_000));

        let last = Segment {
            name: "b".to_string(),
            start_ms: 125_000,
            end: SegmentEnd::EndOfMedia,
        };
        assert_eq!(last.duration_ms(None), None);
        assert_eq!(last.duration_ms(Some(180_000)), Some(55_000));
    }

    #[test]
    fn test_whole_segment() {
        let seg = Segment::whole("Song");
        assert!(seg.is_whole());
        assert_eq!(seg.end, SegmentEnd::EndOfMedia);
    }
}
