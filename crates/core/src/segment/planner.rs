//! Marker list to segment list.

use thiserror::Error;

use super::types::{Marker, Segment, SegmentEnd};

/// Marker lists that cannot be turned into non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// Two markers start at the same offset, which would yield an empty segment.
    #[error("markers '{first}' and '{second}' both start at {offset_ms} ms")]
    DuplicateOffset {
        first: String,
        second: String,
        offset_ms: u64,
    },

    /// The last marker starts at or after the end of the media.
    #[error("marker '{title}' starts at {start_ms} ms, media is only {total_ms} ms long")]
    MarkerPastEnd {
        title: String,
        start_ms: u64,
        total_ms: u64,
    },
}

/// Plans the segments of an item from its chapter markers.
///
/// Markers are sorted by offset first (stable, so equal offsets keep their
/// input order for the error message). Each segment ends where the next
/// marker starts; the last one is open-ended. Without markers the whole item
/// is one segment named `item_title`.
///
/// `total_ms` is only used for validation: a final marker at or past it
/// would produce an empty segment.
pub fn plan_segments(
    markers: &[Marker],
    item_title: &str,
    total_ms: Option<u64>,
) -> Result<Vec<Segment>, SegmentError> {
    if markers.is_empty() {
        return Ok(vec![Segment::whole(item_title)]);
    }

    let mut sorted: Vec<&Marker> = markers.iter().collect();
    sorted.sort_by_key(|m| m.start_ms);

    for pair in sorted.windows(2) {
        if pair[0].start_ms == pair[1].start_ms {
            return Err(SegmentError::DuplicateOffset {
                first: pair[0].title.clone(),
                second: pair[1].title.clone(),
                offset_ms: pair[0].start_ms,
            });
        }
    }

    if let (Some(last), Some(total_ms)) = (sorted.last(), total_ms) {
        if total_ms > 0 && last.start_ms >= total_ms {
            return Err(SegmentError::MarkerPastEnd {
                title: last.title.clone(),
                start_ms: last.start_ms,
                total_ms,
            });
        }
    }

    let segments = sorted
        .iter()
        .enumerate()
        .map(|(idx, marker)| {
            let end = sorted
                .get(idx + 1)
                .map(|next| SegmentEnd::At(next.start_ms))
                .unwrap_or(SegmentEnd::EndOfMedia);

            let title = marker.title.trim();
            let name = if title.is_empty() {
                format!("Part {}", idx + 1)
            } else {
                title.to_string()
            };

            Segment {
                name,
                start_ms: marker.start_ms,
                end,
            }
        })
        .collect();

    Ok(segments)
}
