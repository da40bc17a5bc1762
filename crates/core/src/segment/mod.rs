//! Segment planning for splitting one item into several artifacts.
//!
//! Chapter markers are start offsets; the planner turns them into contiguous
//! `[start, end)` ranges where each range ends where the next begins and the
//! last one runs to the end of the media.

mod description;
mod planner;
mod types;

pub use description::parse_description_markers;
pub use planner::{plan_segments, SegmentError};
pub use types::{Marker, Segment, SegmentEnd};
