//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Item runs (results, segments encoded, conversion time)
//! - Collection runs (excluded items, bulk merges)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Item Pipeline
// =============================================================================

/// Item runs by result.
pub static ITEMS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("audiodrop_items_processed_total", "Total item runs"),
        &["result"], // "success", or an error kind label
    )
    .unwrap()
});

/// Segments encoded.
pub static SEGMENTS_ENCODED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "audiodrop_segments_encoded_total",
        "Total segments encoded into artifacts",
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "audiodrop_conversion_duration_seconds",
            "Duration of encoding work per item or merge",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["mode"], // "item", "merge"
    )
    .unwrap()
});

// =============================================================================
// Collection Orchestrator
// =============================================================================

/// Items skipped by filters.
pub static ITEMS_EXCLUDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "audiodrop_items_excluded_total",
        "Total collection members skipped by filters",
    )
    .unwrap()
});

/// Bulk merges by result.
pub static BULK_MERGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("audiodrop_bulk_merges_total", "Total bulk merge runs"),
        &["result"], // "success", "download_failed", "merge_failed", "cancelled"
    )
    .unwrap()
});

/// Returns all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Items
        Box::new(ITEMS_PROCESSED.clone()),
        Box::new(SEGMENTS_ENCODED.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        // Collections
        Box::new(ITEMS_EXCLUDED.clone()),
        Box::new(BULK_MERGES.clone()),
    ]
}
