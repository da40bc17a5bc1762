//! Progress reporters handed to the media source and encoder.

use std::sync::Arc;

use super::sink::{ProgressSink, Stage};

/// Receives fractional progress (0.0 - 1.0) from a long-running operation.
pub trait ProgressReporter: Send + Sync {
    /// Reports the current fraction. Implementations clamp out-of-range values.
    fn report(&self, fraction: f64);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _fraction: f64) {}
}

/// Writes reports into one stage of a [`ProgressSink`].
///
/// A reporter without a sink silently drops reports; the orchestrator uses
/// it for items the caller did not register a sink for.
#[derive(Debug, Clone, Copy)]
pub struct StageReporter<'a> {
    sink: Option<&'a ProgressSink>,
    stage: Stage,
}

impl<'a> StageReporter<'a> {
    /// Creates a reporter for `stage` of `sink`.
    pub fn new(sink: &'a ProgressSink, stage: Stage) -> Self {
        Self {
            sink: Some(sink),
            stage,
        }
    }

    /// Creates a reporter for an optional sink.
    pub fn optional(sink: Option<&'a ProgressSink>, stage: Stage) -> Self {
        Self { sink, stage }
    }

    /// Forces the stage to its final value.
    pub fn finish(&self) {
        self.report(1.0);
    }
}

impl ProgressReporter for StageReporter<'_> {
    fn report(&self, fraction: f64) {
        if let Some(sink) = self.sink {
            sink.report(self.stage, fraction);
        }
    }
}

/// Maps a sub-task's `0..1` onto the `[offset, offset + span]` window of a
/// parent reporter.
pub struct ScaledReporter<'a> {
    inner: &'a dyn ProgressReporter,
    offset: f64,
    span: f64,
}

impl<'a> ScaledReporter<'a> {
    /// Creates a scaled view of `inner`.
    pub fn new(inner: &'a dyn ProgressReporter, offset: f64, span: f64) -> Self {
        Self {
            inner,
            offset: offset.clamp(0.0, 1.0),
            span: span.clamp(0.0, 1.0),
        }
    }
}

impl ProgressReporter for ScaledReporter<'_> {
    fn report(&self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        self.inner
            .report(self.offset + self.span * fraction.clamp(0.0, 1.0));
    }
}

struct FanoutSlot {
    start: f64,
    span: f64,
    sink: Option<Arc<ProgressSink>>,
}

/// Spreads overall merge progress over the inputs' own conversion stages.
///
/// Each input occupies a window of the merged timeline proportional to its
/// duration. When the overall fraction passes through an input's window, that
/// input's conversion stage advances from 0 to 1.
pub struct MergeProgressFanout {
    slots: Vec<FanoutSlot>,
}

impl MergeProgressFanout {
    /// Builds a fanout from `(duration_ms, sink)` pairs in merge order.
    ///
    /// If no durations are known every input gets an equal share.
    pub fn new(inputs: Vec<(u64, Option<Arc<ProgressSink>>)>) -> Self {
        let total: u64 = inputs.iter().map(|(duration, _)| *duration).sum();
        let count = inputs.len().max(1) as f64;

        let mut cursor = 0.0;
        let slots = inputs
            .into_iter()
            .map(|(duration, sink)| {
                let span = if total > 0 {
                    duration as f64 / total as f64
                } else {
                    1.0 / count
                };
                let slot = FanoutSlot {
                    start: cursor,
                    span,
                    sink,
                };
                cursor += span;
                slot
            })
            .collect();

        Self { slots }
    }

    /// Forces every input's conversion stage to its final value.
    pub fn finish(&self) {
        for sink in self.slots.iter().filter_map(|slot| slot.sink.as_ref()) {
            sink.report_conversion(1.0);
        }
    }
}

impl ProgressReporter for MergeProgressFanout {
    fn report(&self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        let overall = fraction.clamp(0.0, 1.0);

        for slot in &self.slots {
            let Some(sink) = &slot.sink else { continue };
            let local = if slot.span > 0.0 {
                (overall - slot.start) / slot.span
            } else if overall >= slot.start {
                1.0
            } else {
                0.0
            };
            sink.report_conversion(local);
        }
    }
}
