//! Per-item two-stage progress sink.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::reporter::StageReporter;

/// One of the two stages an item goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Fetching raw media from the source.
    Download,
    /// Encoding raw media into the audio artifact(s).
    Conversion,
}

/// Snapshot of an item's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemProgress {
    /// Download stage fraction (0.0 - 1.0).
    pub download: f64,
    /// Conversion stage fraction (0.0 - 1.0).
    pub conversion: f64,
}

impl ItemProgress {
    /// Mean of both stages, clamped to `[0.0, 1.0]`.
    pub fn combined(&self) -> f64 {
        ((self.download + self.conversion) / 2.0).clamp(0.0, 1.0)
    }

    /// Whether both stages reached 1.0.
    pub fn is_complete(&self) -> bool {
        self.combined() >= 1.0
    }

    /// Combined progress as a whole percentage, for display.
    pub fn percent(&self) -> u8 {
        (self.combined() * 100.0).round() as u8
    }

    fn stage_mut(&mut self, stage: Stage) -> &mut f64 {
        match stage {
            Stage::Download => &mut self.download,
            Stage::Conversion => &mut self.conversion,
        }
    }
}

/// Write side of an item's progress.
///
/// Stage values only ever grow: reports below the current value are dropped,
/// values outside `[0.0, 1.0]` are clamped, NaN is ignored. Observers get the
/// freshly recomputed snapshot after every accepted report.
#[derive(Debug)]
pub struct ProgressSink {
    tx: watch::Sender<ItemProgress>,
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink {
    /// Creates a sink with both stages at zero.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ItemProgress::default());
        Self { tx }
    }

    /// Records a new value for `stage`. Returns whether the value changed.
    pub fn report(&self, stage: Stage, fraction: f64) -> bool {
        if fraction.is_nan() {
            return false;
        }
        let fraction = fraction.clamp(0.0, 1.0);

        self.tx.send_if_modified(|progress| {
            let current = progress.stage_mut(stage);
            if fraction > *current {
                *current = fraction;
                true
            } else {
                false
            }
        })
    }

    /// Reports download progress.
    pub fn report_download(&self, fraction: f64) -> bool {
        self.report(Stage::Download, fraction)
    }

    /// Reports conversion progress.
    pub fn report_conversion(&self, fraction: f64) -> bool {
        self.report(Stage::Conversion, fraction)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ItemProgress {
        *self.tx.borrow()
    }

    /// Current combined value.
    pub fn combined(&self) -> f64 {
        self.snapshot().combined()
    }

    /// Attaches an observer. The receiver sees the current value immediately
    /// and is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<ItemProgress> {
        self.tx.subscribe()
    }

    /// Returns a reporter bound to one stage of this sink.
    pub fn reporter(&self, stage: Stage) -> StageReporter<'_> {
        StageReporter::new(self, stage)
    }
}
