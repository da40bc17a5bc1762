//! Collection-wide progress registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::sink::{ItemProgress, ProgressSink};

/// Maps item identities to their progress sinks.
///
/// The caller fills the map before starting a collection run. During the run
/// it is only read: every item pipeline receives its own `Arc<ProgressSink>`
/// and never touches the map, so concurrent runs share no mutable state.
#[derive(Debug, Clone, Default)]
pub struct CollectionProgress {
    sinks: HashMap<String, Arc<ProgressSink>>,
}

impl CollectionProgress {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with a fresh sink for each identity.
    pub fn for_items<I, S>(item_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sinks = item_ids
            .into_iter()
            .map(|id| (id.into(), Arc::new(ProgressSink::new())))
            .collect();
        Self { sinks }
    }

    /// Registers a sink, returning it for the caller to observe.
    pub fn register(&mut self, item_id: impl Into<String>) -> Arc<ProgressSink> {
        self.sinks
            .entry(item_id.into())
            .or_insert_with(|| Arc::new(ProgressSink::new()))
            .clone()
    }

    /// Looks up the sink for an item.
    pub fn get(&self, item_id: &str) -> Option<Arc<ProgressSink>> {
        self.sinks.get(item_id).cloned()
    }

    /// Number of registered items.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no item is registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Iterates over `(item_id, sink)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ProgressSink>)> {
        self.sinks.iter().map(|(id, sink)| (id.as_str(), sink))
    }

    /// Snapshot of every registered item.
    pub fn snapshot(&self) -> HashMap<String, ItemProgress> {
        self.sinks
            .iter()
            .map(|(id, sink)| (id.clone(), sink.snapshot()))
            .collect()
    }

    /// Mean combined progress across registered items.
    pub fn overall(&self) -> f64 {
        if self.sinks.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.sinks.values().map(|sink| sink.combined()).sum();
        sum / self.sinks.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_items_creates_sinks() {
        let progress = CollectionProgress::for_items(["a", "b"]);
        assert_eq!(progress.len(), 2);
        assert!(progress.get("a").is_some());
        assert!(progress.get("c").is_none());
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut progress = CollectionProgress::new();
        let first = progress.register("a");
        let second = progress.register("a");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(progress.len(), 1);
    }

    #[test]
    fn test_overall_progress() {
        let progress = CollectionProgress::for_items(["a", "b"]);
        let a = progress.get("a").unwrap();
        a.report_download(1.0);
        a.report_conversion(1.0);

        assert_eq!(progress.overall(), 0.5);
        assert!(progress.snapshot()["a"].is_complete());
    }
}
