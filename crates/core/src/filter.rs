//! Item exclusion filters for collection runs.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Decides whether an item of a collection should be skipped.
pub trait ItemFilter: Send + Sync {
    /// Returns `true` if the item must not be processed.
    fn should_exclude(&self, item_id: &str) -> bool;
}

/// Excludes a fixed set of item identities (e.g. items already downloaded).
#[derive(Debug, Clone, Default)]
pub struct IdFilter {
    ids: HashSet<String>,
}

impl IdFilter {
    /// Creates a filter excluding the given identities.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds an identity to exclude.
    pub fn insert(&mut self, id: impl Into<String>) {
        self.ids.insert(id.into());
    }

    /// Number of excluded identities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the filter excludes nothing.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl ItemFilter for IdFilter {
    fn should_exclude(&self, item_id: &str) -> bool {
        self.ids.contains(item_id)
    }
}

impl<F> ItemFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn should_exclude(&self, item_id: &str) -> bool {
        self(item_id)
    }
}

/// A set of filters; an item is excluded if any filter flags it.
#[derive(Clone, Default)]
pub struct FilterSet {
    filters: Vec<Arc<dyn ItemFilter>>,
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSet")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FilterSet {
    /// Creates an empty set that lets everything through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter.
    pub fn with(mut self, filter: impl ItemFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Adds a shared filter.
    pub fn push(&mut self, filter: Arc<dyn ItemFilter>) {
        self.filters.push(filter);
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the set has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Whether any filter excludes the item.
    pub fn excludes(&self, item_id: &str) -> bool {
        self.filters.iter().any(|f| f.should_exclude(item_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_filter() {
        let filter = IdFilter::new(["b"]);
        assert!(filter.should_exclude("b"));
        assert!(!filter.should_exclude("a"));
    }

    #[test]
    fn test_empty_set_excludes_nothing() {
        let filters = FilterSet::new();
        assert!(!filters.excludes("anything"));
    }

    #[test]
    fn test_any_filter_excludes() {
        let filters = FilterSet::new()
            .with(IdFilter::new(["a"]))
            .with(|id: &str| id.starts_with("tmp-"));

        assert!(filters.excludes("a"));
        assert!(filters.excludes("tmp-1"));
        assert!(!filters.excludes("b"));
        assert_eq!(filters.len(), 2);
    }
}
