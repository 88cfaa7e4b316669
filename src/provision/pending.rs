//! Topics awaiting a creation acknowledgement

use std::collections::BTreeSet;

use crate::topic::TopicPath;

/// Set of paths whose creation has been requested but not acknowledged
///
/// Removal is idempotent: acknowledging a path that is no longer pending
/// is reported as a no-op, never an error.
#[derive(Debug, Clone, Default)]
pub struct PendingCreationSet {
    paths: BTreeSet<TopicPath>,
}

impl PendingCreationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a path as pending; returns `false` if it already was
    pub fn insert(&mut self, path: TopicPath) -> bool {
        self.paths.insert(path)
    }

    /// Remove a path; returns `true` only if it was pending
    pub fn remove(&mut self, path: &TopicPath) -> bool {
        self.paths.remove(path)
    }

    pub fn contains(&self, path: &TopicPath) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}
