//! Per-cycle failure collection.

use crate::error::LoadError;
use parking_lot::Mutex;

/// Collects step failures while a load cycle is in flight.
///
/// Insertion order is preserved so the reducer can break ties
/// deterministically. Recording the same step twice keeps only the
/// latest error; a retried step that fails again must not double-count.
pub struct FailureCollector<S> {
    entries: Mutex<Vec<(S, LoadError)>>,
}

impl<S: PartialEq> FailureCollector<S> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Record a failed step, replacing any previous entry for it.
    pub fn record(&self, step: S, error: LoadError) {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|(existing, _)| *existing == step) {
            Some(entry) => entry.1 = error,
            None => entries.push((step, error)),
        }
    }

    /// Take every recorded failure, leaving the collector empty for the
    /// next cycle.
    pub fn drain(&self) -> Vec<(S, LoadError)> {
        std::mem::take(&mut *self.entries.lock())
    }
}

impl<S: PartialEq> Default for FailureCollector<S> {
    fn default() -> Self {
        Self::new()
    }
}
