//! Pending batches per stream, owned by the worker

use crate::core::batch::{Batch, FlushTarget};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Batches waiting to be persisted, keyed by stream name
///
/// A name is present only while it holds at least one batch. Only the worker
/// touches this structure, so it carries no lock.
#[derive(Debug, Default)]
pub struct StreamCache {
    entries: HashMap<String, Vec<Batch>>,
}

impl StreamCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch behind the ones already pending for `stream`
    pub fn append(&mut self, stream: String, batch: Batch) {
        self.entries.entry(stream).or_default().push(batch);
    }

    /// Remove and return every batch pending for `stream`
    pub fn take(&mut self, stream: &str) -> Vec<Batch> {
        self.entries.remove(stream).unwrap_or_default()
    }

    /// Names to flush in this pass
    ///
    /// A stream is due when `target` selects it or when its oldest batch has
    /// waited at least `max_age`.
    pub fn due(&self, target: Option<&FlushTarget>, now: Instant, max_age: Duration) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(name, batches)| {
                target.is_some_and(|t| t.matches(name))
                    || batches.first().is_some_and(|b| b.age(now) >= max_age)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, stream: &str) -> bool {
        self.entries.contains_key(stream)
    }
}
