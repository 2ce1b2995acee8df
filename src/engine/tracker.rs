//! Bookkeeping for rotation tasks running off the worker thread

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Counts in-flight rotation tasks and serializes passes per stream
///
/// The shutdown sequence waits on [`RotationTracker::wait_idle`] so that no
/// compression or pruning is still running once the handler is closed.
#[derive(Debug, Default)]
pub struct RotationTracker {
    pending: Mutex<usize>,
    idle: Condvar,
    stream_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RotationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task about to be spawned
    ///
    /// The returned guard marks the task finished when dropped, including when
    /// the task unwinds.
    pub fn begin(self: &Arc<Self>) -> RotationGuard {
        *self.pending.lock() += 1;
        RotationGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Number of tasks spawned and not yet finished
    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }

    /// Block until every registered task has finished
    pub fn wait_idle(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.idle.wait(&mut pending);
        }
    }

    /// Lock serializing rotation passes over the files of one stream
    pub fn stream_lock(&self, stream: &str) -> Arc<Mutex<()>> {
        let mut locks = self.stream_locks.lock();
        Arc::clone(locks.entry(stream.to_string()).or_default())
    }

    fn finish(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }
}

/// Marks one rotation task as finished on drop
#[derive(Debug)]
pub struct RotationGuard {
    tracker: Arc<RotationTracker>,
}

impl Drop for RotationGuard {
    fn drop(&mut self) {
        self.tracker.finish();
    }
}
