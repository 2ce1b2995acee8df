//! Engine metrics for observability
//!
//! Counters shared between the application-facing handles, the worker and the
//! rotation tasks. All updates are relaxed atomics; the numbers are advisory.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for engine observability
///
/// # Example
///
/// ```
/// use rust_stream_logger::EngineMetrics;
///
/// let metrics = EngineMetrics::new();
///
/// metrics.record_queued();
/// metrics.record_written(3);
///
/// assert_eq!(metrics.batches_queued(), 1);
/// assert_eq!(metrics.lines_written(), 3);
/// ```
#[derive(Debug)]
pub struct EngineMetrics {
    /// Batches handed to the worker
    batches_queued: AtomicU64,

    /// Lines persisted to stream files
    lines_written: AtomicU64,

    /// Batches lost to a failed flush or a stopped worker
    batches_dropped: AtomicU64,

    /// Active files renamed to a backup
    rotations: AtomicU64,

    /// Backups compressed into a generation
    generations_compressed: AtomicU64,

    /// Backups left uncompressed after a failure
    compression_failures: AtomicU64,

    /// Generations deleted by retention
    generations_pruned: AtomicU64,
}

impl EngineMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            batches_queued: AtomicU64::new(0),
            lines_written: AtomicU64::new(0),
            batches_dropped: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            generations_compressed: AtomicU64::new(0),
            compression_failures: AtomicU64::new(0),
            generations_pruned: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn batches_queued(&self) -> u64 {
        self.batches_queued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_dropped(&self) -> u64 {
        self.batches_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn generations_compressed(&self) -> u64 {
        self.generations_compressed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn compression_failures(&self) -> u64 {
        self.compression_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn generations_pruned(&self) -> u64 {
        self.generations_pruned.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queued(&self) -> u64 {
        self.batches_queued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self, lines: u64) -> u64 {
        self.lines_written.fetch_add(lines, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self, batches: u64) -> u64 {
        self.batches_dropped.fetch_add(batches, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_rotation(&self) -> u64 {
        self.rotations.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_compressed(&self) -> u64 {
        self.generations_compressed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_compression_failure(&self) -> u64 {
        self.compression_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_pruned(&self) -> u64 {
        self.generations_pruned.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of queued batches that never reached disk, as a percentage
    ///
    /// Returns 0.0 if nothing has been queued.
    pub fn drop_rate(&self) -> f64 {
        let queued = self.batches_queued() as f64;
        if queued == 0.0 {
            0.0
        } else {
            (self.batches_dropped() as f64 / queued) * 100.0
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EngineMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            batches_queued: AtomicU64::new(self.batches_queued()),
            lines_written: AtomicU64::new(self.lines_written()),
            batches_dropped: AtomicU64::new(self.batches_dropped()),
            rotations: AtomicU64::new(self.rotations()),
            generations_compressed: AtomicU64::new(self.generations_compressed()),
            compression_failures: AtomicU64::new(self.compression_failures()),
            generations_pruned: AtomicU64::new(self.generations_pruned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = EngineMetrics::new();
        assert_eq!(metrics.batches_queued(), 0);
        assert_eq!(metrics.lines_written(), 0);
        assert_eq!(metrics.batches_dropped(), 0);
        assert_eq!(metrics.rotations(), 0);
        assert_eq!(metrics.generations_pruned(), 0);
    }

    #[test]
    fn test_record_returns_previous_value() {
        let metrics = EngineMetrics::new();
        assert_eq!(metrics.record_rotation(), 0);
        assert_eq!(metrics.record_rotation(), 1);
        assert_eq!(metrics.rotations(), 2);
    }

    #[test]
    fn test_drop_rate() {
        let metrics = EngineMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..100 {
            metrics.record_queued();
        }
        metrics.record_dropped(10);

        let rate = metrics.drop_rate();
        assert!((9.9..=10.1).contains(&rate), "Drop rate was {}", rate);
    }

    #[test]
    fn test_metrics_clone_is_snapshot() {
        let metrics = EngineMetrics::new();
        metrics.record_written(5);

        let snapshot = metrics.clone();
        metrics.record_written(5);

        assert_eq!(snapshot.lines_written(), 5);
        assert_eq!(metrics.lines_written(), 10);
    }
}
