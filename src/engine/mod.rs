//! The background engine: worker loop, pending-batch cache and rotation

pub mod cache;
pub mod rotator;
pub mod tracker;
pub mod worker;

pub use cache::StreamCache;
pub use rotator::Rotator;
pub use tracker::RotationTracker;
pub use worker::{Worker, WorkerConfig, FLUSH_INTERVAL, MAX_BATCH_AGE};

use std::path::Path;

/// Create `dir` and its parents, applying `mode` to created directories on unix
pub(crate) fn ensure_dir(dir: &Path, mode: Option<u32>) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(dir)
}
