//! Process-wide default handler
//!
//! A thin registry for programs that want one handler reachable from
//! anywhere. Nothing in the engine reads it; passing a [`Handler`] explicitly
//! works the same way.
//!
//! ```no_run
//! use rust_stream_logger::{global, LogLevel, Options};
//!
//! global::init("logs", LogLevel::Brief, Options::default())?;
//! global::open("app.log")?.write("started");
//! global::finish()?;
//! # Ok::<(), rust_stream_logger::LoggerError>(())
//! ```

use crate::core::{Handler, LogLevel, LoggerError, Options, Result, Stream};
use parking_lot::{const_rwlock, RwLock};
use std::path::{Path, PathBuf};

static DEFAULT_HANDLER: RwLock<Option<Handler>> = const_rwlock(None);

/// Create the default handler
///
/// # Errors
///
/// Returns `AlreadyInitialized` if a default handler exists, or the error of
/// [`Handler::new`].
pub fn init(path: impl AsRef<Path>, level: LogLevel, options: Options) -> Result<()> {
    let mut slot = DEFAULT_HANDLER.write();
    if let Some(existing) = slot.as_ref() {
        return Err(LoggerError::AlreadyInitialized {
            path: existing.path().display().to_string(),
        });
    }
    *slot = Some(Handler::new(path, level, options)?);
    Ok(())
}

/// Clone of the default handler
pub fn default_handler() -> Result<Handler> {
    DEFAULT_HANDLER
        .read()
        .as_ref()
        .cloned()
        .ok_or(LoggerError::NotInitialized)
}

/// Open a stream on the default handler
pub fn open(name: impl Into<String>) -> Result<Stream> {
    Ok(default_handler()?.open(name))
}

/// Root directory of the default handler
pub fn path() -> Result<PathBuf> {
    Ok(default_handler()?.path().to_path_buf())
}

pub fn set_level(level: LogLevel) -> Result<()> {
    default_handler()?.set_level(level);
    Ok(())
}

/// Remove the default handler and close it
///
/// Streams opened earlier keep their handle but their writes are dropped.
pub fn finish() -> Result<()> {
    let handler = DEFAULT_HANDLER.write().take().ok_or(LoggerError::NotInitialized)?;
    handler.close()
}
