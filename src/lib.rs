//! # Rust Stream Logger
//!
//! Buffered, size-rotating log files written by a single background worker.
//!
//! A [`Handler`] owns a root directory and one worker thread. Any number of
//! [`Stream`]s opened from it, on any number of threads, queue formatted
//! batches through one bounded channel. The worker persists them on demand or
//! once they are a second old, renames a file that outgrew its size limit,
//! and hands the backup to a rotation thread that gzips it and prunes old
//! generations.
//!
//! ## Features
//!
//! - **Backpressure**: writers block while the queue is full, nothing is silently lost
//! - **Durability barriers**: `Stream::flush` per stream, `Handler::close` for everything
//! - **Rotation**: gzip compression and retention of the newest generations
//! - **Panic capture**: `Stream::catch` logs a panic together with its call stack
//!
//! ## Example
//!
//! ```no_run
//! use rust_stream_logger::prelude::*;
//!
//! let handler = Handler::builder("logs")
//!     .level(LogLevel::Debug)
//!     .split_size(1024 * 1024)
//!     .keep(5)
//!     .build()?;
//!
//! let access = handler.open("access.log");
//! access.write("GET / 200");
//! access.debug("served from cache");
//! access.flush()?;
//!
//! handler.close()?;
//! # Ok::<(), LoggerError>(())
//! ```

pub mod core;
pub mod engine;
#[cfg(feature = "global")]
pub mod global;
pub mod macros;

pub mod prelude {
    pub use crate::core::{
        catch_panic, EngineMetrics, Handler, HandlerBuilder, LogLevel, LoggerError, Options,
        Result, Stream, TracedError,
    };
}

pub use crate::core::{
    catch_panic, Batch, BatchFormatter, EngineMetrics, FlushTarget, Frame, Handler,
    HandlerBuilder, LogLevel, LoggerError, Options, Result, Stream, TracedError,
};
