//! Log handler: owner of one log root and its worker

use super::{
    batch::{Batch, FlushTarget, Message},
    error::{LoggerError, Result},
    log_level::LogLevel,
    metrics::EngineMetrics,
    options::Options,
    stream::Stream,
};
use crate::engine::{ensure_dir, RotationTracker, Worker, WorkerConfig};
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

/// State shared by a handler and every stream opened from it
///
/// The worker never holds a reference to this, so dropping the last handle
/// shuts the worker down.
#[derive(Debug)]
pub(crate) struct Shared {
    root: PathBuf,
    level: AtomicU8,
    options: Options,
    sender: Sender<Message>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    tracker: Arc<RotationTracker>,
    metrics: Arc<EngineMetrics>,
}

impl Shared {
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Queue a batch, blocking while the channel is full
    pub(crate) fn append(&self, stream: &str, batch: Batch) {
        let message = Message::Append {
            stream: stream.to_string(),
            batch,
        };
        if self.sender.send(message).is_ok() {
            self.metrics.record_queued();
        } else {
            // Worker has shut down
            self.metrics.record_dropped(1);
        }
    }

    /// Send a flush command and block until the worker has processed it
    pub(crate) fn flush(&self, target: FlushTarget) -> Result<()> {
        let (reply, done) = bounded(1);
        self.sender
            .send(Message::Flush { target, reply })
            .map_err(|_| LoggerError::HandlerClosed)?;
        done.recv().map_err(|_| LoggerError::HandlerClosed)
    }

    fn close(&self) -> Result<()> {
        let handle = self.worker.lock().take().ok_or(LoggerError::HandlerClosed)?;
        let flushed = self.flush(FlushTarget::All);
        if let Err(e) = handle.join() {
            eprintln!("[LOGGER ERROR] Worker thread panicked during shutdown: {:?}", e);
            return Err(LoggerError::other("Worker thread panicked during shutdown"));
        }
        flushed
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if self.worker.get_mut().is_none() {
            return;
        }
        if let Err(e) = self.close() {
            eprintln!("[LOGGER ERROR] Failed to close log handler: {}", e);
        }
        let dropped = self.metrics.batches_dropped();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Log handler closed with {} dropped batches (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

/// Owner of one log root directory and the worker persisting its streams
///
/// Cloning a handler is cheap; all clones and every [`Stream`] opened from
/// them share one worker.
///
/// # Example
///
/// ```no_run
/// use rust_stream_logger::prelude::*;
///
/// let handler = Handler::new("/var/log/myapp", LogLevel::Debug, Options::default())?;
/// let log = handler.open("app.log");
/// log.write("Application launched");
/// log.flush()?;
/// handler.close()?;
/// # Ok::<(), LoggerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Handler {
    shared: Arc<Shared>,
}

impl Handler {
    /// Create the root directory and start the worker
    ///
    /// An empty path means the current directory. Zero option values take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the root cannot be resolved to an
    /// absolute path or created; no worker is started in that case.
    pub fn new(path: impl AsRef<Path>, level: LogLevel, options: Options) -> Result<Self> {
        let options = options.normalized();
        let root = absolute_root(path.as_ref())?;

        ensure_dir(&root, options.dir_mode).map_err(|e| {
            LoggerError::config(
                "Handler",
                format!("Cannot create log root '{}': {}", root.display(), e),
            )
        })?;

        let (sender, receiver) = bounded(options.queue_capacity);
        let tracker = Arc::new(RotationTracker::new());
        let metrics = Arc::new(EngineMetrics::new());
        let worker = Worker::new(
            WorkerConfig {
                root: root.clone(),
                split_size: options.split_size,
                keep: options.keep,
                dir_mode: options.dir_mode,
            },
            receiver,
            Arc::clone(&tracker),
            Arc::clone(&metrics),
        );
        let handle = worker.spawn().map_err(|e| {
            LoggerError::io_operation("starting log worker", "Failed to spawn worker thread", e)
        })?;

        Ok(Self {
            shared: Arc::new(Shared {
                root,
                level: AtomicU8::new(level.as_u8()),
                options,
                sender,
                worker: Mutex::new(Some(handle)),
                tracker,
                metrics,
            }),
        })
    }

    /// Create a builder for Handler
    #[must_use]
    pub fn builder(path: impl Into<PathBuf>) -> HandlerBuilder {
        HandlerBuilder::new(path)
    }

    /// Get a stream writing to the file `name` under the root
    ///
    /// Does not touch the disk or the worker.
    #[must_use]
    pub fn open(&self, name: impl Into<String>) -> Stream {
        Stream::new(name.into(), Arc::clone(&self.shared))
    }

    /// Absolute path of the log root
    pub fn path(&self) -> &Path {
        self.shared.root()
    }

    /// Change the verbosity read by every stream of this handler
    pub fn set_level(&self, level: LogLevel) {
        self.shared.level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn level(&self) -> LogLevel {
        self.shared.level()
    }

    /// Options in effect, with defaults applied
    pub fn options(&self) -> &Options {
        &self.shared.options
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.shared.metrics
    }

    /// Rotation tasks spawned and not yet finished
    pub fn pending_rotations(&self) -> usize {
        self.shared.tracker.pending()
    }

    /// Flush every stream, wait for all rotation work and stop the worker
    ///
    /// Everything written before this call is on disk when it returns, and no
    /// compression or pruning is still running. Writes issued afterwards are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns `HandlerClosed` if this handler (or a clone) was already closed.
    pub fn close(&self) -> Result<()> {
        self.shared.close()
    }
}

fn absolute_root(path: &Path) -> Result<PathBuf> {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| {
            LoggerError::config(
                "Handler",
                format!("Cannot resolve absolute path of '{}': {}", path.display(), e),
            )
        })
}

/// Builder for constructing a Handler with a fluent API
///
/// # Example
/// ```no_run
/// use rust_stream_logger::prelude::*;
///
/// let handler = Handler::builder("logs")
///     .level(LogLevel::Trace)
///     .split_size(1024 * 1024)
///     .keep(5)
///     .queue_capacity(256)
///     .build()?;
/// # Ok::<(), LoggerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HandlerBuilder {
    path: PathBuf,
    level: LogLevel,
    options: Options,
}

impl HandlerBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            level: LogLevel::Brief,
            options: Options::default(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn split_size(mut self, bytes: u64) -> Self {
        self.options.split_size = bytes;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn keep(mut self, count: usize) -> Self {
        self.options.keep = count;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.options.queue_capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.options.dir_mode = Some(mode);
        self
    }

    /// Build the Handler
    ///
    /// # Errors
    ///
    /// See [`Handler::new`].
    pub fn build(self) -> Result<Handler> {
        Handler::new(self.path, self.level, self.options)
    }
}
