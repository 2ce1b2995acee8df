//! The serialized worker loop
//!
//! One worker runs per handler. It is the only owner of the [`StreamCache`]
//! and the only writer of active stream files, so neither needs a lock: every
//! append, flush request and shutdown is processed in channel order on this
//! thread. Rotation work is handed to [`Rotator`] threads and joined at
//! shutdown through the [`RotationTracker`].
//!
//! Each iteration:
//!
//! 1. waits for a message or the one-second tick,
//! 2. queues an appended batch, or remembers a flush command,
//! 3. flushes every stream the command targets or whose oldest batch is due,
//! 4. answers a named flush, or, for a full flush, waits for rotations,
//!    answers and exits.

use super::cache::StreamCache;
use super::rotator::{self, Rotator};
use super::tracker::RotationTracker;
use crate::core::batch::{Batch, FlushTarget, Message};
use crate::core::error::{LoggerError, Result};
use crate::core::metrics::EngineMetrics;
use crossbeam_channel::{select, tick, Receiver, Sender};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Period of the time check that persists batches without explicit flushes
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Age at which a pending batch is persisted by the time check
pub const MAX_BATCH_AGE: Duration = Duration::from_secs(1);

/// Settings the worker needs from the handler options
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub root: PathBuf,
    pub split_size: u64,
    pub keep: usize,
    pub dir_mode: Option<u32>,
}

enum Event {
    Append(String, Batch),
    Command(FlushTarget, Sender<()>),
    Tick,
    Disconnected,
}

pub struct Worker {
    config: WorkerConfig,
    cache: StreamCache,
    receiver: Receiver<Message>,
    tracker: Arc<RotationTracker>,
    metrics: Arc<EngineMetrics>,
}

impl Worker {
    pub fn new(
        config: WorkerConfig,
        receiver: Receiver<Message>,
        tracker: Arc<RotationTracker>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            config,
            cache: StreamCache::new(),
            receiver,
            tracker,
            metrics,
        }
    }

    /// Start the loop on a dedicated thread
    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("stream-logger-worker".to_string())
            .spawn(move || self.run())
    }

    /// Run until a full flush arrives or every sender is gone
    pub fn run(mut self) {
        let ticker = tick(FLUSH_INTERVAL);

        loop {
            let event = select! {
                recv(self.receiver) -> msg => match msg {
                    Ok(Message::Append { stream, batch }) => Event::Append(stream, batch),
                    Ok(Message::Flush { target, reply }) => Event::Command(target, reply),
                    Err(_) => Event::Disconnected,
                },
                recv(ticker) -> _ => Event::Tick,
            };

            match event {
                Event::Append(stream, batch) => {
                    if !batch.lines().is_empty() {
                        self.cache.append(stream, batch);
                    }
                    self.flush_due(None);
                }
                Event::Tick => self.flush_due(None),
                Event::Command(FlushTarget::Stream(name), reply) => {
                    self.flush_due(Some(&FlushTarget::Stream(name)));
                    let _ = reply.send(());
                }
                Event::Command(FlushTarget::All, reply) => {
                    self.flush_due(Some(&FlushTarget::All));
                    self.tracker.wait_idle();
                    let _ = reply.send(());
                    self.discard_late();
                    return;
                }
                Event::Disconnected => {
                    self.flush_due(Some(&FlushTarget::All));
                    self.tracker.wait_idle();
                    return;
                }
            }
        }
    }

    /// Count appends that raced with shutdown as dropped
    ///
    /// Late flush commands lose their reply sender, so their callers see the
    /// handler as closed.
    fn discard_late(&self) {
        let mut late = 0u64;
        while let Ok(message) = self.receiver.try_recv() {
            if let Message::Append { .. } = message {
                late += 1;
            }
        }
        if late > 0 {
            self.metrics.record_dropped(late);
            eprintln!(
                "[LOGGER WARNING] Dropped {} batch(es) written after the handler was closed",
                late
            );
        }
    }

    /// Flush every stream selected by `target` or old enough to be due
    fn flush_due(&mut self, target: Option<&FlushTarget>) {
        if self.cache.is_empty() {
            return;
        }
        for name in self.cache.due(target, Instant::now(), MAX_BATCH_AGE) {
            self.flush_stream(&name);
        }
    }

    /// Persist and discard every batch pending for `name`
    ///
    /// The entry is removed whether or not the write succeeds. A failure is
    /// reported on stderr; batches already flushed to the file count as
    /// written, the rest are lost and counted as dropped. The loop continues
    /// with the other streams.
    fn flush_stream(&mut self, name: &str) {
        let batches = self.cache.take(name);
        if batches.is_empty() {
            return;
        }

        let mut progress = Progress::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.persist(name, &batches, &mut progress)
        }));

        if progress.lines > 0 {
            self.metrics.record_written(progress.lines);
        }
        let lost = (batches.len() - progress.batches) as u64;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                eprintln!("[LOGGER ERROR] {}", e);
                self.metrics.record_dropped(lost);
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                eprintln!(
                    "[LOGGER CRITICAL] Flush of '{}' panicked: {}. \
                     Other streams continue to function.",
                    name, panic_msg
                );
                self.metrics.record_dropped(lost);
            }
        }
    }

    /// Write `batches` to the file of `name`, rotating it first if it is too large
    fn persist(&self, name: &str, batches: &[Batch], progress: &mut Progress) -> Result<()> {
        let path = self.config.root.join(name);
        let fail = |message: String| {
            LoggerError::persistence(path.display().to_string(), batches.len(), message)
        };

        rotator::ensure_parent(&path, self.config.dir_mode)
            .map_err(|e| fail(format!("Failed to create directory: {}", e)))?;

        match rotator::rotate_active(&path, self.config.split_size) {
            Ok(Some(_backup)) => {
                self.metrics.record_rotation();
                Rotator::new(
                    path.clone(),
                    self.config.keep,
                    Arc::clone(&self.metrics),
                    Arc::clone(&self.tracker),
                )
                .spawn();
            }
            Ok(None) => {}
            Err(e) => {
                eprintln!("[LOGGER WARNING] {}. Continuing with current file.", e);
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| fail(format!("Failed to open: {}", e)))?;
        let mut writer = BufWriter::new(file);
        write_batches(&mut writer, batches, progress).map_err(|e| {
            LoggerError::persistence(
                path.display().to_string(),
                batches.len() - progress.batches,
                format!("Failed to write: {}", e),
            )
        })
    }
}

/// Batches and lines of one flush that reached the file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Progress {
    batches: usize,
    lines: u64,
}

/// Write `batches` one at a time, flushing `writer` after each
///
/// `progress` only advances once a batch has been flushed, so on error it
/// tells how much of the flush is on disk.
fn write_batches<W: Write>(
    writer: &mut W,
    batches: &[Batch],
    progress: &mut Progress,
) -> std::io::Result<()> {
    for batch in batches {
        for line in batch.lines() {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        progress.batches += 1;
        progress.lines += batch.lines().len() as u64;
    }
    Ok(())
}
