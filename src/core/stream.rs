//! Application-facing stream handle

use super::{
    batch::{Batch, FlushTarget},
    error::Result,
    handler::Shared,
    hexdump,
    log_level::LogLevel,
    traced_error::{catch_panic, TracedError},
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A named log file under a handler's root
///
/// Streams are cheap to clone and may be used from any thread. Writes from
/// one thread to one stream reach the file in the order they were issued.
#[derive(Clone)]
pub struct Stream {
    name: Arc<str>,
    shared: Arc<Shared>,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("name", &self.name)
            .field("root", &self.shared.root())
            .finish()
    }
}

impl Stream {
    pub(crate) fn new(name: String, shared: Arc<Shared>) -> Self {
        Self {
            name: name.into(),
            shared,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path of the active file
    pub fn path(&self) -> PathBuf {
        self.shared.root().join(&*self.name)
    }

    /// Current level of the owning handler
    pub fn level(&self) -> LogLevel {
        self.shared.level()
    }

    /// Queue a message, whatever the level
    ///
    /// Blocks while the worker queue is full. Messages without visible text
    /// are ignored.
    pub fn write(&self, text: impl AsRef<str>) {
        if let Some(batch) = Batch::from_text(text.as_ref()) {
            self.shared.append(&self.name, batch);
        }
    }

    /// Queue a message at `Debug` and above; at `Trace` the call stack is appended
    pub fn debug(&self, text: impl AsRef<str>) {
        match self.level() {
            LogLevel::Brief => {}
            LogLevel::Debug => self.write(text),
            LogLevel::Trace => self.write(TracedError::new(text.as_ref()).traced().to_string()),
        }
    }

    /// Queue a message only at `Trace`
    pub fn trace(&self, text: impl AsRef<str>) {
        if self.level() == LogLevel::Trace {
            self.write(text);
        }
    }

    /// Queue `header` at `Debug`; at `Trace` a hex dump of `data` follows as its own entry
    pub fn dump(&self, data: &[u8], header: impl AsRef<str>) {
        match self.level() {
            LogLevel::Brief => {}
            LogLevel::Debug => self.write(header),
            LogLevel::Trace => {
                self.write(header);
                self.write(hexdump::render(data));
            }
        }
    }

    /// Run `f`, logging a panic as `[CATCH] <error>` instead of unwinding
    ///
    /// Returns `None` if `f` panicked.
    pub fn catch<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        match catch_panic(f) {
            Ok(value) => Some(value),
            Err(err) => {
                self.write(format!("[CATCH] {}", err));
                None
            }
        }
    }

    /// Run `f` and pass the outcome to `handler`
    ///
    /// `handler` is always called, with `None` when `f` returned normally and
    /// with the recovered panic otherwise.
    pub fn catch_with<F, R, H>(&self, f: F, handler: H) -> Option<R>
    where
        F: FnOnce() -> R,
        H: FnOnce(&Stream, Option<TracedError>),
    {
        match catch_panic(f) {
            Ok(value) => {
                handler(self, None);
                Some(value)
            }
            Err(err) => {
                handler(self, Some(err));
                None
            }
        }
    }

    /// Block until everything written to this stream before the call is on disk
    ///
    /// # Errors
    ///
    /// Returns `HandlerClosed` if the handler has been closed.
    pub fn flush(&self) -> Result<()> {
        self.shared.flush(FlushTarget::Stream(self.name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{formatter::PREFIX_WIDTH, handler::Handler, options::Options};
    use std::fs;
    use tempfile::tempdir;

    fn handler(level: LogLevel) -> (tempfile::TempDir, Handler) {
        let dir = tempdir().unwrap();
        let handler = Handler::new(dir.path(), level, Options::default()).unwrap();
        (dir, handler)
    }

    fn lines(stream: &Stream) -> Vec<String> {
        fs::read_to_string(stream.path())
            .unwrap_or_default()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_accessors() {
        let (dir, handler) = handler(LogLevel::Debug);
        let log = handler.open("sub/app.log");

        assert_eq!(log.name(), "sub/app.log");
        assert_eq!(log.path(), dir.path().join("sub").join("app.log"));
        assert_eq!(log.level(), LogLevel::Debug);
        handler.close().unwrap();
    }

    #[test]
    fn test_write_and_flush() {
        let (_dir, handler) = handler(LogLevel::Brief);
        let log = handler.open("app.log");
        log.write("one");
        log.write("two");
        log.write("   ");
        log.flush().unwrap();

        let written = lines(&log);
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with(" one"));
        assert!(written[1].ends_with(" two"));
        handler.close().unwrap();
    }

    #[test]
    fn test_level_gating() {
        let (_dir, handler) = handler(LogLevel::Brief);
        let log = handler.open("gated.log");

        log.debug("hidden debug");
        log.trace("hidden trace");
        log.dump(b"abc", "hidden dump");
        log.flush().unwrap();
        assert!(lines(&log).is_empty());

        handler.set_level(LogLevel::Debug);
        log.debug("shown debug");
        log.trace("still hidden");
        log.dump(b"abc", "dump header");
        log.flush().unwrap();

        let written = lines(&log);
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("shown debug"));
        assert!(written[1].ends_with("dump header"));
        handler.close().unwrap();
    }

    #[test]
    fn test_trace_level_output() {
        let (_dir, handler) = handler(LogLevel::Trace);
        let log = handler.open("trace.log");

        log.trace("plain trace");
        log.dump(b"AB", "packet");
        log.flush().unwrap();

        let written = lines(&log);
        assert!(written[0].ends_with("plain trace"));
        assert!(written[1].ends_with("packet"));
        assert_eq!(written.len(), 3);
        assert_eq!(&written[2][4..5], "-");
        assert_eq!(&written[2][13..14], ":");
        assert!(written[2][PREFIX_WIDTH..].starts_with("00000000  41 42"));
        assert!(written[2].ends_with("|AB|"));
        handler.close().unwrap();
    }

    #[test]
    fn test_debug_at_trace_appends_stack() {
        let (_dir, handler) = handler(LogLevel::Trace);
        let log = handler.open("stack.log");

        log.debug("with stack");
        log.flush().unwrap();

        let written = lines(&log);
        assert!(written[0].ends_with("with stack"));
        assert!(written.len() > 1);
        handler.close().unwrap();
    }

    #[test]
    fn test_catch_logs_panic() {
        let (_dir, handler) = handler(LogLevel::Brief);
        let log = handler.open("catch.log");

        let value = log.catch(|| 7);
        assert_eq!(value, Some(7));

        let value: Option<()> = log.catch(|| panic!("boom"));
        assert!(value.is_none());
        log.flush().unwrap();

        let written = lines(&log);
        assert!(written[0].ends_with("[CATCH] boom"));
        handler.close().unwrap();
    }

    #[test]
    fn test_catch_with_observes_once() {
        let (_dir, handler) = handler(LogLevel::Brief);
        let log = handler.open("catch_with.log");
        let mut seen = Vec::new();

        log.catch_with(|| (), |_, err| seen.push(err.map(|e| e.message().to_string())));
        log.catch_with(
            || panic!("{}", "formatted"),
            |_, err| seen.push(err.map(|e| e.message().to_string())),
        );

        assert_eq!(seen, vec![None, Some("formatted".to_string())]);
        log.flush().unwrap();
        assert!(lines(&log).is_empty());
        handler.close().unwrap();
    }

    #[test]
    fn test_catch_keeps_traced_payload() {
        let (_dir, handler) = handler(LogLevel::Brief);
        let log = handler.open("payload.log");

        let mut message = None;
        log.catch_with(
            || std::panic::panic_any(TracedError::new("typed failure")),
            |_, err| message = err.map(|e| e.message().to_string()),
        );
        assert_eq!(message.as_deref(), Some("typed failure"));
        handler.close().unwrap();
    }
}
