//! Errors carrying a captured call stack
//!
//! [`TracedError`] captures the call stack at most once and renders as the
//! error message followed by one tab-indented line per frame. Frames belonging
//! to the standard library, the panic machinery and the capture itself are
//! left out.
//!
//! [`catch_panic`] runs a closure, recovers a panic and normalizes the payload
//! into a `TracedError` whose frames point at the panic site.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// One entry of a captured call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "({}:{}) {}", file, line, self.function),
            (Some(file), None) => write!(f, "({}) {}", file, self.function),
            _ => write!(f, "{}", self.function),
        }
    }
}

/// An error value with an optional, capture-once call stack
#[derive(Debug)]
pub struct TracedError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
    frames: Vec<Frame>,
    captured: bool,
}

impl TracedError {
    /// Create an error from a message, without a stack
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            frames: Vec::new(),
            captured: false,
        }
    }

    /// Wrap an existing error, without a stack
    pub fn from_error<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
            frames: Vec::new(),
            captured: false,
        }
    }

    /// Capture the current call stack unless one was captured before
    pub fn trace(&mut self) {
        if self.captured {
            return;
        }
        self.frames = capture_frames();
        self.captured = true;
    }

    /// Capture the current call stack and return self
    #[must_use]
    pub fn traced(mut self) -> Self {
        self.trace();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_traced(&self) -> bool {
        self.captured
    }

    fn with_frames(mut self, frames: Option<Vec<Frame>>) -> Self {
        if self.captured {
            return self;
        }
        match frames {
            Some(frames) => {
                self.frames = frames;
                self.captured = true;
                self
            }
            None => self.traced(),
        }
    }

    /// Normalize a recovered panic payload
    ///
    /// A payload that already is a `TracedError` keeps its own stack if it has
    /// one; otherwise `frames` (taken at the panic site) is attached.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>, frames: Option<Vec<Frame>>) -> Self {
        let err = match payload.downcast::<TracedError>() {
            Ok(traced) => *traced,
            Err(payload) => {
                if let Some(s) = payload.downcast_ref::<&str>() {
                    TracedError::new(*s)
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    TracedError::new(s.clone())
                } else {
                    TracedError::new("Unknown panic")
                }
            }
        };
        err.with_frames(frames)
    }
}

impl fmt::Display for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for frame in &self.frames {
            write!(f, "\n\t{}", frame)?;
        }
        Ok(())
    }
}

impl Error for TracedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn Error + 'static))
    }
}

fn capture_frames() -> Vec<Frame> {
    parse_backtrace(&Backtrace::force_capture().to_string())
}

/// Parse the textual rendering of a `std::backtrace::Backtrace`
pub(crate) fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    let mut keep_last = false;

    for line in text.lines() {
        let line = line.trim_start();
        if let Some(location) = line.strip_prefix("at ") {
            if !keep_last {
                continue;
            }
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    let (file, number) = split_location(location);
                    frame.file = Some(file);
                    frame.line = number;
                }
            }
            continue;
        }

        let Some((index, function)) = line.split_once(": ") else {
            continue;
        };
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let function = strip_hash(function.trim());
        keep_last = !is_runtime_frame(function);
        if keep_last {
            frames.push(Frame {
                function: function.to_string(),
                file: None,
                line: None,
            });
        }
    }
    frames
}

fn strip_hash(function: &str) -> &str {
    match function.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.bytes().all(|b| b.is_ascii_hexdigit()) => {
            head
        }
        _ => function,
    }
}

fn is_runtime_frame(function: &str) -> bool {
    const RUNTIME_PREFIXES: &[&str] = &[
        "std::",
        "core::",
        "alloc::",
        "test::",
        "rust_begin_unwind",
        "rust_panic",
        "__rust",
        "__libc",
        "_start",
        "start_thread",
        "clone",
        "<unknown>",
    ];
    const CAPTURE_FRAMES: &[&str] = &[
        "traced_error::capture_frames",
        "traced_error::TracedError::trace",
        "traced_error::TracedError::with_frames",
        "traced_error::install_panic_hook",
        "stream::Stream::debug",
    ];

    RUNTIME_PREFIXES.iter().any(|p| function.starts_with(p))
        || function.starts_with("<core::")
        || function.starts_with("<alloc::")
        || function.starts_with("<std::")
        || function.contains(" as core::ops::function::")
        || CAPTURE_FRAMES.iter().any(|p| function.contains(p))
}

/// Split `path/to/src/file.rs:12:5` into `("src/file.rs", Some(12))`
fn split_location(location: &str) -> (String, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let rest = parts.next();

    let (path, line) = match (rest, middle, last) {
        (Some(path), Some(line), Some(_column)) => (path, line.parse().ok()),
        _ => match location.rsplit_once(':') {
            Some((path, line)) => (path, line.parse().ok()),
            None => (location, None),
        },
    };
    (short_path(path), line)
}

/// Keep the last two components of a source path
fn short_path(path: &str) -> String {
    let parts: Vec<&str> = path.split(['/', '\\']).filter(|p| !p.is_empty()).collect();
    let start = parts.len().saturating_sub(2);
    parts[start..].join("/")
}

thread_local! {
    static CATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
    static PANIC_FRAMES: RefCell<Option<Vec<Frame>>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Install a hook that records the stack of panics raised under `catch_panic`
///
/// Panics outside of `catch_panic` are forwarded to the previous hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CATCH_DEPTH.with(Cell::get) > 0 {
                let frames = capture_frames();
                PANIC_FRAMES.with(|slot| *slot.borrow_mut() = Some(frames));
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `f`, converting a panic into a [`TracedError`]
pub fn catch_panic<F, R>(f: F) -> std::result::Result<R, TracedError>
where
    F: FnOnce() -> R,
{
    install_panic_hook();
    CATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CATCH_DEPTH.with(|depth| depth.set(depth.get() - 1));

    result.map_err(|payload| {
        let frames = PANIC_FRAMES.with(|slot| slot.borrow_mut().take());
        TracedError::from_panic(payload, frames)
    })
}
