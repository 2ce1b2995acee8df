//! Logging macros for ergonomic log message formatting.
//!
//! These macros take a [`Stream`](crate::Stream) followed by `format!`-style
//! arguments. The level-gated ones check the handler level before formatting,
//! so disabled messages cost no allocation.
//!
//! # Examples
//!
//! ```no_run
//! use rust_stream_logger::prelude::*;
//! use rust_stream_logger::{debug, log};
//!
//! let handler = Handler::new("logs", LogLevel::Debug, Options::default())?;
//! let stream = handler.open("server.log");
//!
//! let port = 8080;
//! log!(stream, "Server listening on port {}", port);
//! debug!(stream, "Worker pool size: {}", 4);
//! # Ok::<(), LoggerError>(())
//! ```

/// Write a formatted message regardless of level.
#[macro_export]
macro_rules! log {
    ($stream:expr, $($arg:tt)+) => {
        $stream.write(format!($($arg)+))
    };
}

/// Write a formatted debug message, with a call stack at `Trace`.
#[macro_export]
macro_rules! debug {
    ($stream:expr, $($arg:tt)+) => {{
        let stream = &$stream;
        if stream.level() >= $crate::LogLevel::Debug {
            stream.debug(format!($($arg)+));
        }
    }};
}

/// Write a formatted message at `Trace` only.
#[macro_export]
macro_rules! trace {
    ($stream:expr, $($arg:tt)+) => {{
        let stream = &$stream;
        if stream.level() >= $crate::LogLevel::Trace {
            stream.trace(format!($($arg)+));
        }
    }};
}

/// Write a formatted header for a byte slice, plus its hex dump at `Trace`.
///
/// ```no_run
/// # use rust_stream_logger::prelude::*;
/// # let handler = Handler::new("logs", LogLevel::Trace, Options::default())?;
/// # let stream = handler.open("wire.log");
/// use rust_stream_logger::dump;
/// let packet = [0x16u8, 0x03, 0x01];
/// dump!(stream, &packet, "Received {} bytes", packet.len());
/// # Ok::<(), LoggerError>(())
/// ```
#[macro_export]
macro_rules! dump {
    ($stream:expr, $data:expr, $($arg:tt)+) => {{
        let stream = &$stream;
        if stream.level() >= $crate::LogLevel::Debug {
            stream.dump($data, format!($($arg)+));
        }
    }};
}
