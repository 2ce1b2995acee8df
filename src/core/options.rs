//! Handler configuration
//!
//! All fields are optional; zero values fall back to the defaults when a
//! handler is built, so a partially filled JSON document is a valid config.

use super::error::Result;
use serde::{Deserialize, Serialize};

/// Default size past which an active file is rotated (10 MiB)
pub const DEFAULT_SPLIT_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of compressed generations kept per stream
pub const DEFAULT_KEEP: usize = 10;

/// Default capacity of the coordination channel
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Configuration of a log handler
///
/// # Examples
///
/// ```
/// use rust_stream_logger::Options;
///
/// let options = Options::new()
///     .with_split_size(1024 * 1024)
///     .with_keep(5)
///     .with_queue_capacity(256);
///
/// let parsed = Options::from_json(r#"{ "split_size": 1048576, "keep": 5 }"#).unwrap();
/// assert_eq!(parsed.split_size, options.split_size);
/// assert_eq!(parsed.queue_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Size in bytes past which the active file of a stream is rotated
    pub split_size: u64,
    /// Number of compressed generations retained per stream
    pub keep: usize,
    /// Capacity of the channel between streams and the worker
    pub queue_capacity: usize,
    /// Permission bits for created directories, platform default if unset
    pub dir_mode: Option<u32>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            split_size: DEFAULT_SPLIT_SIZE,
            keep: DEFAULT_KEEP,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            dir_mode: None,
        }
    }
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON document; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid JSON for this shape
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Options = serde_json::from_str(json)?;
        Ok(options.normalized())
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_split_size(mut self, bytes: u64) -> Self {
        self.split_size = bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_keep(mut self, count: usize) -> Self {
        self.keep = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = Some(mode);
        self
    }

    /// Replace zero values with the defaults
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.split_size == 0 {
            self.split_size = DEFAULT_SPLIT_SIZE;
        }
        if self.keep == 0 {
            self.keep = DEFAULT_KEEP;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = DEFAULT_QUEUE_CAPACITY;
        }
        self
    }
}
