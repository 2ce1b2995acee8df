//! Core logger types: handler, streams, batches and their supporting values

pub mod batch;
pub mod error;
pub mod formatter;
pub mod handler;
pub mod hexdump;
pub mod log_level;
pub mod metrics;
pub mod options;
pub mod stream;
pub mod traced_error;

pub use batch::{Batch, FlushTarget, Message};
pub use error::{LoggerError, Result};
pub use formatter::{BatchFormatter, LINE_TIMESTAMP_FORMAT, PREFIX_WIDTH};
pub use handler::{Handler, HandlerBuilder};
pub use log_level::LogLevel;
pub use metrics::EngineMetrics;
pub use options::{Options, DEFAULT_KEEP, DEFAULT_QUEUE_CAPACITY, DEFAULT_SPLIT_SIZE};
pub use stream::Stream;
pub use traced_error::{catch_panic, Frame, TracedError};
