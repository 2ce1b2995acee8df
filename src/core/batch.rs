//! Batch and coordination message types

use super::formatter::BatchFormatter;
use crossbeam_channel::Sender;
use std::time::{Duration, Instant};

/// An immutable group of formatted lines queued for one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    lines: Vec<String>,
    received_at: Instant,
}

impl Batch {
    /// Build a batch from already formatted lines, stamped now
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            received_at: Instant::now(),
        }
    }

    /// Format `text` and wrap it in a batch, `None` if nothing would be written
    pub fn from_text(text: &str) -> Option<Self> {
        let lines = BatchFormatter::format_now(text);
        if lines.is_empty() {
            None
        } else {
            Some(Self::new(lines))
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// How long this batch has been waiting at `now`
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.received_at)
    }

    #[cfg(test)]
    pub(crate) fn with_received_at(lines: Vec<String>, received_at: Instant) -> Self {
        Self { lines, received_at }
    }
}

/// Which streams a flush command targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushTarget {
    /// A single named stream
    Stream(String),
    /// Every stream; the worker shuts down after processing it
    All,
}

impl FlushTarget {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            FlushTarget::Stream(target) => target == name,
            FlushTarget::All => true,
        }
    }
}

/// The single unit sent from streams and handlers to the worker
#[derive(Debug)]
pub enum Message {
    /// Queue a batch for a stream
    Append { stream: String, batch: Batch },
    /// Persist the target now and signal `reply` afterwards
    Flush {
        target: FlushTarget,
        reply: Sender<()>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_skips_empty() {
        assert!(Batch::from_text("   \n").is_none());
        let batch = Batch::from_text("one\ntwo").expect("non-empty batch");
        assert_eq!(batch.lines().len(), 2);
    }

    #[test]
    fn test_age() {
        let start = Instant::now();
        let batch = Batch::with_received_at(vec!["x".to_string()], start);
        assert_eq!(batch.age(start + Duration::from_secs(2)), Duration::from_secs(2));
        assert_eq!(batch.age(start), Duration::ZERO);
    }

    #[test]
    fn test_flush_target_matching() {
        assert!(FlushTarget::All.matches("app.log"));
        assert!(FlushTarget::Stream("app.log".into()).matches("app.log"));
        assert!(!FlushTarget::Stream("app.log".into()).matches("db.log"));
    }
}
