//! Line formatting for batches
//!
//! Turns one possibly multi-line message into the display lines written to a
//! stream file. The first line carries a fixed-width local timestamp, the
//! continuation lines are padded so that their text lines up under the first
//! character after the timestamp.
//!
//! ```text
//! 2025-01-08 10:30:45 request failed
//!                     caused by: connection reset
//! ```

use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

/// strftime pattern of the timestamp prefix on the first line of an entry
pub const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Width of the timestamp prefix including its trailing separator
pub const PREFIX_WIDTH: usize = 20;

/// Formatter producing the display lines of one entry
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchFormatter;

impl BatchFormatter {
    /// Format `text` stamped with the current local time
    #[must_use]
    pub fn format_now(text: &str) -> Vec<String> {
        Self::format_at(text, &Local::now())
    }

    /// Format `text` stamped with `at`
    ///
    /// Trailing whitespace is trimmed from every line, runs of blank lines
    /// collapse into one, and trailing blank lines are dropped. A message with
    /// no visible text yields no lines at all.
    #[must_use]
    pub fn format_at<Tz>(text: &str, at: &DateTime<Tz>) -> Vec<String>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let stamp = at.format(LINE_TIMESTAMP_FORMAT).to_string();
        let pad = " ".repeat(PREFIX_WIDTH);
        let mut lines: Vec<String> = Vec::new();
        let mut gap = false;

        for raw in text.split('\n') {
            let line = raw.trim_end();
            if line.is_empty() {
                if gap {
                    continue;
                }
                gap = true;
            } else {
                gap = false;
            }

            if lines.is_empty() {
                lines.push(format!("{} {}", stamp, line).trim_end().to_string());
            } else if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{}{}", pad, line));
            }
        }

        while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }
}
