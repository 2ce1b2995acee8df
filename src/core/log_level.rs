//! Verbosity level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verbosity of a handler.
///
/// `Brief` emits only plain writes, `Debug` adds debug messages and dump headers,
/// `Trace` adds trace messages, call stacks on debug messages and hex dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum LogLevel {
    #[default]
    Brief = 0,
    Debug = 1,
    Trace = 2,
}

impl LogLevel {
    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Brief => "BRIEF",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Convert a raw level, clamping it into `[Brief, Trace]`
    #[must_use]
    pub fn clamped(raw: i64) -> Self {
        match raw {
            i64::MIN..=0 => LogLevel::Brief,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    #[inline]
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub(crate) fn from_u8(raw: u8) -> Self {
        Self::clamped(i64::from(raw))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BRIEF" => Ok(LogLevel::Brief),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}
