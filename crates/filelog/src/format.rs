//! Formatting of `print_log` lines.

use std::fmt;
use std::thread;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::clock::LINE_TIME_FORMAT;

/// Severity of a formatted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    /// Verbose
    #[serde(alias = "v", alias = "verbose")]
    V,
    /// Debug
    #[serde(alias = "d", alias = "debug")]
    D,
    /// Info
    #[serde(alias = "i", alias = "info")]
    I,
    /// Warning
    #[serde(alias = "w", alias = "warn")]
    W,
    /// Error
    #[serde(alias = "e", alias = "error")]
    E,
}

impl LogLevel {
    /// One-letter tag used in lines.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::V => 'V',
            Self::D => 'D',
            Self::I => 'I',
            Self::W => 'W',
            Self::E => 'E',
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v" | "verbose" | "trace" => Ok(Self::V),
            "d" | "debug" => Ok(Self::D),
            "i" | "info" => Ok(Self::I),
            "w" | "warn" | "warning" => Ok(Self::W),
            "e" | "error" => Ok(Self::E),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// `name(id)` of the calling thread.
#[must_use]
pub fn thread_info() -> String {
    let current = thread::current();
    let id = format!("{:?}", current.id());
    let id = id
        .strip_prefix("ThreadId(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(&id);

    format!("{}({id})", current.name().unwrap_or("unnamed"))
}

/// `<time> <thread> <L>/<tag>: <text>`, without a trailing newline.
#[must_use]
pub fn format_line(
    level: LogLevel,
    tag: &str,
    text: &str,
    thread: &str,
    now: &DateTime<Local>,
) -> String {
    format!(
        "{} {thread} {level}/{tag}: {text}",
        now.format(LINE_TIME_FORMAT)
    )
}

/// `error` followed by one `Caused by: <source>` line per source in its chain.
#[must_use]
pub fn format_error_chain(error: &dyn std::error::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str("\nCaused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
