//! Wall-clock source for file stamps and line timestamps.

use std::fmt;

use chrono::{DateTime, Duration, Local};
use parking_lot::Mutex;

/// `YYYYMMDD`, used by date-mode file names and the daily rotation check.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// `YYYYMMDD_HHMMSS`, used by timestamp-mode and size-rotated file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Timestamp prefix of formatted log lines.
pub const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Source of the current local time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;

    /// Today's `YYYYMMDD` stamp.
    fn date_stamp(&self) -> String {
        self.now().format(DATE_FORMAT).to_string()
    }

    /// The current `YYYYMMDD_HHMMSS` stamp.
    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to. Useful for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock() = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock()
    }
}
