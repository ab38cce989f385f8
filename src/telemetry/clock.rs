//! # Clock
//!
//! Time sources used by the ingestion path and the log writer.

use std::time::Instant;

use chrono::{Datelike, Utc};

/// Earliest year treated as a valid wall-clock reading
///
/// An unsynchronised RTC boots into 1970/2000; anything before this year
/// means the wall clock has not been set.
pub const MIN_VALID_YEAR: i32 = 2023;

/// Monotonic and wall-clock readings
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin; never goes backwards
    fn now_monotonic_millis(&self) -> u64;

    /// Seconds since the Unix epoch, or `None` when the wall clock is not set
    fn wall_clock_epoch(&self) -> Option<i64>;
}

/// Process clock: monotonic time since construction plus system UTC time
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose monotonic origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_monotonic_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn wall_clock_epoch(&self) -> Option<i64> {
        let now = Utc::now();
        (now.year() >= MIN_VALID_YEAR).then(|| now.timestamp())
    }
}
