//! Suppression of repeated log lines.
//!
//! [`ThrottledLogger`] lets one line per key through every `min_interval` and
//! reports how many were swallowed in between. [`LogRateLimiter`] answers
//! "may I log this?" for N occurrences per sliding window and leaves the
//! logging to the caller.
use std::time::Duration;

mod limiter;
mod logger;
mod severity;
mod sink;

pub use limiter::{DEFAULT_MAX_PER_WINDOW, DEFAULT_WINDOW, LogRateLimiter};
pub use logger::ThrottledLogger;
pub use severity::Severity;
pub use sink::{LogSink, TracingSink};

/// Interval used by [`create_throttled_logger`] callers that have no better idea.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5);

/// Number of leading characters of a message used as its key when none is given.
pub const KEY_PREFIX_CHARS: usize = 50;

/// Builds a [`ThrottledLogger`] that writes through `tracing` under `name`.
pub fn create_throttled_logger(name: impl Into<String>, interval: Duration) -> ThrottledLogger {
    ThrottledLogger::new(name, interval)
}
