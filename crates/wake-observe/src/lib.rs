//! Observability building blocks for wake services.
//!
//! - [`init_logger`] installs the global `tracing` subscriber.
//! - [`ThrottledLogger`] and [`LogRateLimiter`] keep recurring events from flooding it.
mod logger;
pub use logger::*;

pub mod throttle;
pub use throttle::{
    LogRateLimiter, LogSink, Severity, ThrottledLogger, TracingSink, create_throttled_logger,
};
