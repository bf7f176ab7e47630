use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::throttle::Severity;

/// Destination for lines that passed the throttle.
pub trait LogSink: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn emit(&self, severity: Severity, message: &str) {
        (**self).emit(severity, message)
    }
}

/// Sink that forwards to the global `tracing` subscriber.
///
/// The logger name is recorded as the `logger` field since tracing targets
/// must be known at compile time. `Critical` goes out at `ERROR` with
/// `critical = true`.
#[derive(Debug, Clone)]
pub struct TracingSink {
    name: String,
}

impl TracingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl LogSink for TracingSink {
    fn emit(&self, severity: Severity, message: &str) {
        let logger = self.name.as_str();
        match severity {
            Severity::Debug => debug!(logger, "{message}"),
            Severity::Info => info!(logger, "{message}"),
            Severity::Warning => warn!(logger, "{message}"),
            Severity::Error => error!(logger, "{message}"),
            Severity::Critical => error!(logger, critical = true, "{message}"),
        }
    }
}
