mod clock;
mod config;
mod error;
mod format;
mod install;
mod level;

pub use clock::{LoggerClock, LoggerTimeZone, init_local_offset};
pub use config::{DEFAULT_QUIET_TARGETS, LoggerConfig};
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;

/// Installs the global tracing subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] if a global subscriber is
/// already set. With [`LoggerTimeZone::Local`], call [`init_local_offset`]
/// in `main()` before building the tokio runtime.
///
/// ```no_run
/// use wake_observe::{LoggerConfig, init_logger};
///
/// init_logger(&LoggerConfig::default()).expect("logger");
/// tracing::info!("ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => install::text(cfg),
        LoggerFormat::Json => install::json(cfg),
        LoggerFormat::Journald => install::journald(cfg),
    }
}
