use std::io::IsTerminal;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::{LoggerFormat, LoggerLevel, LoggerResult, LoggerTimeZone};

/// Dependencies whose chatter is pinned to `warn` unless the level expression names them.
pub const DEFAULT_QUIET_TARGETS: &[&str] =
    &["hyper", "hyper_util", "reqwest", "h2", "rustls", "tower_http"];

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` expression (e.g. `"info"`, `"wake_keepalive=debug,info"`).
    pub level: LoggerLevel,
    pub tz: LoggerTimeZone,
    /// Include the event target (module path) in each line.
    pub with_targets: bool,
    /// Request ANSI colors; only honored when stdout is a terminal.
    pub use_color: bool,
    pub quiet_targets: Vec<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
            quiet_targets: DEFAULT_QUIET_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl LoggerConfig {
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }

    pub fn env_filter(&self) -> LoggerResult<EnvFilter> {
        self.level.to_env_filter(&self.quiet_targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoggerConfig::default();

        assert_eq!(config.format, LoggerFormat::Text);
        assert_eq!(config.tz, LoggerTimeZone::Utc);
        assert_eq!(config.level.as_str(), "info");
        assert!(config.with_targets);
        assert!(config.quiet_targets.iter().any(|t| t == "reqwest"));
    }

    #[test]
    fn empty_object_uses_defaults() {
        let config: LoggerConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.format, LoggerFormat::default());
        assert_eq!(config.quiet_targets.len(), DEFAULT_QUIET_TARGETS.len());
    }

    #[test]
    fn partial_override() {
        let json = r#"{"format": "json", "level": "debug", "quiet_targets": []}"#;
        let config: LoggerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.format, LoggerFormat::Json);
        assert_eq!(config.level.as_str(), "debug");
        assert!(config.quiet_targets.is_empty());
        assert!(config.use_color);
    }

    #[test]
    fn invalid_level_fails_deserialization() {
        let json = r#"{"level": "wake=shout"}"#;
        assert!(serde_json::from_str::<LoggerConfig>(json).is_err());
    }

    #[test]
    fn env_filter_builds_from_defaults() {
        assert!(LoggerConfig::default().env_filter().is_ok());
    }
}
