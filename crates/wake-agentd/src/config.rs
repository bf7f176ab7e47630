//! Process configuration read once from the environment at startup.
use thiserror::Error;

use wake_keepalive::{EnvLookup, KeepAliveConfig};
use wake_observe::{LoggerConfig, LoggerFormat, LoggerLevel, LoggerTimeZone};

pub const DEFAULT_PORT: u16 = 8000;

/// Interval used by the agent, shorter than the library default so the
/// platform's idle timer never gets close.
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 240;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub logger: LoggerConfig,
    pub port: u16,
    pub keep_alive: KeepAliveConfig,
    pub keep_alive_enabled: bool,
}

impl AgentConfig {
    /// Reads `LOG_LEVEL`, `LOG_FORMAT`, `LOG_TZ`, `PORT`,
    /// `KEEPALIVE_INTERVAL_SECS` and `KEEPALIVE_ENABLED`. Unset or blank
    /// variables keep their defaults.
    pub fn from_env(env: &EnvLookup) -> Result<Self, ConfigError> {
        let mut logger = LoggerConfig::default();
        if let Some(v) = var(env, "LOG_LEVEL") {
            logger.level = parse("LOG_LEVEL", &v, LoggerLevel::new(v.clone()))?;
        }
        if let Some(v) = var(env, "LOG_FORMAT") {
            logger.format = parse("LOG_FORMAT", &v, v.parse::<LoggerFormat>())?;
        }
        if let Some(v) = var(env, "LOG_TZ") {
            logger.tz = parse("LOG_TZ", &v, v.parse::<LoggerTimeZone>())?;
        }

        let port = match var(env, "PORT") {
            Some(v) => parse("PORT", &v, v.parse::<u16>())?,
            None => DEFAULT_PORT,
        };

        let interval_secs = match var(env, "KEEPALIVE_INTERVAL_SECS") {
            Some(v) => parse("KEEPALIVE_INTERVAL_SECS", &v, v.parse::<u64>())?,
            None => DEFAULT_KEEPALIVE_INTERVAL_SECS,
        };
        let keep_alive = KeepAliveConfig::default().with_interval_secs(interval_secs);
        keep_alive.validate().map_err(|e| ConfigError::Invalid {
            var: "KEEPALIVE_INTERVAL_SECS",
            value: interval_secs.to_string(),
            reason: e.to_string(),
        })?;

        let keep_alive_enabled = match var(env, "KEEPALIVE_ENABLED") {
            Some(v) => parse_flag("KEEPALIVE_ENABLED", &v)?,
            None => true,
        };

        Ok(Self {
            logger,
            port,
            keep_alive,
            keep_alive_enabled,
        })
    }
}

fn var(env: &EnvLookup, key: &str) -> Option<String> {
    env(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse<T, E: std::fmt::Display>(
    var: &'static str,
    value: &str,
    parsed: Result<T, E>,
) -> Result<T, ConfigError> {
    parsed.map_err(|e| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected true|false".into(),
        }),
    }
}
