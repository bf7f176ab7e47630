use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, filter::Directive};

use crate::logger::{LoggerError, LoggerResult};

/// Validated `EnvFilter` expression such as `"info"` or `"wake_keepalive=debug,info"`.
///
/// The raw string is kept so it can round-trip through config files unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    pub fn new(s: impl Into<String>) -> LoggerResult<Self> {
        Self::try_from(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether any directive in the expression names `target` or one of its submodules.
    pub fn mentions(&self, target: &str) -> bool {
        self.0.split(',').any(|directive| {
            let name = directive
                .trim()
                .split(['=', '['])
                .next()
                .unwrap_or_default();
            name == target
                || name
                    .strip_prefix(target)
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }

    /// Builds the filter, pinning every `quiet` target to `warn` unless the
    /// expression already says something about it.
    pub fn to_env_filter(&self, quiet: &[String]) -> LoggerResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(self.as_str())
            .map_err(|e| LoggerError::InvalidLevel(format!("{}: {e}", self.0)))?;

        for target in quiet.iter().filter(|t| !self.mentions(t)) {
            let directive = Directive::from_str(&format!("{target}=warn"))
                .map_err(|e| LoggerError::InvalidQuietTarget(format!("{target}: {e}")))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match EnvFilter::try_new(&s) {
            Ok(_) => Ok(Self(s)),
            Err(e) => Err(LoggerError::InvalidLevel(format!("{s}: {e}"))),
        }
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}
