use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{KeepAliveError, KeepAliveResult};

pub const DEFAULT_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FAILURE_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_HEALTH_PATH: &str = "/api/health";
pub const DEFAULT_APP_URL_VAR: &str = "APP_URL";
pub const DEFAULT_PUBLIC_DOMAIN_VAR: &str = "KOYEB_PUBLIC_DOMAIN";

/// Keep-alive settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Delay before every ping.
    pub interval_secs: u64,
    /// Base URL that takes precedence over anything found in the environment.
    pub app_url: Option<String>,
    /// Variable holding the explicit base URL.
    pub app_url_var: String,
    /// Variable holding the platform's public domain, used as `https://{domain}`.
    pub public_domain_var: String,
    pub health_path: String,
    pub request_timeout_secs: u64,
    /// Extra wait after a transport failure, on top of the interval.
    pub failure_cooldown_secs: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            app_url: None,
            app_url_var: DEFAULT_APP_URL_VAR.to_string(),
            public_domain_var: DEFAULT_PUBLIC_DOMAIN_VAR.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            failure_cooldown_secs: DEFAULT_FAILURE_COOLDOWN_SECS,
        }
    }
}

impl KeepAliveConfig {
    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = Some(url.into());
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_secs(self.failure_cooldown_secs)
    }

    pub fn validate(&self) -> KeepAliveResult<()> {
        if self.interval_secs == 0 {
            return Err(KeepAliveError::InvalidConfig(
                "interval_secs must be > 0".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(KeepAliveError::InvalidConfig(
                "request_timeout_secs must be > 0".into(),
            ));
        }
        if self.app_url_var.trim().is_empty() || self.public_domain_var.trim().is_empty() {
            return Err(KeepAliveError::InvalidConfig(
                "environment variable names must not be empty".into(),
            ));
        }
        Ok(())
    }
}
