//! Self-ping keep-alive for services hosted on platforms that suspend idle processes.
//!
//! A [`KeepAlive`] owns one background task that sleeps for the configured
//! interval, then issues `GET {base_url}/api/health`. The base URL comes from
//! an explicit config value, `APP_URL`, or `https://{KOYEB_PUBLIC_DOMAIN}`.
//! Failures never leave the task: a non-200 answer is logged and the
//! schedule continues, a transport error is logged and followed by an extra
//! cooldown.
mod config;
pub use config::{
    DEFAULT_APP_URL_VAR, DEFAULT_FAILURE_COOLDOWN_SECS, DEFAULT_HEALTH_PATH,
    DEFAULT_INTERVAL_SECS, DEFAULT_PUBLIC_DOMAIN_VAR, DEFAULT_REQUEST_TIMEOUT_SECS,
    KeepAliveConfig,
};

mod error;
pub use error::{KeepAliveError, KeepAliveResult};

mod pinger;
pub use pinger::{HttpPinger, Pinger};

mod service;
pub use service::{KeepAlive, PingOutcome};

mod status;
pub use status::{KeepAliveStatus, NOT_CONFIGURED};

mod target;
pub use target::{EnvLookup, TargetResolver, process_env};
