use serde::Serialize;
use time::OffsetDateTime;

/// Value of [`KeepAliveStatus::app_url`] while no base URL is known.
pub const NOT_CONFIGURED: &str = "not configured";

/// Point-in-time view of a [`crate::KeepAlive`], suitable for a status endpoint.
///
/// Counters are read without coordinating with the loop, so a snapshot may
/// trail a ping that is finishing concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeepAliveStatus {
    pub running: bool,
    pub interval_seconds: u64,
    /// Successful (HTTP 200) pings since construction.
    pub ping_count: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_ping: Option<OffsetDateTime>,
    pub app_url: String,
}
