//! HTTP surface of the agent.
//!
//! Routes:
//! - `GET /api/health`     - liveness, and the target of the self-ping
//! - `GET /api/keep-alive` - keep-alive status snapshot
use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use time::OffsetDateTime;

use wake_keepalive::{KeepAlive, KeepAliveStatus, Pinger};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

pub fn router<P: Pinger>(keep_alive: Arc<KeepAlive<P>>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/keep-alive", get(keep_alive_status::<P>))
        .with_state(keep_alive)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: OffsetDateTime::now_utc(),
    })
}

async fn keep_alive_status<P: Pinger>(
    State(keep_alive): State<Arc<KeepAlive<P>>>,
) -> Json<KeepAliveStatus> {
    Json(keep_alive.status())
}
