use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use wake_keepalive::{KeepAlive, process_env};
use wake_observe::{LoggerTimeZone, init_local_offset, init_logger};

mod config;
mod http;

use config::AgentConfig;

fn main() -> anyhow::Result<()> {
    let cfg = AgentConfig::from_env(&process_env())?;

    // offset detection only works before worker threads exist
    if cfg.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(run(cfg))
}

async fn run(cfg: AgentConfig) -> anyhow::Result<()> {
    // 1) logger
    init_logger(&cfg.logger)?;
    info!(format = %cfg.logger.format, level = cfg.logger.level.as_str(), "logger initialized");

    // 2) keep-alive, owned here and shared with the status endpoint
    let keep_alive = Arc::new(KeepAlive::new(cfg.keep_alive.clone())?);
    if cfg.keep_alive_enabled {
        keep_alive.start();
    } else {
        info!("keep-alive disabled");
    }

    // 3) http
    let listener = TcpListener::bind(("0.0.0.0", cfg.port))
        .await
        .with_context(|| format!("failed to bind port {}", cfg.port))?;
    info!(addr = %listener.local_addr()?, "http server listening");

    let served = axum::serve(listener, http::router(Arc::clone(&keep_alive)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // 4) teardown: no ping may run once we return
    keep_alive.stop().await;
    served.context("http server failed")?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}
