//! # HMS Server binary
//!
//! ```text
//! load config ──► select store ──► reconcile discharges ──► bind port ──► serve
//!                 (sqlite or memory)                         (first free
//!                                                             of `ports`)
//! ```
//!
//! Config file: `$HMS_CONFIG`, else `./hms.toml` when present.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use hms_db::select_store;
use hms_server::services::billing::reconcile_discharges;
use hms_server::{build_router, AppState, ServerConfig};

const DEFAULT_LOG_FILTER: &str = "hms_server=info,hms_db=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting HMS server...");

    let config_path = std::env::var_os("HMS_CONFIG").map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    info!(
        host = %config.server.host,
        ports = ?config.server.ports,
        storage = %config.storage.mode,
        "Configuration loaded"
    );

    let store = select_store(&config.storage)
        .await
        .context("No usable storage backend")?;

    match reconcile_discharges(store.as_ref(), Utc::now()).await {
        Ok(0) => {}
        Ok(n) => info!(patients = n, "Completed pending discharges"),
        Err(e) => warn!(error = %e, "Discharge reconciliation failed, continuing"),
    }

    let listener = bind_first(&config.server.host, &config.server.ports).await?;
    let addr = listener.local_addr()?;
    info!(%addr, mode = %store.mode(), "Listening");

    let app = build_router(
        AppState::new(store, config.reports),
        config.server.request_timeout(),
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Binds the first port in `ports` that is free.
async fn bind_first(host: &str, ports: &[u16]) -> anyhow::Result<TcpListener> {
    for &port in ports {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) => warn!(%addr, error = %e, "Port unavailable, trying next"),
        }
    }

    bail!("None of the configured ports {:?} could be bound", ports)
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
