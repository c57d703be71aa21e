//! # Sweet Store API
//!
//! REST server for the Sweet Store back-office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Store API Server                                 │
//! │                                                                         │
//! │  Clients ───► HTTP (5000) ───► /api/v1 routes ───► SQLite              │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                                    Mailer                               │
//! │                                (log delivery)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use store_api::{build_router, ApiConfig, AppState, LogMailer};
use store_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,store_api=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Sweet Store API server...");

    // Load configuration
    let config = ApiConfig::load().context("loading configuration")?;
    info!(
        port = config.port,
        database = %config.database_path,
        env = %config.app_env,
        "Configuration loaded"
    );

    // Open database (migrations run on connect)
    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await
    .context("opening database")?;
    info!("Database ready");

    let addr = config.bind_address();
    let state = AppState::new(db.clone(), config, Arc::new(LogMailer));
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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
