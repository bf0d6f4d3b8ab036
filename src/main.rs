//! # Task Relay entrypoint
//!
//! Loads configuration from the environment, builds the relay and serves
//! until interrupted. A missing signing secret aborts startup.

use std::sync::Arc;

use task_relay::{AppState, AuthRelay, RelayConfig, RelayError, Result, logging, server};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging(None);

    let config = Arc::new(RelayConfig::from_env()?);
    let relay = Arc::new(AuthRelay::new(&config)?);
    let app = server::router(AppState { relay });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            RelayError::internal_with_source(format!("failed to bind {}", config.listen_addr), e)
        })?;
    tracing::info!(
        addr = %config.listen_addr,
        backend = %config.backend_base_url,
        "relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelayError::internal_with_source("server exited with an error", e))?;

    tracing::info!("relay shut down");
    Ok(())
}

/// Resolves when ctrl-c is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
    }
}
