//! ecstore API Gateway
//!
//! Provides:
//! - Multipart upload with erasure coding across the storage nodes
//! - Download with reconstruction of missing fragments
//! - Node liveness, object listing and Prometheus metrics

use clap::Parser;
use ecstore_gateway::{http_api, metrics, AppState, GatewayConfig};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::parse();

    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .init();

    info!(
        http = %config.http_addr,
        nodes = ?config.storage_nodes(),
        data_fragments = config.data_fragments,
        parity_fragments = config.parity_fragments,
        "Starting ecstore gateway"
    );

    let metrics_handle = metrics::init_metrics()?;
    let http_addr = config.http_addr;
    let state = Arc::new(AppState::new(config)?);

    let app = http_api::app(state).merge(metrics::routes(metrics_handle));

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    info!("HTTP server listening on {}", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
