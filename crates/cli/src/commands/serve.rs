//! `serve`: runs the HTTP API until SIGINT or SIGTERM.

use affiliate_core::AppConfig;
use affiliate_web_api::{spawn_cache_sweeper, ApiServer};
use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen address, overriding `server.host` and `server.port`
    #[arg(short, long)]
    pub addr: Option<String>,
}

/// Runs the web API with a periodic cache sweep.
///
/// # Errors
/// Returns an error if the database is unreachable or the server fails.
pub async fn run_serve(config: &AppConfig, args: ServeArgs) -> Result<()> {
    let (client, engine) = super::connect_engine(config).await?;
    client.ping().await?;
    let engine = Arc::new(engine);

    let sweeper = spawn_cache_sweeper(
        Arc::clone(&engine),
        Duration::from_secs(config.commissions.cache_sweep_secs),
    );

    let addr = args
        .addr
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));
    let server = ApiServer::new(engine).with_database(client.pool().clone());

    let result = server.serve(&addr, shutdown_signal()).await;

    sweeper.abort();
    tracing::info!("Commission API stopped");
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to create SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
