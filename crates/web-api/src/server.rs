use crate::handlers::{self, AppState};
use crate::health;
use affiliate_commissions::CommissionEngine;
use axum::{routing::get, Router};
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    #[must_use]
    pub const fn new(engine: Arc<CommissionEngine>) -> Self {
        Self {
            state: AppState {
                engine,
                database: None,
            },
        }
    }

    /// Enables database probing on `/health`.
    #[must_use]
    pub fn with_database(mut self, pool: PgPool) -> Self {
        self.state.database = Some(pool);
        self
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/commissions", get(handlers::get_commissions))
            .route(
                "/api/commissions/details",
                get(handlers::get_commission_details),
            )
            .route("/api/network/tree", get(handlers::get_network_tree))
            .route("/api/network/search", get(handlers::search_members))
            .route("/api/network/stats", get(handlers::get_network_stats))
            .route("/health", get(health::health))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server and runs until `shutdown` resolves.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve<F>(self, addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

/// Periodically drops expired cached results.
pub fn spawn_cache_sweeper(engine: Arc<CommissionEngine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = engine.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Cache sweep finished");
            }
        }
    })
}
