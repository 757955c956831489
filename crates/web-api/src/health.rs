//! Liveness endpoint.
//!
//! Reports database reachability (when a pool is configured) and how many
//! commission results are cached.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::{Duration, Instant};

use crate::handlers::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    /// "healthy", "degraded", "unhealthy", or "unconfigured".
    pub status: String,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseHealth,
    pub cached_results: usize,
}

/// Ping latency bounds, in milliseconds.
struct HealthThresholds {
    healthy: u64,
    degraded: u64,
}

const THRESHOLDS: HealthThresholds = HealthThresholds {
    healthy: 100,
    degraded: 1_000,
};

fn determine_status(latency_ms: Option<u64>, thresholds: &HealthThresholds) -> String {
    match latency_ms {
        None => "unhealthy".to_string(),
        Some(ms) if ms <= thresholds.healthy => "healthy".to_string(),
        Some(ms) if ms <= thresholds.degraded => "degraded".to_string(),
        Some(_) => "unhealthy".to_string(),
    }
}

async fn probe_database(pool: &PgPool) -> DatabaseHealth {
    let started = Instant::now();
    let latency_ms = match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => Some(duration_ms(started.elapsed())),
        Err(e) => {
            tracing::error!(error = %e, "Database health probe failed");
            None
        }
    };

    DatabaseHealth {
        status: determine_status(latency_ms, &THRESHOLDS),
        latency_ms,
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// GET /health - service and database status.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.database {
        Some(pool) => probe_database(pool).await,
        None => DatabaseHealth {
            status: "unconfigured".to_string(),
            latency_ms: None,
        },
    };

    let status = match database.status.as_str() {
        "unhealthy" => "unhealthy",
        "degraded" => "degraded",
        _ => "healthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        database,
        cached_results: state.engine.cached_results().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_status_bands() {
        let thresholds = HealthThresholds {
            healthy: 10,
            degraded: 60,
        };
        assert_eq!(determine_status(Some(10), &thresholds), "healthy");
        assert_eq!(determine_status(Some(11), &thresholds), "degraded");
        assert_eq!(determine_status(Some(60), &thresholds), "degraded");
        assert_eq!(determine_status(Some(61), &thresholds), "unhealthy");
        assert_eq!(determine_status(None, &thresholds), "unhealthy");
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            database: DatabaseHealth {
                status: "unconfigured".to_string(),
                latency_ms: None,
            },
            cached_results: 3,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"cachedResults\":3"));
        assert!(json.contains("\"latencyMs\":null"));
    }
}
