/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "active_connections": 1, "idle_connections": 1, "total_connections": 2 }
/// }
/// ```
///
/// `database` is `"not_configured"` when the stores are not Postgres-backed.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use parley_shared::db::pool::{get_pool_stats, health_check as ping, PoolStats};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let (database, pool) = match &state.db {
        Some(pool) => match ping(pool).await {
            Ok(()) => ("connected", Some(get_pool_stats(pool))),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                ("disconnected", None)
            }
        },
        None => ("not_configured", None),
    };

    Ok(Json(HealthResponse {
        status: if database == "disconnected" {
            "degraded"
        } else {
            "healthy"
        },
        version: env!("CARGO_PKG_VERSION"),
        database,
        pool,
    }))
}
