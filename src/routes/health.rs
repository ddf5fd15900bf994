// src/routes/health.rs
//! Service health check endpoint.
//!
//! `GET /health` reports whether the process is up and whether the database
//! answers a trivial query. It needs no credentials so container
//! orchestrators and CI can probe it.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use sqlx::PgPool;

use crate::Config;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    db_healthy: bool,
}

/// Handle `GET /health`.
///
/// Returns 200 with `status: "ok"` when the database responds, otherwise
/// 503 with `status: "degraded"`.
async fn health(State((pool, _)): State<(PgPool, Config)>) -> (StatusCode, Json<HealthResponse>) {
    // ---
    let db_healthy = match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    if db_healthy {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                db_healthy,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                db_healthy,
            }),
        )
    }
}

pub fn router() -> Router<(PgPool, Config)> {
    Router::new().route("/health", get(health))
}
