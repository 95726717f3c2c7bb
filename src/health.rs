//! Liveness and database reachability probe.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: String,
}

pub fn router(pool: PgPool) -> Router {
    Router::new().route("/health", get(health_check)).with_state(pool)
}

async fn health_check(State(pool): State<PgPool>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthReport {
                status: "ok",
                database: "reachable",
                timestamp: Utc::now().to_rfc3339(),
            }),
        ),
        Err(err) => {
            error!(error = %err, "health check failed to reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport {
                    status: "degraded",
                    database: "unreachable",
                    timestamp: Utc::now().to_rfc3339(),
                }),
            )
        }
    }
}
