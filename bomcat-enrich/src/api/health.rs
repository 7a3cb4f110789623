//! Health check handler

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: i64,
    pub database: &'static str,
}

/// GET /health - liveness plus a database ping
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health check database ping failed");
            "error"
        }
    };

    Json(HealthResponse {
        status: "ok",
        uptime_seconds: (chrono::Utc::now() - state.startup_time).num_seconds(),
        database,
    })
}
