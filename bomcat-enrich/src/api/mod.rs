//! HTTP API for the enrichment service

mod audit;
mod health;
mod jobs;
mod reviews;
mod sse;

pub use sse::job_event_stream;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;

/// Job lifecycle routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/enrich/jobs", post(jobs::start_job))
        .route("/enrich/jobs/:job_id", get(jobs::job_status))
        .route("/enrich/jobs/:job_id/pause", post(jobs::pause_job))
        .route("/enrich/jobs/:job_id/resume", post(jobs::resume_job))
        .route("/enrich/jobs/:job_id/stop", post(jobs::stop_job))
}

/// Review queue routes
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/enrich/reviews", get(reviews::list_pending))
        .route("/enrich/reviews/:entry_id", post(reviews::resolve))
}

/// Audit trail routes
pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/enrich/audit/jobs/:job_id/runs", get(audit::job_runs))
        .route("/enrich/audit/runs/:run_id/fields", get(audit::run_fields))
        .route("/enrich/audit/daily/:date", get(audit::daily))
        .route("/enrich/audit/daily/:date/rollup", post(audit::rollup))
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health))
}
