//! bomcat-enrich library interface
//!
//! Component data-enrichment service: tiered supplier lookup,
//! normalization with a per-field audit trail, quality scoring, threshold
//! routing, and SSE progress streaming.

pub mod api;
pub mod db;
pub mod error;
pub mod hub;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod router;
pub mod scoring;
pub mod suppliers;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::hub::ProgressHub;
use crate::orchestrator::Orchestrator;
use bomcat_common::events::EventBus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus carrying enrichment events
    pub event_bus: EventBus,
    /// Job orchestrator
    pub orchestrator: Arc<Orchestrator>,
    /// Per-job progress fan-out
    pub hub: Arc<ProgressHub>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        orchestrator: Arc<Orchestrator>,
        hub: Arc<ProgressHub>,
    ) -> Self {
        Self {
            db,
            event_bus,
            orchestrator,
            hub,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::job_routes())
        .route("/enrich/jobs/:job_id/events", get(api::job_event_stream))
        .merge(api::review_routes())
        .merge(api::audit_routes())
        .merge(api::health_routes())
        .with_state(state)
}
