//! Job lifecycle handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::PartQuery;
use crate::orchestrator::LineItem;
use crate::AppState;
use bomcat_common::events::JobProgress;

#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    pub items: Vec<StartJobItem>,
}

#[derive(Debug, Deserialize)]
pub struct StartJobItem {
    pub mpn: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub job_id: Uuid,
    pub progress: JobProgress,
}

/// POST /enrich/jobs - start a new enrichment job
pub async fn start_job(
    State(state): State<AppState>,
    Json(request): Json<StartJobRequest>,
) -> ApiResult<Json<StartJobResponse>> {
    if request.items.is_empty() {
        return Err(ApiError::BadRequest("items must not be empty".to_string()));
    }
    if request.items.iter().any(|i| i.mpn.trim().is_empty()) {
        return Err(ApiError::BadRequest("every item needs an mpn".to_string()));
    }

    let items: Vec<LineItem> = request
        .items
        .into_iter()
        .map(|item| {
            let mut query = PartQuery::new(item.mpn);
            query.manufacturer = item.manufacturer;
            LineItem::new(query)
        })
        .collect();

    let job_id = state.orchestrator.start(items).await?;
    let progress = state.orchestrator.status(job_id).await?;

    Ok(Json(StartJobResponse { job_id, progress }))
}

/// GET /enrich/jobs/:job_id - progress snapshot
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobProgress>> {
    Ok(Json(state.orchestrator.status(job_id).await?))
}

/// POST /enrich/jobs/:job_id/pause
pub async fn pause_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobProgress>> {
    Ok(Json(state.orchestrator.pause(job_id).await?))
}

/// POST /enrich/jobs/:job_id/resume
pub async fn resume_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobProgress>> {
    Ok(Json(state.orchestrator.resume(job_id).await?))
}

/// POST /enrich/jobs/:job_id/stop
pub async fn stop_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobProgress>> {
    Ok(Json(state.orchestrator.stop(job_id).await?))
}
