//! Review queue handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queue;
use crate::error::{ApiError, ApiResult};
use crate::models::CanonicalComponent;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ReviewEntryResponse {
    pub id: Uuid,
    pub run_id: Uuid,
    pub job_id: Uuid,
    pub line_id: Uuid,
    pub mpn: String,
    pub quality_score: f64,
    pub candidate: CanonicalComponent,
}

/// GET /enrich/reviews - entries awaiting a human decision
pub async fn list_pending(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ReviewEntryResponse>>> {
    let entries = queue::pending_reviews(&state.db).await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|e| ReviewEntryResponse {
                id: e.id,
                run_id: e.run_id,
                job_id: e.job_id,
                line_id: e.line_id,
                mpn: e.mpn,
                quality_score: e.quality_score,
                candidate: e.candidate,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub accepted: bool,
    pub reviewed_by: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub entry_id: Uuid,
    pub status: &'static str,
}

/// POST /enrich/reviews/:entry_id - accept or reject a candidate
pub async fn resolve(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<Json<ResolveResponse>> {
    if request.reviewed_by.trim().is_empty() {
        return Err(ApiError::BadRequest("reviewed_by is required".to_string()));
    }

    queue::resolve_review(&state.db, entry_id, request.accepted, &request.reviewed_by).await?;

    tracing::info!(
        entry_id = %entry_id,
        accepted = request.accepted,
        reviewed_by = %request.reviewed_by,
        "Review resolved"
    );

    Ok(Json(ResolveResponse {
        entry_id,
        status: if request.accepted { "accepted" } else { "rejected" },
    }))
}
