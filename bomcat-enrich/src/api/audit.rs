//! Audit trail handlers

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::db::audit;
use crate::error::{ApiError, ApiResult};
use crate::models::{EnrichmentRun, FieldComparison, SupplierQualityDaily};
use crate::AppState;

/// GET /enrich/audit/jobs/:job_id/runs - all runs recorded for a job
pub async fn job_runs(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<Vec<EnrichmentRun>>> {
    Ok(Json(audit::runs_for_job(&state.db, job_id).await?))
}

/// GET /enrich/audit/runs/:run_id/fields - field comparisons for one run
pub async fn run_fields(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<Vec<FieldComparison>>> {
    let comparisons = audit::comparisons_for_run(&state.db, run_id).await?;
    if comparisons.is_empty() {
        // Distinguish an unknown run from a failed run with no comparisons
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrichment_runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_one(&state.db)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        if exists == 0 {
            return Err(ApiError::NotFound(format!("run {}", run_id)));
        }
    }
    Ok(Json(comparisons))
}

/// GET /enrich/audit/daily/:date - stored rollups for a date (YYYY-MM-DD)
pub async fn daily(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Vec<SupplierQualityDaily>>> {
    let date = parse_date(&date)?;
    Ok(Json(audit::daily_rollups(&state.db, date).await?))
}

/// POST /enrich/audit/daily/:date/rollup - recompute the rollup for a date
///
/// Idempotent: repeated calls converge to the same stored rows.
pub async fn rollup(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Vec<SupplierQualityDaily>>> {
    let date = parse_date(&date)?;
    let rollups = audit::aggregate_daily(&state.db, date).await?;

    tracing::info!(date = %date, suppliers = rollups.len(), "Daily quality rollup recomputed");
    Ok(Json(rollups))
}

fn parse_date(s: &str) -> ApiResult<chrono::NaiveDate> {
    s.parse::<chrono::NaiveDate>()
        .map_err(|_| ApiError::BadRequest(format!("invalid date: {} (expected YYYY-MM-DD)", s)))
}
