//! Audit trail persistence
//!
//! A run and its field comparisons commit in one transaction: either the
//! whole audit record exists or none of it does. The daily rollup is a
//! pure recompute from committed rows, so re-running it for the same date
//! always converges to the same values.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    ChangeType, EnrichmentRun, FieldComparison, StorageLocation, SupplierDataQuality,
    SupplierQualityDaily,
};
use bomcat_common::{Error, Result};

/// Persist a finalized run together with all of its field comparisons
pub async fn record_run(
    pool: &SqlitePool,
    run: &EnrichmentRun,
    comparisons: &[FieldComparison],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO enrichment_runs (
            id, job_id, line_id, mpn, manufacturer, timestamp,
            successful, quality_score, storage_location,
            supplier_name, supplier_match_confidence,
            processing_time_ms, error_message, tier_reached,
            needs_review, reviewed_by, reviewed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(run.id.to_string())
    .bind(run.job_id.to_string())
    .bind(run.line_id.to_string())
    .bind(&run.mpn)
    .bind(&run.manufacturer)
    .bind(run.timestamp.to_rfc3339())
    .bind(run.successful)
    .bind(run.quality_score)
    .bind(run.storage_location.as_str())
    .bind(&run.supplier_name)
    .bind(run.supplier_match_confidence)
    .bind(run.processing_time_ms as i64)
    .bind(&run.error_message)
    .bind(i64::from(run.tier_reached))
    .bind(run.needs_review)
    .bind(&run.reviewed_by)
    .bind(run.reviewed_at.map(|dt| dt.to_rfc3339()))
    .execute(&mut *tx)
    .await?;

    for comparison in comparisons {
        sqlx::query(
            r#"
            INSERT INTO field_comparisons (
                run_id, field_name, field_category,
                supplier_value, normalized_value, changed,
                change_type, change_reason, confidence,
                supplier_data_quality
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comparison.run_id.to_string())
        .bind(&comparison.field_name)
        .bind(&comparison.field_category)
        .bind(&comparison.supplier_value)
        .bind(&comparison.normalized_value)
        .bind(comparison.changed)
        .bind(comparison.change_type.as_str())
        .bind(&comparison.change_reason)
        .bind(comparison.confidence)
        .bind(comparison.supplier_data_quality.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load all runs recorded for a job, oldest first
pub async fn runs_for_job(pool: &SqlitePool, job_id: Uuid) -> Result<Vec<EnrichmentRun>> {
    let rows = sqlx::query(
        r#"
        SELECT id, job_id, line_id, mpn, manufacturer, timestamp,
               successful, quality_score, storage_location,
               supplier_name, supplier_match_confidence,
               processing_time_ms, error_message, tier_reached,
               needs_review, reviewed_by, reviewed_at
        FROM enrichment_runs
        WHERE job_id = ?
        ORDER BY timestamp
        "#,
    )
    .bind(job_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(run_from_row).collect()
}

/// Load the comparison rows for one run, in audit-row order
pub async fn comparisons_for_run(pool: &SqlitePool, run_id: Uuid) -> Result<Vec<FieldComparison>> {
    let rows = sqlx::query(
        r#"
        SELECT run_id, field_name, field_category,
               supplier_value, normalized_value, changed,
               change_type, change_reason, confidence,
               supplier_data_quality
        FROM field_comparisons
        WHERE run_id = ?
        ORDER BY id
        "#,
    )
    .bind(run_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let change_type: String = row.get("change_type");
            let change_type = ChangeType::parse(&change_type)
                .ok_or_else(|| Error::Internal(format!("Unknown change_type: {}", change_type)))?;

            let quality: String = row.get("supplier_data_quality");
            let quality = SupplierDataQuality::parse(&quality).ok_or_else(|| {
                Error::Internal(format!("Unknown supplier_data_quality: {}", quality))
            })?;

            Ok(FieldComparison {
                run_id: parse_uuid(row.get("run_id"))?,
                field_name: row.get("field_name"),
                field_category: row.get("field_category"),
                supplier_value: row.get("supplier_value"),
                normalized_value: row.get("normalized_value"),
                changed: row.get("changed"),
                change_type,
                change_reason: row.get("change_reason"),
                confidence: row.get("confidence"),
                supplier_data_quality: quality,
            })
        })
        .collect()
}

/// Recompute and upsert the per-supplier rollup for one UTC date
///
/// Aggregates only runs that named a supplier; runs where every tier
/// missed have no supplier to attribute.
pub async fn aggregate_daily(
    pool: &SqlitePool,
    date: chrono::NaiveDate,
) -> Result<Vec<SupplierQualityDaily>> {
    let day_start = format!("{}T00:00:00", date);
    let day_end = format!("{}T00:00:00", date + chrono::Days::new(1));

    let rows = sqlx::query(
        r#"
        SELECT r.supplier_name,
               COUNT(*) AS total_runs,
               SUM(r.successful) AS successful_runs,
               COUNT(*) - SUM(r.successful) AS failed_runs,
               AVG(r.quality_score) AS avg_quality_score,
               AVG(COALESCE(r.supplier_match_confidence, 0.0)) AS avg_match_confidence,
               AVG(r.processing_time_ms) AS avg_processing_time_ms,
               (SELECT COUNT(*) FROM field_comparisons c
                JOIN enrichment_runs r2 ON r2.id = c.run_id
                WHERE r2.supplier_name = r.supplier_name
                  AND r2.timestamp >= ? AND r2.timestamp < ?
                  AND c.supplier_data_quality = 'invalid') AS invalid_field_count,
               (SELECT COUNT(*) FROM field_comparisons c
                JOIN enrichment_runs r2 ON r2.id = c.run_id
                WHERE r2.supplier_name = r.supplier_name
                  AND r2.timestamp >= ? AND r2.timestamp < ?
                  AND c.supplier_data_quality = 'missing') AS missing_field_count
        FROM enrichment_runs r
        WHERE r.supplier_name IS NOT NULL
          AND r.timestamp >= ? AND r.timestamp < ?
        GROUP BY r.supplier_name
        "#,
    )
    .bind(&day_start)
    .bind(&day_end)
    .bind(&day_start)
    .bind(&day_end)
    .bind(&day_start)
    .bind(&day_end)
    .fetch_all(pool)
    .await?;

    let mut rollups = Vec::with_capacity(rows.len());
    for row in rows {
        let rollup = SupplierQualityDaily {
            date,
            supplier_name: row.get("supplier_name"),
            total_runs: row.get("total_runs"),
            successful_runs: row.get("successful_runs"),
            failed_runs: row.get("failed_runs"),
            avg_quality_score: row.get("avg_quality_score"),
            avg_match_confidence: row.get("avg_match_confidence"),
            avg_processing_time_ms: row.get("avg_processing_time_ms"),
            invalid_field_count: row.get("invalid_field_count"),
            missing_field_count: row.get("missing_field_count"),
        };

        sqlx::query(
            r#"
            INSERT INTO supplier_quality_daily (
                date, supplier_name, total_runs, successful_runs, failed_runs,
                avg_quality_score, avg_match_confidence, avg_processing_time_ms,
                invalid_field_count, missing_field_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(date, supplier_name) DO UPDATE SET
                total_runs = excluded.total_runs,
                successful_runs = excluded.successful_runs,
                failed_runs = excluded.failed_runs,
                avg_quality_score = excluded.avg_quality_score,
                avg_match_confidence = excluded.avg_match_confidence,
                avg_processing_time_ms = excluded.avg_processing_time_ms,
                invalid_field_count = excluded.invalid_field_count,
                missing_field_count = excluded.missing_field_count
            "#,
        )
        .bind(date.to_string())
        .bind(&rollup.supplier_name)
        .bind(rollup.total_runs)
        .bind(rollup.successful_runs)
        .bind(rollup.failed_runs)
        .bind(rollup.avg_quality_score)
        .bind(rollup.avg_match_confidence)
        .bind(rollup.avg_processing_time_ms)
        .bind(rollup.invalid_field_count)
        .bind(rollup.missing_field_count)
        .execute(pool)
        .await?;

        rollups.push(rollup);
    }

    Ok(rollups)
}

/// Load the stored rollup rows for one date
pub async fn daily_rollups(
    pool: &SqlitePool,
    date: chrono::NaiveDate,
) -> Result<Vec<SupplierQualityDaily>> {
    let rows = sqlx::query(
        r#"
        SELECT supplier_name, total_runs, successful_runs, failed_runs,
               avg_quality_score, avg_match_confidence, avg_processing_time_ms,
               invalid_field_count, missing_field_count
        FROM supplier_quality_daily
        WHERE date = ?
        ORDER BY supplier_name
        "#,
    )
    .bind(date.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| SupplierQualityDaily {
            date,
            supplier_name: row.get("supplier_name"),
            total_runs: row.get("total_runs"),
            successful_runs: row.get("successful_runs"),
            failed_runs: row.get("failed_runs"),
            avg_quality_score: row.get("avg_quality_score"),
            avg_match_confidence: row.get("avg_match_confidence"),
            avg_processing_time_ms: row.get("avg_processing_time_ms"),
            invalid_field_count: row.get("invalid_field_count"),
            missing_field_count: row.get("missing_field_count"),
        })
        .collect())
}

fn run_from_row(row: sqlx::sqlite::SqliteRow) -> Result<EnrichmentRun> {
    let timestamp: String = row.get("timestamp");
    let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))?
        .with_timezone(&chrono::Utc);

    let storage_location: String = row.get("storage_location");
    let storage_location = StorageLocation::parse(&storage_location).ok_or_else(|| {
        Error::Internal(format!("Unknown storage_location: {}", storage_location))
    })?;

    let reviewed_at: Option<String> = row.get("reviewed_at");
    let reviewed_at = reviewed_at
        .map(|s| {
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| Error::Internal(format!("Failed to parse reviewed_at: {}", e)))
        })
        .transpose()?;

    let processing_time_ms: i64 = row.get("processing_time_ms");
    let tier_reached: i64 = row.get("tier_reached");

    Ok(EnrichmentRun {
        id: parse_uuid(row.get("id"))?,
        job_id: parse_uuid(row.get("job_id"))?,
        line_id: parse_uuid(row.get("line_id"))?,
        mpn: row.get("mpn"),
        manufacturer: row.get("manufacturer"),
        timestamp,
        successful: row.get("successful"),
        quality_score: row.get("quality_score"),
        storage_location,
        supplier_name: row.get("supplier_name"),
        supplier_match_confidence: row.get("supplier_match_confidence"),
        processing_time_ms: processing_time_ms as u64,
        error_message: row.get("error_message"),
        tier_reached: tier_reached as u8,
        needs_review: row.get("needs_review"),
        reviewed_by: row.get("reviewed_by"),
        reviewed_at,
    })
}

fn parse_uuid(s: String) -> Result<Uuid> {
    Uuid::parse_str(&s).map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))
}
