//! Review queue operations
//!
//! Mid-band candidates wait here with status `needs_review` until a human
//! accepts or rejects them. Re-running a job replaces the pending entry
//! for the same line item instead of stacking duplicates.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::CanonicalComponent;
use bomcat_common::{Error, Result};

/// A review queue entry as stored
#[derive(Debug, Clone)]
pub struct ReviewEntry {
    pub id: Uuid,
    pub run_id: Uuid,
    pub job_id: Uuid,
    pub line_id: Uuid,
    pub mpn: String,
    pub quality_score: f64,
    pub candidate: CanonicalComponent,
    pub status: String,
}

/// Queue a candidate record for human review
pub async fn enqueue_for_review(
    pool: &SqlitePool,
    run_id: Uuid,
    job_id: Uuid,
    line_id: Uuid,
    candidate: &CanonicalComponent,
) -> Result<()> {
    let candidate_json = serde_json::to_string(candidate)
        .map_err(|e| Error::Internal(format!("Failed to serialize candidate: {}", e)))?;
    let created_at = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO review_queue (
            id, run_id, job_id, line_id, mpn, manufacturer,
            quality_score, candidate, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'needs_review', ?)
        ON CONFLICT(line_id) DO UPDATE SET
            run_id = excluded.run_id,
            job_id = excluded.job_id,
            mpn = excluded.mpn,
            manufacturer = excluded.manufacturer,
            quality_score = excluded.quality_score,
            candidate = excluded.candidate,
            status = 'needs_review',
            created_at = excluded.created_at,
            reviewed_by = NULL,
            reviewed_at = NULL
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(run_id.to_string())
    .bind(job_id.to_string())
    .bind(line_id.to_string())
    .bind(&candidate.mpn)
    .bind(&candidate.manufacturer)
    .bind(candidate.quality_score)
    .bind(&candidate_json)
    .bind(&created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// List entries still awaiting review
pub async fn pending_reviews(pool: &SqlitePool) -> Result<Vec<ReviewEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, run_id, job_id, line_id, mpn, quality_score, candidate, status
        FROM review_queue
        WHERE status = 'needs_review'
        ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let candidate: String = row.get("candidate");
            let candidate: CanonicalComponent = serde_json::from_str(&candidate)
                .map_err(|e| Error::Internal(format!("Failed to deserialize candidate: {}", e)))?;

            Ok(ReviewEntry {
                id: parse_uuid(row.get("id"))?,
                run_id: parse_uuid(row.get("run_id"))?,
                job_id: parse_uuid(row.get("job_id"))?,
                line_id: parse_uuid(row.get("line_id"))?,
                mpn: row.get("mpn"),
                quality_score: row.get("quality_score"),
                candidate,
                status: row.get("status"),
            })
        })
        .collect()
}

/// Resolve a review: accept promotes the candidate to the catalog,
/// reject just closes the entry. Both stamp reviewer identity.
pub async fn resolve_review(
    pool: &SqlitePool,
    entry_id: Uuid,
    accepted: bool,
    reviewed_by: &str,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        "SELECT candidate FROM review_queue WHERE id = ? AND status = 'needs_review'",
    )
    .bind(entry_id.to_string())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        return Err(Error::NotFound(format!("review entry {}", entry_id)));
    };

    if accepted {
        let candidate: String = row.get("candidate");
        let candidate: CanonicalComponent = serde_json::from_str(&candidate)
            .map_err(|e| Error::Internal(format!("Failed to deserialize candidate: {}", e)))?;
        // Same upsert shape as the production path
        super::catalog::upsert_component_tx(&mut tx, &candidate).await?;
    }

    let status = if accepted { "accepted" } else { "rejected" };
    sqlx::query(
        r#"
        UPDATE review_queue
        SET status = ?, reviewed_by = ?, reviewed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(reviewed_by)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(entry_id.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

fn parse_uuid(s: String) -> Result<Uuid> {
    Uuid::parse_str(&s).map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{catalog, init_memory_pool};
    use crate::models::{Lifecycle, Specifications};

    fn candidate(mpn: &str, score: f64) -> CanonicalComponent {
        CanonicalComponent {
            mpn: mpn.to_string(),
            manufacturer: Some("TI".to_string()),
            category: Some("Amplifiers".to_string()),
            description: None,
            datasheet_url: None,
            image_url: None,
            lifecycle: Lifecycle::Active,
            rohs: None,
            reach: None,
            specifications: Specifications::default(),
            pricing: Vec::new(),
            quality_score: score,
            enrichment_source: "PartHub".to_string(),
            last_enriched_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_list() {
        let pool = init_memory_pool().await.unwrap();
        let line_id = Uuid::new_v4();

        enqueue_for_review(&pool, Uuid::new_v4(), Uuid::new_v4(), line_id, &candidate("LM358DR", 82.0))
            .await
            .unwrap();

        let pending = pending_reviews(&pool).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].line_id, line_id);
        assert_eq!(pending[0].status, "needs_review");
    }

    #[tokio::test]
    async fn test_requeue_replaces_pending_entry() {
        let pool = init_memory_pool().await.unwrap();
        let line_id = Uuid::new_v4();

        enqueue_for_review(&pool, Uuid::new_v4(), Uuid::new_v4(), line_id, &candidate("LM358DR", 75.0))
            .await
            .unwrap();
        enqueue_for_review(&pool, Uuid::new_v4(), Uuid::new_v4(), line_id, &candidate("LM358DR", 88.0))
            .await
            .unwrap();

        let pending = pending_reviews(&pool).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].quality_score, 88.0);
    }

    #[tokio::test]
    async fn test_accept_promotes_to_catalog() {
        let pool = init_memory_pool().await.unwrap();

        enqueue_for_review(
            &pool,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            &candidate("LM358DR", 82.0),
        )
        .await
        .unwrap();

        let entry = &pending_reviews(&pool).await.unwrap()[0];
        resolve_review(&pool, entry.id, true, "reviewer@example.com")
            .await
            .unwrap();

        let component = catalog::get_component(&pool, "LM358DR").await.unwrap();
        assert!(component.is_some());
        assert!(pending_reviews(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reject_leaves_catalog_untouched() {
        let pool = init_memory_pool().await.unwrap();

        enqueue_for_review(
            &pool,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            &candidate("LM358DR", 71.0),
        )
        .await
        .unwrap();

        let entry = &pending_reviews(&pool).await.unwrap()[0];
        resolve_review(&pool, entry.id, false, "reviewer@example.com")
            .await
            .unwrap();

        assert!(catalog::get_component(&pool, "LM358DR").await.unwrap().is_none());
        assert!(pending_reviews(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_missing_entry_is_not_found() {
        let pool = init_memory_pool().await.unwrap();
        let err = resolve_review(&pool, Uuid::new_v4(), true, "reviewer@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
