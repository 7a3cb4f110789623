//! Storage routing for scored enrichment results
//!
//! Three bands: production at or above the production threshold, human
//! review in the middle band, rejection below the review threshold. The
//! audit record always commits before any storage write, so a crash
//! between the two leaves an auditable run with no routed data rather
//! than routed data with no audit trail.

use sqlx::SqlitePool;

use crate::db;
use crate::models::{
    CanonicalComponent, EnrichmentRun, FieldComparison, StorageLocation,
};
use crate::normalize::CanonicalFields;
use crate::scoring::QualityBreakdown;
use bomcat_common::Result;

/// Routing thresholds on the 0-100 quality scale
#[derive(Debug, Clone, Copy)]
pub struct RouterThresholds {
    pub production: f64,
    pub review: f64,
}

impl Default for RouterThresholds {
    fn default() -> Self {
        Self {
            production: 95.0,
            review: 70.0,
        }
    }
}

/// Where a scored result was routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Production,
    Review,
    Rejected,
}

impl RouteDecision {
    pub fn storage_location(&self) -> StorageLocation {
        match self {
            RouteDecision::Production => StorageLocation::Production,
            RouteDecision::Review => StorageLocation::Review,
            RouteDecision::Rejected => StorageLocation::None,
        }
    }
}

/// Routes scored results to the catalog, the review queue, or nowhere
#[derive(Debug, Clone, Copy, Default)]
pub struct Router {
    thresholds: RouterThresholds,
}

impl Router {
    pub fn new(thresholds: RouterThresholds) -> Self {
        Self { thresholds }
    }

    /// Band selection alone, without side effects
    pub fn decide(&self, score: f64) -> RouteDecision {
        if score >= self.thresholds.production {
            RouteDecision::Production
        } else if score >= self.thresholds.review {
            RouteDecision::Review
        } else {
            RouteDecision::Rejected
        }
    }

    /// Finalize and commit one successful enrichment result
    ///
    /// Writes the audit run + comparisons first, then performs the
    /// storage write the band calls for.
    pub async fn commit(
        &self,
        pool: &SqlitePool,
        mut run: EnrichmentRun,
        comparisons: &[FieldComparison],
        fields: CanonicalFields,
        breakdown: QualityBreakdown,
        supplier_name: &str,
    ) -> Result<RouteDecision> {
        let decision = self.decide(breakdown.score);

        run.successful = true;
        run.quality_score = breakdown.score;
        run.storage_location = decision.storage_location();
        run.supplier_name = Some(supplier_name.to_string());
        run.supplier_match_confidence = Some(breakdown.match_confidence);
        run.tier_reached = breakdown.tier_reached;
        run.needs_review = decision == RouteDecision::Review;

        db::audit::record_run(pool, &run, comparisons).await?;

        let component = Self::component_from(&run, fields, breakdown, supplier_name);

        match decision {
            RouteDecision::Production => {
                db::catalog::upsert_component(pool, &component).await?;
                tracing::info!(
                    job_id = %run.job_id,
                    mpn = %run.mpn,
                    score = breakdown.score,
                    "Routed to production catalog"
                );
            }
            RouteDecision::Review => {
                db::queue::enqueue_for_review(pool, run.id, run.job_id, run.line_id, &component)
                    .await?;
                tracing::info!(
                    job_id = %run.job_id,
                    mpn = %run.mpn,
                    score = breakdown.score,
                    "Queued for human review"
                );
            }
            RouteDecision::Rejected => {
                tracing::warn!(
                    job_id = %run.job_id,
                    mpn = %run.mpn,
                    score = breakdown.score,
                    "Result rejected, audit record only"
                );
            }
        }

        Ok(decision)
    }

    /// Commit a run where no tier produced a usable answer
    ///
    /// Audit-only: nothing is routed anywhere.
    pub async fn commit_failure(
        &self,
        pool: &SqlitePool,
        mut run: EnrichmentRun,
        tier_reached: u8,
        error_message: String,
    ) -> Result<()> {
        run.successful = false;
        run.quality_score = 0.0;
        run.storage_location = StorageLocation::None;
        run.tier_reached = tier_reached;
        run.error_message = Some(error_message);

        db::audit::record_run(pool, &run, &[]).await?;

        tracing::warn!(
            job_id = %run.job_id,
            mpn = %run.mpn,
            tier_reached = tier_reached,
            "Enrichment failed, audit record only"
        );
        Ok(())
    }

    fn component_from(
        run: &EnrichmentRun,
        fields: CanonicalFields,
        breakdown: QualityBreakdown,
        supplier_name: &str,
    ) -> CanonicalComponent {
        CanonicalComponent {
            // Fall back to the query mpn if the supplier omitted one
            mpn: fields.mpn.unwrap_or_else(|| run.mpn.clone()),
            manufacturer: fields.manufacturer,
            category: fields.category,
            description: fields.description,
            datasheet_url: fields.datasheet_url,
            image_url: fields.image_url,
            lifecycle: fields.lifecycle,
            rohs: fields.rohs,
            reach: fields.reach,
            specifications: fields.specifications,
            pricing: fields.pricing,
            quality_score: breakdown.score,
            enrichment_source: supplier_name.to_string(),
            last_enriched_at: chrono::Utc::now(),
        }
    }
}
