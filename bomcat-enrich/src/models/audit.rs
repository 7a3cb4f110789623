//! Audit-trail records: enrichment runs, field comparisons, and the
//! per-supplier daily rollup

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a field value changed during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Unit/format conversion applied
    Cleaned,
    /// Vocabulary mapping applied (e.g. lifecycle codes)
    Mapped,
    /// Derived from a non-obvious source field
    Extracted,
    /// Present and directly usable
    Unchanged,
    /// Absent upstream
    Missing,
    /// Intentionally dropped (e.g. untrusted vendor free-text)
    Removed,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Cleaned => "cleaned",
            ChangeType::Mapped => "mapped",
            ChangeType::Extracted => "extracted",
            ChangeType::Unchanged => "unchanged",
            ChangeType::Missing => "missing",
            ChangeType::Removed => "removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cleaned" => Some(ChangeType::Cleaned),
            "mapped" => Some(ChangeType::Mapped),
            "extracted" => Some(ChangeType::Extracted),
            "unchanged" => Some(ChangeType::Unchanged),
            "missing" => Some(ChangeType::Missing),
            "removed" => Some(ChangeType::Removed),
            _ => None,
        }
    }
}

/// Per-field assessment of the supplier's raw data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierDataQuality {
    Good,
    Incomplete,
    Invalid,
    Missing,
}

impl SupplierDataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierDataQuality::Good => "good",
            SupplierDataQuality::Incomplete => "incomplete",
            SupplierDataQuality::Invalid => "invalid",
            SupplierDataQuality::Missing => "missing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "good" => Some(SupplierDataQuality::Good),
            "incomplete" => Some(SupplierDataQuality::Incomplete),
            "invalid" => Some(SupplierDataQuality::Invalid),
            "missing" => Some(SupplierDataQuality::Missing),
            _ => None,
        }
    }
}

/// Destination a routed run landed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    Production,
    Review,
    None,
}

impl StorageLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageLocation::Production => "production",
            StorageLocation::Review => "review",
            StorageLocation::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "production" => Some(StorageLocation::Production),
            "review" => Some(StorageLocation::Review),
            "none" => Some(StorageLocation::None),
            _ => None,
        }
    }
}

/// One field-level comparison row, created once per canonical field per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldComparison {
    pub run_id: Uuid,
    pub field_name: String,
    pub field_category: String,
    pub supplier_value: Option<String>,
    pub normalized_value: Option<String>,
    pub changed: bool,
    pub change_type: ChangeType,
    pub change_reason: Option<String>,
    /// 0-100
    pub confidence: f64,
    pub supplier_data_quality: SupplierDataQuality,
}

/// One enrichment attempt for a single line item, spanning all tiers tried
///
/// Created at attempt start, finalized exactly once at attempt end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentRun {
    pub id: Uuid,
    pub job_id: Uuid,
    pub line_id: Uuid,
    pub mpn: String,
    pub manufacturer: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub successful: bool,
    pub quality_score: f64,
    pub storage_location: StorageLocation,
    pub supplier_name: Option<String>,
    /// Confidence the winning supplier reported for the part match (0-100)
    pub supplier_match_confidence: Option<f64>,
    pub processing_time_ms: u64,
    pub error_message: Option<String>,
    /// Highest tier attempted during this run (1..N)
    pub tier_reached: u8,
    pub needs_review: bool,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl EnrichmentRun {
    /// Open a run at attempt start; finalized by the router/orchestrator
    pub fn begin(job_id: Uuid, line_id: Uuid, query: &crate::models::PartQuery) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            line_id,
            mpn: query.mpn.clone(),
            manufacturer: query.manufacturer.clone(),
            timestamp: chrono::Utc::now(),
            successful: false,
            quality_score: 0.0,
            storage_location: StorageLocation::None,
            supplier_name: None,
            supplier_match_confidence: None,
            processing_time_ms: 0,
            error_message: None,
            tier_reached: 0,
            needs_review: false,
            reviewed_by: None,
            reviewed_at: None,
        }
    }
}

/// Daily per-supplier quality rollup, upserted by (date, supplier_name)
///
/// Recomputed idempotently from committed runs and comparisons; never
/// hand-edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierQualityDaily {
    pub date: chrono::NaiveDate,
    pub supplier_name: String,
    pub total_runs: i64,
    pub successful_runs: i64,
    pub failed_runs: i64,
    pub avg_quality_score: f64,
    pub avg_match_confidence: f64,
    pub avg_processing_time_ms: f64,
    /// Comparisons with supplier_data_quality = invalid
    pub invalid_field_count: i64,
    /// Comparisons with supplier_data_quality = missing
    pub missing_field_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartQuery;

    #[test]
    fn test_change_type_round_trip() {
        for ct in [
            ChangeType::Cleaned,
            ChangeType::Mapped,
            ChangeType::Extracted,
            ChangeType::Unchanged,
            ChangeType::Missing,
            ChangeType::Removed,
        ] {
            assert_eq!(ChangeType::parse(ct.as_str()), Some(ct));
        }
        assert_eq!(ChangeType::parse("bogus"), None);
    }

    #[test]
    fn test_storage_location_round_trip() {
        for loc in [
            StorageLocation::Production,
            StorageLocation::Review,
            StorageLocation::None,
        ] {
            assert_eq!(StorageLocation::parse(loc.as_str()), Some(loc));
        }
    }

    #[test]
    fn test_run_begin_defaults() {
        let query = PartQuery::new("LM358DR").with_manufacturer("Texas Instruments");
        let run = EnrichmentRun::begin(Uuid::new_v4(), Uuid::new_v4(), &query);
        assert!(!run.successful);
        assert_eq!(run.storage_location, StorageLocation::None);
        assert_eq!(run.tier_reached, 0);
        assert_eq!(run.mpn, "LM358DR");
        assert_eq!(run.manufacturer.as_deref(), Some("Texas Instruments"));
    }
}
