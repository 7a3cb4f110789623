//! Canonical component record and its field vocabulary

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw part query: the input to one enrichment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartQuery {
    /// Manufacturer part number
    pub mpn: String,
    /// Manufacturer name, when the BOM supplied one
    pub manufacturer: Option<String>,
}

impl PartQuery {
    pub fn new(mpn: impl Into<String>) -> Self {
        Self {
            mpn: mpn.into(),
            manufacturer: None,
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }
}

/// The fixed set of canonical fields every run normalizes into
///
/// Every enrichment run emits exactly one FieldComparison per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Mpn,
    Manufacturer,
    Category,
    Description,
    DatasheetUrl,
    ImageUrl,
    Lifecycle,
    Compliance,
    Specifications,
    Pricing,
}

impl CanonicalField {
    /// All canonical fields, in audit-row order
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::Mpn,
        CanonicalField::Manufacturer,
        CanonicalField::Category,
        CanonicalField::Description,
        CanonicalField::DatasheetUrl,
        CanonicalField::ImageUrl,
        CanonicalField::Lifecycle,
        CanonicalField::Compliance,
        CanonicalField::Specifications,
        CanonicalField::Pricing,
    ];

    /// Fields that count toward the completeness axis of the quality score
    pub const REQUIRED: [CanonicalField; 6] = [
        CanonicalField::Mpn,
        CanonicalField::Manufacturer,
        CanonicalField::Category,
        CanonicalField::Description,
        CanonicalField::DatasheetUrl,
        CanonicalField::Lifecycle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Mpn => "mpn",
            CanonicalField::Manufacturer => "manufacturer",
            CanonicalField::Category => "category",
            CanonicalField::Description => "description",
            CanonicalField::DatasheetUrl => "datasheet_url",
            CanonicalField::ImageUrl => "image_url",
            CanonicalField::Lifecycle => "lifecycle",
            CanonicalField::Compliance => "compliance",
            CanonicalField::Specifications => "specifications",
            CanonicalField::Pricing => "pricing",
        }
    }

    /// Coarse grouping used for audit reporting
    pub fn category_name(&self) -> &'static str {
        match self {
            CanonicalField::Mpn | CanonicalField::Manufacturer => "identity",
            CanonicalField::Category | CanonicalField::Description => "descriptive",
            CanonicalField::DatasheetUrl | CanonicalField::ImageUrl => "documents",
            CanonicalField::Lifecycle => "lifecycle",
            CanonicalField::Compliance => "compliance",
            CanonicalField::Specifications => "technical",
            CanonicalField::Pricing => "commercial",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

/// Component lifecycle status, mapped from supplier vocabularies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Active,
    /// Not recommended for new designs
    Nrnd,
    Obsolete,
    /// Pre-release / engineering samples
    Preview,
    EndOfLife,
    #[default]
    Unknown,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Active => "active",
            Lifecycle::Nrnd => "nrnd",
            Lifecycle::Obsolete => "obsolete",
            Lifecycle::Preview => "preview",
            Lifecycle::EndOfLife => "endoflife",
            Lifecycle::Unknown => "unknown",
        }
    }
}

/// One quantity/price break from a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreak {
    pub quantity: u32,
    pub price: f64,
    pub supplier: String,
}

/// Typed specifications with an explicit extension bag
///
/// Known canonical spec keys are strongly typed; anything else a supplier
/// reports is preserved verbatim under `extensions` rather than scattered
/// through an untyped map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Specifications {
    pub package: Option<String>,
    pub tolerance: Option<String>,
    pub voltage_rating: Option<String>,
    pub temperature_range: Option<String>,
    pub mounting_type: Option<String>,
    /// Opaque supplier-specific attributes, key → raw value
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

impl Specifications {
    pub fn is_empty(&self) -> bool {
        self.package.is_none()
            && self.tolerance.is_none()
            && self.voltage_rating.is_none()
            && self.temperature_range.is_none()
            && self.mounting_type.is_none()
            && self.extensions.is_empty()
    }
}

/// Canonical component record: the production destination of an
/// enrichment run
///
/// Exactly one row per mpn; created or overwritten atomically when a run
/// scores at or above the production threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalComponent {
    pub mpn: String,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub datasheet_url: Option<String>,
    pub image_url: Option<String>,
    pub lifecycle: Lifecycle,
    pub rohs: Option<bool>,
    pub reach: Option<bool>,
    pub specifications: Specifications,
    pub pricing: Vec<PriceBreak>,
    /// 0-100
    pub quality_score: f64,
    /// Supplier whose answer produced this record
    pub enrichment_source: String,
    pub last_enriched_at: chrono::DateTime<chrono::Utc>,
}
