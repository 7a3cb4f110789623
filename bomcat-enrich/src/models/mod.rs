//! Domain models for the enrichment engine

mod audit;
mod component;

pub use audit::{
    ChangeType, EnrichmentRun, FieldComparison, StorageLocation, SupplierDataQuality,
    SupplierQualityDaily,
};
pub use component::{
    CanonicalComponent, CanonicalField, Lifecycle, PartQuery, PriceBreak, Specifications,
};

// Job progress is shared with the hub/SSE layer and lives in bomcat-common
pub use bomcat_common::events::{JobProgress, JobStatus};
