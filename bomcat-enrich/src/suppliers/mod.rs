//! Supplier adapter tier: uniform interface to N external part-data
//! sources, tried in fixed priority order
//!
//! Fallback policy: the chain calls tier 1 first; a definitive not-found,
//! timeout, or transport error advances to the next tier. The chain stops
//! at the first payload whose confidence clears the usability floor, which
//! keeps latency and cost bounded even when a later tier might score
//! higher.

mod digisupply;
mod electromart;
mod parthub;
mod sheetscrape;

pub use digisupply::DigiSupplyClient;
pub use electromart::ElectroMartClient;
pub use parthub::PartHubClient;
pub use sheetscrape::SheetScrapeClient;

use crate::models::PartQuery;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

/// Typed failures from a single tier fetch
///
/// `Miss` is definitive and never retried at that tier; the others are
/// retriable in principle but the fallback policy treats them the same
/// way: move on to the next tier.
#[derive(Debug, Error)]
pub enum TierError {
    #[error("Part not found")]
    Miss,

    #[error("Tier fetch timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One raw quantity/price break as a supplier reports it
#[derive(Debug, Clone, PartialEq)]
pub struct RawPriceBreak {
    pub quantity: u32,
    pub unit_price: f64,
}

/// Source-specific payload mapped into a supplier-agnostic shape
///
/// Values are raw: unit strings uncleaned, lifecycle codes unmapped,
/// vendor free-text untouched. The normalizer decides what survives.
#[derive(Debug, Clone, Default)]
pub struct RawPayload {
    pub supplier: String,
    pub tier: u8,
    pub mpn: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub datasheet_url: Option<String>,
    pub image_url: Option<String>,
    /// Supplier's lifecycle vocabulary, e.g. "ACTIVE", "NRND", "LAST TIME BUY"
    pub lifecycle_code: Option<String>,
    /// RoHS marking as reported, e.g. "Compliant", "yes", "RoHS3"
    pub rohs_code: Option<String>,
    pub reach_code: Option<String>,
    /// Raw attribute key/value pairs (supplier spec table)
    pub attributes: Vec<(String, String)>,
    pub pricing: Vec<RawPriceBreak>,
    /// Untrusted vendor marketing text; intentionally dropped downstream
    pub vendor_notes: Option<String>,
}

/// A usable answer from one tier
#[derive(Debug, Clone)]
pub struct SupplierHit {
    pub payload: RawPayload,
    /// Supplier-reported match confidence, 0-100
    pub confidence: f64,
}

/// Uniform interface implemented once per external data source
#[async_trait]
pub trait SupplierAdapter: Send + Sync {
    /// Human-readable source name, recorded in the audit trail
    fn name(&self) -> &str;

    /// Fixed priority position, 1 = most preferred
    fn tier(&self) -> u8;

    async fn fetch(&self, query: &PartQuery) -> Result<SupplierHit, TierError>;
}

/// Minimum-interval rate limiter shared by the HTTP adapters
pub(crate) struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub(crate) fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the rate limit
    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Record of one tier attempt within a run
#[derive(Debug, Clone)]
pub struct TierAttempt {
    pub tier: u8,
    pub supplier_name: String,
    /// None = typed failure; Some(c) = payload returned with confidence c
    pub confidence: Option<f64>,
    pub error: Option<String>,
}

/// Outcome of walking the tier chain for one query
#[derive(Debug)]
pub struct TierOutcome {
    /// First hit that cleared the usability floor, if any
    pub hit: Option<SupplierHit>,
    pub supplier_name: Option<String>,
    /// Highest tier attempted (1..N); equals the winning tier on success
    pub tier_reached: u8,
    pub attempts: Vec<TierAttempt>,
}

/// Ordered fallback chain over the configured adapters
pub struct TierChain {
    adapters: Vec<Arc<dyn SupplierAdapter>>,
    per_tier_timeout: Duration,
    usability_floor: f64,
}

impl TierChain {
    pub fn new(
        adapters: Vec<Arc<dyn SupplierAdapter>>,
        per_tier_timeout: Duration,
        usability_floor: f64,
    ) -> Self {
        debug_assert!(!adapters.is_empty());
        Self {
            adapters,
            per_tier_timeout,
            usability_floor,
        }
    }

    pub fn tier_count(&self) -> usize {
        self.adapters.len()
    }

    /// Try tiers 1..N in order, stopping at the first usable hit
    ///
    /// A tier timeout counts as that tier's failure; a below-floor payload
    /// is recorded but skipped. Returns `hit = None` when every tier fails
    /// or returns below-floor confidence.
    pub async fn resolve(&self, query: &PartQuery) -> TierOutcome {
        let mut attempts = Vec::with_capacity(self.adapters.len());
        let mut tier_reached = 0u8;

        for adapter in &self.adapters {
            tier_reached = adapter.tier();

            let result =
                tokio::time::timeout(self.per_tier_timeout, adapter.fetch(query)).await;

            match result {
                Ok(Ok(hit)) => {
                    if hit.confidence >= self.usability_floor {
                        tracing::debug!(
                            mpn = %query.mpn,
                            tier = adapter.tier(),
                            supplier = adapter.name(),
                            confidence = hit.confidence,
                            "Tier hit above usability floor"
                        );
                        attempts.push(TierAttempt {
                            tier: adapter.tier(),
                            supplier_name: adapter.name().to_string(),
                            confidence: Some(hit.confidence),
                            error: None,
                        });
                        return TierOutcome {
                            supplier_name: Some(adapter.name().to_string()),
                            hit: Some(hit),
                            tier_reached,
                            attempts,
                        };
                    }

                    tracing::debug!(
                        mpn = %query.mpn,
                        tier = adapter.tier(),
                        supplier = adapter.name(),
                        confidence = hit.confidence,
                        floor = self.usability_floor,
                        "Tier hit below usability floor, advancing"
                    );
                    attempts.push(TierAttempt {
                        tier: adapter.tier(),
                        supplier_name: adapter.name().to_string(),
                        confidence: Some(hit.confidence),
                        error: None,
                    });
                }
                Ok(Err(err)) => {
                    tracing::debug!(
                        mpn = %query.mpn,
                        tier = adapter.tier(),
                        supplier = adapter.name(),
                        error = %err,
                        "Tier failed, advancing"
                    );
                    attempts.push(TierAttempt {
                        tier: adapter.tier(),
                        supplier_name: adapter.name().to_string(),
                        confidence: None,
                        error: Some(err.to_string()),
                    });
                }
                Err(_) => {
                    tracing::debug!(
                        mpn = %query.mpn,
                        tier = adapter.tier(),
                        supplier = adapter.name(),
                        timeout_ms = self.per_tier_timeout.as_millis() as u64,
                        "Tier timed out, advancing"
                    );
                    attempts.push(TierAttempt {
                        tier: adapter.tier(),
                        supplier_name: adapter.name().to_string(),
                        confidence: None,
                        error: Some(TierError::Timeout.to_string()),
                    });
                }
            }
        }

        TierOutcome {
            hit: None,
            supplier_name: None,
            tier_reached,
            attempts,
        }
    }
}

/// Map an HTTP status code to a typed tier error
pub(crate) fn status_to_error(status: u16, body: String) -> TierError {
    match status {
        404 => TierError::Miss,
        429 | 503 => TierError::Transport(format!("Upstream throttling (HTTP {})", status)),
        _ => TierError::Api(status, body),
    }
}
