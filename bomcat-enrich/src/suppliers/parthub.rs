//! PartHub API client (tier 3, data aggregator)
//!
//! PartHub indexes many distributors, so its answers are broader but less
//! trustworthy than a first-party distributor's; the chain only reaches it
//! after tiers 1 and 2 fail.

use super::{status_to_error, RateLimiter, RawPayload, RawPriceBreak, SupplierAdapter, SupplierHit, TierError};
use crate::models::PartQuery;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.parthub.io/v2";
const USER_AGENT: &str = "bomcat/0.1.0 (enrichment engine)";
const RATE_LIMIT_MS: u64 = 1000; // free-tier quota: 1 request per second

#[derive(Debug, Deserialize)]
struct PhSearchResponse {
    #[serde(default)]
    results: Vec<PhResult>,
}

#[derive(Debug, Deserialize)]
struct PhResult {
    mpn: String,
    brand: Option<String>,
    taxonomy: Option<String>,
    short_description: Option<String>,
    datasheet_url: Option<String>,
    image_url: Option<String>,
    lifecycle: Option<String>,
    rohs: Option<String>,
    reach: Option<String>,
    /// 0-100 relevance score from the aggregator's search index
    relevance: Option<f64>,
    #[serde(default)]
    specs: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    offers: Vec<PhOffer>,
}

#[derive(Debug, Deserialize)]
struct PhOffer {
    moq: u32,
    unit_price: f64,
}

/// PartHub aggregator client
pub struct PartHubClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl PartHubClient {
    pub fn new() -> Result<Self, TierError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, TierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TierError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SupplierAdapter for PartHubClient {
    fn name(&self) -> &str {
        "PartHub"
    }

    fn tier(&self) -> u8 {
        3
    }

    async fn fetch(&self, query: &PartQuery) -> Result<SupplierHit, TierError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/search?q={}", self.base_url, query.mpn);

        tracing::debug!(mpn = %query.mpn, url = %url, "Querying PartHub API");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TierError::Timeout
                } else {
                    TierError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), body));
        }

        let search: PhSearchResponse = response
            .json()
            .await
            .map_err(|e| TierError::Parse(e.to_string()))?;

        // Prefer the result whose mpn matches exactly; fall back to the
        // top-relevance hit.
        let result = search
            .results
            .into_iter()
            .max_by(|a, b| {
                let a_exact = a.mpn.eq_ignore_ascii_case(&query.mpn);
                let b_exact = b.mpn.eq_ignore_ascii_case(&query.mpn);
                a_exact.cmp(&b_exact).then(
                    a.relevance
                        .unwrap_or(0.0)
                        .total_cmp(&b.relevance.unwrap_or(0.0)),
                )
            })
            .ok_or(TierError::Miss)?;

        let exact = result.mpn.eq_ignore_ascii_case(&query.mpn);
        let confidence = if exact {
            result.relevance.unwrap_or(75.0)
        } else {
            result.relevance.unwrap_or(40.0).min(60.0)
        };

        tracing::info!(
            mpn = %query.mpn,
            supplier = "PartHub",
            confidence = confidence,
            exact = exact,
            "Retrieved part from PartHub"
        );

        Ok(SupplierHit {
            payload: RawPayload {
                supplier: "PartHub".to_string(),
                tier: 3,
                mpn: Some(result.mpn),
                manufacturer: result.brand,
                category: result.taxonomy,
                description: result.short_description,
                datasheet_url: result.datasheet_url,
                image_url: result.image_url,
                lifecycle_code: result.lifecycle,
                rohs_code: result.rohs,
                reach_code: result.reach,
                attributes: result.specs.into_iter().collect(),
                pricing: result
                    .offers
                    .into_iter()
                    .map(|o| RawPriceBreak {
                        quantity: o.moq,
                        unit_price: o.unit_price,
                    })
                    .collect(),
                vendor_notes: None,
            },
            confidence,
        })
    }
}
