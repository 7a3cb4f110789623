//! ElectroMart API client (tier 2, secondary distributor)

use super::{status_to_error, RateLimiter, RawPayload, RawPriceBreak, SupplierAdapter, SupplierHit, TierError};
use crate::models::PartQuery;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.electromart.com/v1";
const USER_AGENT: &str = "bomcat/0.1.0 (enrichment engine)";
const RATE_LIMIT_MS: u64 = 500; // 2 requests per second

#[derive(Debug, Deserialize)]
struct EmPartResponse {
    part: Option<EmPart>,
    /// 0.0-1.0 match score reported by ElectroMart
    match_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EmPart {
    part_number: String,
    mfr: Option<String>,
    category_path: Option<String>,
    summary: Option<String>,
    datasheet: Option<String>,
    image: Option<String>,
    status: Option<String>,
    rohs: Option<String>,
    #[serde(default)]
    specs: Vec<EmSpec>,
    #[serde(default)]
    price_breaks: Vec<EmPriceBreak>,
}

#[derive(Debug, Deserialize)]
struct EmSpec {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct EmPriceBreak {
    qty: u32,
    price: f64,
}

/// ElectroMart API client
pub struct ElectroMartClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl ElectroMartClient {
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
impl SupplierAdapter for ElectroMartClient {
    fn name(&self) -> &str {
        "ElectroMart"
    }

    fn tier(&self) -> u8 {
        2
    }

    async fn fetch(&self, query: &PartQuery) -> Result<SupplierHit, TierError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/parts/{}", self.base_url, query.mpn);

        tracing::debug!(mpn = %query.mpn, url = %url, "Querying ElectroMart API");

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

        let parsed: EmPartResponse = response
            .json()
            .await
            .map_err(|e| TierError::Parse(e.to_string()))?;

        let part = parsed.part.ok_or(TierError::Miss)?;
        let confidence = parsed.match_score.unwrap_or(0.6) * 100.0;

        tracing::info!(
            mpn = %query.mpn,
            supplier = "ElectroMart",
            confidence = confidence,
            "Retrieved part from ElectroMart"
        );

        Ok(SupplierHit {
            payload: RawPayload {
                supplier: "ElectroMart".to_string(),
                tier: 2,
                mpn: Some(part.part_number),
                manufacturer: part.mfr,
                category: part.category_path,
                description: part.summary,
                datasheet_url: part.datasheet,
                image_url: part.image,
                lifecycle_code: part.status,
                rohs_code: part.rohs,
                reach_code: None,
                attributes: part.specs.into_iter().map(|s| (s.name, s.value)).collect(),
                pricing: part
                    .price_breaks
                    .into_iter()
                    .map(|p| RawPriceBreak {
                        quantity: p.qty,
                        unit_price: p.price,
                    })
                    .collect(),
                vendor_notes: None,
            },
            confidence,
        })
    }
}
