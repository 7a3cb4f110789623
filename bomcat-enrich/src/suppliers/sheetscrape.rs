//! SheetScrape client (tier 4, last-resort datasheet index scrape)
//!
//! Scrapes a public datasheet index. Answers carry low confidence by
//! construction: only identity and documentation fields, no pricing or
//! lifecycle, and the match is heuristic.

use super::{status_to_error, RateLimiter, RawPayload, SupplierAdapter, SupplierHit, TierError};
use crate::models::PartQuery;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://sheetscrape.dev/api";
const USER_AGENT: &str = "bomcat/0.1.0 (enrichment engine)";
const RATE_LIMIT_MS: u64 = 2000; // be polite to the scrape target

/// Base confidence for a scrape hit; never enough to reach production
/// routing on its own without strong field completeness
const SCRAPE_CONFIDENCE: f64 = 55.0;

#[derive(Debug, Deserialize)]
struct ScrapeHit {
    part: String,
    maker: Option<String>,
    title: Option<String>,
    pdf_url: Option<String>,
}

/// Datasheet index scrape client
pub struct SheetScrapeClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl SheetScrapeClient {
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
impl SupplierAdapter for SheetScrapeClient {
    fn name(&self) -> &str {
        "SheetScrape"
    }

    fn tier(&self) -> u8 {
        4
    }

    async fn fetch(&self, query: &PartQuery) -> Result<SupplierHit, TierError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/lookup?pn={}", self.base_url, query.mpn);

        tracing::debug!(mpn = %query.mpn, url = %url, "Querying SheetScrape index");

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

        let hits: Vec<ScrapeHit> = response
            .json()
            .await
            .map_err(|e| TierError::Parse(e.to_string()))?;

        let hit = hits
            .into_iter()
            .find(|h| h.part.eq_ignore_ascii_case(&query.mpn))
            .ok_or(TierError::Miss)?;

        tracing::info!(
            mpn = %query.mpn,
            supplier = "SheetScrape",
            "Retrieved datasheet hit from scrape index"
        );

        Ok(SupplierHit {
            payload: RawPayload {
                supplier: "SheetScrape".to_string(),
                tier: 4,
                mpn: Some(hit.part),
                manufacturer: hit.maker,
                category: None,
                description: hit.title,
                datasheet_url: hit.pdf_url,
                image_url: None,
                lifecycle_code: None,
                rohs_code: None,
                reach_code: None,
                attributes: Vec::new(),
                pricing: Vec::new(),
                vendor_notes: None,
            },
            confidence: SCRAPE_CONFIDENCE,
        })
    }
}
