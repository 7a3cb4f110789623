//! DigiSupply API client (tier 1, primary distributor)

use super::{status_to_error, RateLimiter, RawPayload, RawPriceBreak, SupplierAdapter, SupplierHit, TierError};
use crate::models::PartQuery;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.digisupply.com/v4";
const USER_AGENT: &str = "bomcat/0.1.0 (enrichment engine)";
const RATE_LIMIT_MS: u64 = 200; // 5 requests per second

/// DigiSupply product search response
#[derive(Debug, Deserialize)]
struct DsSearchResponse {
    #[serde(rename = "Products")]
    products: Vec<DsProduct>,
    #[serde(rename = "ExactMatch")]
    exact_match: bool,
}

#[derive(Debug, Deserialize)]
struct DsProduct {
    #[serde(rename = "ManufacturerPartNumber")]
    mpn: String,
    #[serde(rename = "Manufacturer")]
    manufacturer: Option<String>,
    #[serde(rename = "Category")]
    category: Option<String>,
    #[serde(rename = "ProductDescription")]
    description: Option<String>,
    #[serde(rename = "DatasheetUrl")]
    datasheet_url: Option<String>,
    #[serde(rename = "PhotoUrl")]
    photo_url: Option<String>,
    #[serde(rename = "LifecycleStatus")]
    lifecycle_status: Option<String>,
    #[serde(rename = "RohsStatus")]
    rohs_status: Option<String>,
    #[serde(rename = "ReachStatus")]
    reach_status: Option<String>,
    #[serde(rename = "Parameters", default)]
    parameters: Vec<DsParameter>,
    #[serde(rename = "StandardPricing", default)]
    standard_pricing: Vec<DsPriceBreak>,
    #[serde(rename = "MarketingInfo")]
    marketing_info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DsParameter {
    #[serde(rename = "Parameter")]
    parameter: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct DsPriceBreak {
    #[serde(rename = "BreakQuantity")]
    break_quantity: u32,
    #[serde(rename = "UnitPrice")]
    unit_price: f64,
}

/// DigiSupply API client with rate limiting
pub struct DigiSupplyClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl DigiSupplyClient {
    pub fn new() -> Result<Self, TierError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Override the base URL (integration tests point this at a stub)
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

    fn to_payload(&self, product: DsProduct) -> RawPayload {
        RawPayload {
            supplier: "DigiSupply".to_string(),
            tier: 1,
            mpn: Some(product.mpn),
            manufacturer: product.manufacturer,
            category: product.category,
            description: product.description,
            datasheet_url: product.datasheet_url,
            image_url: product.photo_url,
            lifecycle_code: product.lifecycle_status,
            rohs_code: product.rohs_status,
            reach_code: product.reach_status,
            attributes: product
                .parameters
                .into_iter()
                .map(|p| (p.parameter, p.value))
                .collect(),
            pricing: product
                .standard_pricing
                .into_iter()
                .map(|p| RawPriceBreak {
                    quantity: p.break_quantity,
                    unit_price: p.unit_price,
                })
                .collect(),
            vendor_notes: product.marketing_info,
        }
    }
}

#[async_trait]
impl SupplierAdapter for DigiSupplyClient {
    fn name(&self) -> &str {
        "DigiSupply"
    }

    fn tier(&self) -> u8 {
        1
    }

    async fn fetch(&self, query: &PartQuery) -> Result<SupplierHit, TierError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/products/search", self.base_url);

        tracing::debug!(mpn = %query.mpn, url = %url, "Querying DigiSupply API");

        let mut params = vec![("keyword", query.mpn.clone())];
        if let Some(manufacturer) = &query.manufacturer {
            params.push(("manufacturer", manufacturer.clone()));
        }

        let response = self
            .http_client
            .get(&url)
            .query(&params)
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

        let search: DsSearchResponse = response
            .json()
            .await
            .map_err(|e| TierError::Parse(e.to_string()))?;

        let product = search.products.into_iter().next().ok_or(TierError::Miss)?;

        // Exact MPN matches are trusted; keyword matches are penalized
        let confidence = if search.exact_match { 95.0 } else { 70.0 };

        tracing::info!(
            mpn = %query.mpn,
            supplier = "DigiSupply",
            confidence = confidence,
            "Retrieved part from DigiSupply"
        );

        Ok(SupplierHit {
            payload: self.to_payload(product),
            confidence,
        })
    }
}
