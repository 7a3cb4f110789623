//! Shared fixtures for integration tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use bomcat_common::config::StreamConfig;
use bomcat_common::events::EventBus;
use bomcat_enrich::hub::{LocalUpstream, ProgressHub};
use bomcat_enrich::models::PartQuery;
use bomcat_enrich::orchestrator::{EnrichmentPipeline, Orchestrator};
use bomcat_enrich::router::Router;
use bomcat_enrich::suppliers::{
    RawPayload, RawPriceBreak, SupplierAdapter, SupplierHit, TierChain, TierError,
};
use bomcat_enrich::AppState;

type FetchFn = dyn Fn(&PartQuery) -> Result<SupplierHit, TierError> + Send + Sync;

/// Adapter whose behavior is a closure supplied by the test
pub struct ScriptedAdapter {
    name: &'static str,
    tier: u8,
    fetch: Box<FetchFn>,
}

impl ScriptedAdapter {
    pub fn new<F>(name: &'static str, tier: u8, fetch: F) -> Arc<Self>
    where
        F: Fn(&PartQuery) -> Result<SupplierHit, TierError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name,
            tier,
            fetch: Box::new(fetch),
        })
    }
}

#[async_trait]
impl SupplierAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn tier(&self) -> u8 {
        self.tier
    }

    async fn fetch(&self, query: &PartQuery) -> Result<SupplierHit, TierError> {
        (self.fetch)(query)
    }
}

/// A payload with every canonical field populated
pub fn full_payload(supplier: &str, tier: u8, mpn: &str) -> RawPayload {
    RawPayload {
        supplier: supplier.to_string(),
        tier,
        mpn: Some(mpn.to_string()),
        manufacturer: Some("Texas Instruments".to_string()),
        category: Some("ICs/Amplifiers".to_string()),
        description: Some("Dual op-amp SOIC-8".to_string()),
        datasheet_url: Some("https://example.com/ds.pdf".to_string()),
        image_url: Some("https://example.com/part.jpg".to_string()),
        lifecycle_code: Some("Active".to_string()),
        rohs_code: Some("Compliant".to_string()),
        reach_code: Some("Unaffected".to_string()),
        attributes: vec![("Package / Case".to_string(), "SOIC-8".to_string())],
        pricing: vec![RawPriceBreak {
            quantity: 1,
            unit_price: 0.25,
        }],
        vendor_notes: None,
    }
}

pub fn hit(payload: RawPayload, confidence: f64) -> Result<SupplierHit, TierError> {
    Ok(SupplierHit {
        payload,
        confidence,
    })
}

pub fn chain(adapters: Vec<Arc<dyn SupplierAdapter>>) -> TierChain {
    TierChain::new(adapters, Duration::from_millis(500), 50.0)
}

/// Full in-memory service state over scripted adapters
pub async fn test_state(
    adapters: Vec<Arc<dyn SupplierAdapter>>,
    worker_pool_size: usize,
) -> AppState {
    let pool = bomcat_enrich::db::init_memory_pool().await.expect("pool");
    let event_bus = EventBus::new(1024);

    let pipeline = Arc::new(EnrichmentPipeline::new(
        pool.clone(),
        chain(adapters),
        Router::default(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        pipeline,
        event_bus.clone(),
        worker_pool_size,
    ));

    let stream_config = StreamConfig {
        backoff_base_ms: 10,
        backoff_max_ms: 100,
        max_reconnect_attempts: 3,
        close_grace_ms: 20,
    };
    let hub = Arc::new(ProgressHub::new(
        Arc::new(LocalUpstream::new(event_bus.clone())),
        stream_config,
    ));

    AppState::new(pool, event_bus, orchestrator, hub)
}
