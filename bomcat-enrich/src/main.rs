//! bomcat-enrich service entry point

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use bomcat_common::config::load_config;
use bomcat_common::events::EventBus;
use bomcat_enrich::hub::{LocalUpstream, ProgressHub};
use bomcat_enrich::orchestrator::{EnrichmentPipeline, Orchestrator};
use bomcat_enrich::router::{Router, RouterThresholds};
use bomcat_enrich::suppliers::{
    DigiSupplyClient, ElectroMartClient, PartHubClient, SheetScrapeClient, SupplierAdapter,
    TierChain,
};
use bomcat_enrich::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .init();

    tracing::info!("Starting bomcat-enrich");

    let db = bomcat_enrich::db::init_database_pool(Path::new(&config.database_path)).await?;

    let adapters: Vec<Arc<dyn SupplierAdapter>> = vec![
        Arc::new(DigiSupplyClient::new().map_err(|e| anyhow::anyhow!("{}", e))?),
        Arc::new(ElectroMartClient::new().map_err(|e| anyhow::anyhow!("{}", e))?),
        Arc::new(PartHubClient::new().map_err(|e| anyhow::anyhow!("{}", e))?),
        Arc::new(SheetScrapeClient::new().map_err(|e| anyhow::anyhow!("{}", e))?),
    ];
    let chain = TierChain::new(
        adapters,
        Duration::from_millis(config.enrichment.tier_timeout_ms),
        config.enrichment.usability_floor,
    );

    let router = Router::new(RouterThresholds {
        production: config.enrichment.production_threshold,
        review: config.enrichment.review_threshold,
    });

    let event_bus = EventBus::new(1024);
    let pipeline = Arc::new(EnrichmentPipeline::new(db.clone(), chain, router));
    let orchestrator = Arc::new(Orchestrator::new(
        pipeline,
        event_bus.clone(),
        config.enrichment.worker_pool_size,
    ));

    let hub = Arc::new(ProgressHub::new(
        Arc::new(LocalUpstream::new(event_bus.clone())),
        config.stream.clone(),
    ));

    let state = AppState::new(db, event_bus, orchestrator, hub);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "bomcat-enrich listening");

    axum::serve(listener, app).await?;

    Ok(())
}
