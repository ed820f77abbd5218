mod api;
mod bus;
mod config;
mod cycle;
mod db;
mod dedupe;
mod error;
mod extract;
mod reconcile;
mod render;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::bus::NotificationBus;
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::cycle::{CycleRunner, CycleScheduler, CycleSettings};
use crate::db::SqliteMatchStore;
use crate::error::Result;
use crate::extract::SportCatalog;
use crate::reconcile::Reconciler;
use crate::render::ChromeRendererFactory;
use crate::state::{MatchStore, MemoryMatchStore};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let catalog = Arc::new(SportCatalog::builtin(&cfg.sports)?);
    info!("Scraping {} sports: {}", catalog.sports.len(), catalog.names().join(", "));

    if cfg.uses_memory_store() {
        info!("Using in-memory match store (state is lost on restart)");
        serve(cfg, catalog, MemoryMatchStore::new()).await
    } else {
        let store = SqliteMatchStore::connect(&cfg.database_url).await?;
        serve(cfg, catalog, store).await
    }
}

async fn serve<S: MatchStore>(cfg: Config, catalog: Arc<SportCatalog>, store: Arc<S>) -> Result<()> {
    let bus = NotificationBus::new(CHANNEL_CAPACITY);
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());

    // --- Scrape cycle ---
    let runner = CycleRunner::new(
        Arc::new(ChromeRendererFactory::new(cfg.render.clone())),
        catalog,
        Reconciler::new(Arc::clone(&store), bus.clone()),
        CycleSettings::from_config(&cfg),
        Arc::clone(&health),
        Arc::clone(&latency),
    );
    let scheduler = CycleScheduler::new(
        Arc::new(runner),
        cfg.scrape_interval,
        cfg.overlap,
        cfg.scrape_on_start,
        Arc::clone(&health),
    );
    tokio::spawn(scheduler.run());

    // --- HTTP API ---
    let app = router(ApiState { store, bus, health, latency });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
