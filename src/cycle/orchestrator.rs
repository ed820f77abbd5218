use std::sync::Arc;
use std::time::{Duration, Instant};

use scraper::Html;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::{Config, MARKER_SELECTOR};
use crate::cycle::scheduler::CycleJob;
use crate::dedupe::dedupe;
use crate::error::Result;
use crate::extract::{extract, SportCatalog, SportRules};
use crate::extract::rules::BlockRules;
use crate::reconcile::{ReconcileSummary, Reconciler};
use crate::render::{PageRenderer, RenderRequest, RendererFactory};
use crate::state::MatchStore;
use crate::types::{now_ns, MatchRecord};

#[derive(Debug, Clone, Copy)]
pub struct CycleSettings {
    /// Pause between two sports.
    pub sport_settle: Duration,
    pub marker_timeout: Duration,
    pub fail_fast: bool,
}

impl CycleSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            sport_settle: cfg.sport_settle,
            marker_timeout: cfg.render.marker_timeout,
            fail_fast: cfg.reconcile_fail_fast,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SportStatus {
    Scraped { records: usize, marker_found: bool },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SportReport {
    pub sport: String,
    #[serde(flatten)]
    pub status: SportStatus,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub sports: Vec<SportReport>,
    /// Records extracted across every sport, before dedupe.
    pub scraped: usize,
    pub unique: usize,
    pub reconcile: ReconcileSummary,
    pub duration: Duration,
}

impl CycleReport {
    pub fn failed_sports(&self) -> usize {
        self.sports
            .iter()
            .filter(|s| matches!(s.status, SportStatus::Failed { .. }))
            .count()
    }
}

/// Runs one full scrape: render every sport in catalog order inside a single
/// browser session, then dedupe and reconcile the combined records.
pub struct CycleRunner<F, S> {
    factory: Arc<F>,
    catalog: Arc<SportCatalog>,
    reconciler: Reconciler<S>,
    settings: CycleSettings,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
}

impl<F: RendererFactory, S: MatchStore> CycleRunner<F, S> {
    pub fn new(
        factory: Arc<F>,
        catalog: Arc<SportCatalog>,
        reconciler: Reconciler<S>,
        settings: CycleSettings,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Self {
        Self { factory, catalog, reconciler, settings, health, latency }
    }

    /// Fails only when the browser cannot be launched or, with fail-fast
    /// reconciliation, when a write fails. Per-sport failures are reported.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        let factory = Arc::clone(&self.factory);
        let catalog = Arc::clone(&self.catalog);
        let latency = Arc::clone(&self.latency);
        let settings = self.settings;

        // Chrome and scraper::Html are blocking and !Send respectively; the
        // whole scrape stays on one blocking thread.
        let (sports, records) =
            tokio::task::spawn_blocking(move || scrape_all(&*factory, &catalog, &latency, &settings))
                .await??;

        let scraped = records.len();
        let unique = dedupe(records);
        let unique_count = unique.len();
        let reconcile = self.reconciler.reconcile_all(unique, self.settings.fail_fast).await?;

        Ok(CycleReport {
            sports,
            scraped,
            unique: unique_count,
            reconcile,
            duration: started.elapsed(),
        })
    }
}

impl<F: RendererFactory, S: MatchStore> CycleJob for CycleRunner<F, S> {
    async fn run_once(&self) {
        self.health.set_cycle_running(true);
        info!("Scrape cycle started");

        match self.run_cycle().await {
            Ok(report) => {
                info!(
                    scraped = report.scraped,
                    unique = report.unique,
                    created = report.reconcile.created,
                    updated = report.reconcile.updated,
                    failed_writes = report.reconcile.failed,
                    failed_sports = report.failed_sports(),
                    "Scrape cycle finished in {:.1}s",
                    report.duration.as_secs_f64(),
                );
                self.health.record_cycle(
                    now_ns(),
                    report.duration.as_millis() as u64,
                    report.unique as u64,
                    report.failed_sports() as u64,
                    report.reconcile.failed as u64,
                );
            }
            Err(e) => {
                error!("Scrape cycle failed: {e}");
                self.health.record_cycle_failure();
            }
        }

        self.health.set_cycle_running(false);
    }
}

fn scrape_all<F: RendererFactory>(
    factory: &F,
    catalog: &SportCatalog,
    latency: &LatencyStats,
    settings: &CycleSettings,
) -> Result<(Vec<SportReport>, Vec<MatchRecord>)> {
    // Dropped on every return path, which closes the browser.
    let mut renderer = factory.launch()?;

    let mut reports = Vec::with_capacity(catalog.sports.len());
    let mut records = Vec::new();

    for (i, sport) in catalog.sports.iter().enumerate() {
        if i > 0 && !settings.sport_settle.is_zero() {
            std::thread::sleep(settings.sport_settle);
        }

        let status = match scrape_sport(&mut renderer, &catalog.blocks, sport, settings, latency) {
            Ok((found, marker_found)) => {
                info!(sport = %sport.name, records = found.len(), "Extracted");
                let n = found.len();
                records.extend(found);
                SportStatus::Scraped { records: n, marker_found }
            }
            Err(e) => {
                warn!(sport = %sport.name, "Skipping sport this cycle: {e}");
                SportStatus::Failed { error: e.to_string() }
            }
        };
        reports.push(SportReport { sport: sport.name.clone(), status });
    }

    Ok((reports, records))
}

fn scrape_sport<R: PageRenderer>(
    renderer: &mut R,
    blocks: &BlockRules,
    sport: &SportRules,
    settings: &CycleSettings,
    latency: &LatencyStats,
) -> Result<(Vec<MatchRecord>, bool)> {
    let started = Instant::now();
    let page = renderer.render(&RenderRequest {
        sport: &sport.name,
        url: &sport.url,
        wait_selector: MARKER_SELECTOR,
        timeout: settings.marker_timeout,
    })?;
    latency.record(&sport.name, started.elapsed());

    let doc = Html::parse_document(&page.html);
    Ok((extract(&doc, blocks, sport).collect(), page.marker_found))
}
