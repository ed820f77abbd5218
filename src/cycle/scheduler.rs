use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::config::OverlapPolicy;

/// Work the scheduler fires on every tick. Errors are handled inside.
pub trait CycleJob: Send + Sync + 'static {
    fn run_once(&self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    /// Waiting for the running cycle to finish.
    Queued,
    /// Dropped by the overlap policy.
    Skipped,
}

/// Fires a `CycleJob` at a fixed interval. At most one cycle runs at a time;
/// what happens to a trigger that arrives mid-cycle is the `OverlapPolicy`.
pub struct CycleScheduler<J> {
    job: Arc<J>,
    period: Duration,
    overlap: OverlapPolicy,
    run_on_start: bool,
    health: Arc<HealthState>,
    gate: Arc<Mutex<()>>,
    /// Set while a queued trigger is waiting on `gate`.
    pending: Arc<AtomicBool>,
}

impl<J: CycleJob> CycleScheduler<J> {
    pub fn new(
        job: Arc<J>,
        period: Duration,
        overlap: OverlapPolicy,
        run_on_start: bool,
        health: Arc<HealthState>,
    ) -> Self {
        Self {
            job,
            period,
            overlap,
            run_on_start,
            health,
            gate: Arc::new(Mutex::new(())),
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(self) {
        info!(
            every_secs = self.period.as_secs(),
            overlap = %self.overlap,
            run_on_start = self.run_on_start,
            "Scrape scheduler started"
        );
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.run_on_start {
            ticker.tick().await; // first tick is immediate
        }

        loop {
            ticker.tick().await;
            self.trigger();
        }
    }

    /// Starts a cycle now, or applies the overlap policy if one is running.
    /// Must be called from inside a tokio runtime.
    pub fn trigger(&self) -> TriggerOutcome {
        if let Ok(guard) = Arc::clone(&self.gate).try_lock_owned() {
            let job = Arc::clone(&self.job);
            tokio::spawn(async move {
                job.run_once().await;
                drop(guard);
            });
            return TriggerOutcome::Started;
        }

        if self.overlap == OverlapPolicy::Queue && !self.pending.swap(true, Ordering::AcqRel) {
            debug!("Cycle still running, trigger queued");
            let job = Arc::clone(&self.job);
            let gate = Arc::clone(&self.gate);
            let pending = Arc::clone(&self.pending);
            tokio::spawn(async move {
                let guard = gate.lock_owned().await;
                pending.store(false, Ordering::Release);
                job.run_once().await;
                drop(guard);
            });
            return TriggerOutcome::Queued;
        }

        warn!(overlap = %self.overlap, "Cycle still running, trigger skipped");
        self.health.inc_cycles_skipped();
        TriggerOutcome::Skipped
    }
}
