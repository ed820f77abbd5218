//! Shared cycle health for the /health endpoint.
//! Updated by the scheduler and the cycle runner.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct HealthState {
    /// True while a scrape cycle is in progress.
    pub cycle_running: AtomicBool,
    pub cycles_completed: AtomicU64,
    pub cycles_failed: AtomicU64,
    /// Triggers dropped by the overlap policy.
    pub cycles_skipped: AtomicU64,
    /// Nanosecond timestamp of the last finished cycle (0 = none).
    pub last_cycle_at_ns: AtomicU64,
    pub last_cycle_duration_ms: AtomicU64,
    pub last_unique_records: AtomicU64,
    /// Sports whose render or extraction failed in the last cycle.
    pub last_failed_sports: AtomicU64,
    pub last_failed_writes: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub cycle_running: bool,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub cycles_skipped: u64,
    pub last_cycle_at_ns: u64,
    pub last_cycle_duration_ms: u64,
    pub last_unique_records: u64,
    pub last_failed_sports: u64,
    pub last_failed_writes: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cycle_running(&self, v: bool) {
        self.cycle_running.store(v, Ordering::Relaxed);
    }

    pub fn inc_cycles_skipped(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_failure(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(
        &self,
        finished_at_ns: u64,
        duration_ms: u64,
        unique_records: u64,
        failed_sports: u64,
        failed_writes: u64,
    ) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_at_ns.store(finished_at_ns, Ordering::Relaxed);
        self.last_cycle_duration_ms.store(duration_ms, Ordering::Relaxed);
        self.last_unique_records.store(unique_records, Ordering::Relaxed);
        self.last_failed_sports.store(failed_sports, Ordering::Relaxed);
        self.last_failed_writes.store(failed_writes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            cycle_running: self.cycle_running.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            last_cycle_at_ns: self.last_cycle_at_ns.load(Ordering::Relaxed),
            last_cycle_duration_ms: self.last_cycle_duration_ms.load(Ordering::Relaxed),
            last_unique_records: self.last_unique_records.load(Ordering::Relaxed),
            last_failed_sports: self.last_failed_sports.load(Ordering::Relaxed),
            last_failed_writes: self.last_failed_writes.load(Ordering::Relaxed),
        }
    }
}
