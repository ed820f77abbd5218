//! Per-sport render latency. The orchestrator records how long each page took
//! from navigation to content; the API reports percentiles.

use std::time::Duration;

use dashmap::DashMap;
use hdrhistogram::Histogram;
use serde::Serialize;
use tracing::warn;

/// Tracks 1ms to 1h, 3 significant figures. Values are milliseconds.
const MAX_TRACKED_MS: u64 = 3_600_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub sport: String,
    pub samples: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
}

#[derive(Default)]
pub struct LatencyStats {
    per_sport: DashMap<String, Histogram<u64>>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, sport: &str, d: Duration) {
        let ms = (d.as_millis().min(u128::from(MAX_TRACKED_MS)) as u64).max(1);
        if !self.per_sport.contains_key(sport) {
            match Histogram::new_with_bounds(1, MAX_TRACKED_MS, 3) {
                Ok(h) => {
                    self.per_sport.entry(sport.to_string()).or_insert(h);
                }
                Err(e) => {
                    warn!("Latency histogram unavailable: {e}");
                    return;
                }
            }
        }
        if let Some(mut h) = self.per_sport.get_mut(sport) {
            let _ = h.record(ms);
        }
    }

    /// One summary per sport that has samples, sorted by sport name.
    pub fn summaries(&self) -> Vec<LatencySummary> {
        let mut out: Vec<LatencySummary> = self
            .per_sport
            .iter()
            .filter(|e| e.value().len() > 0)
            .map(|e| {
                let h = e.value();
                LatencySummary {
                    sport: e.key().clone(),
                    samples: h.len(),
                    p50_ms: h.value_at_quantile(0.5),
                    p95_ms: h.value_at_quantile(0.95),
                    p99_ms: h.value_at_quantile(0.99),
                    max_ms: h.max(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.sport.cmp(&b.sport));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_have_no_summaries() {
        assert!(LatencyStats::new().summaries().is_empty());
    }

    #[test]
    fn percentiles_are_tracked_per_sport() {
        let stats = LatencyStats::new();
        for ms in [100, 200, 300, 400] {
            stats.record("soccer", Duration::from_millis(ms));
        }
        stats.record("tennis", Duration::from_secs(2));

        let summaries = stats.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].sport, "soccer");
        assert_eq!(summaries[0].samples, 4);
        assert!(summaries[0].p50_ms >= 199 && summaries[0].p50_ms <= 201, "{:?}", summaries[0]);
        assert!(summaries[0].max_ms >= 399);
        assert_eq!(summaries[1].sport, "tennis");
        assert_eq!(summaries[1].samples, 1);
    }

    #[test]
    fn out_of_range_durations_are_clamped() {
        let stats = LatencyStats::new();
        stats.record("snooker", Duration::ZERO);
        stats.record("snooker", Duration::from_secs(10 * 3600));
        assert_eq!(stats.summaries()[0].samples, 2);
    }
}
