use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use serde::Deserialize;

/// How long a row stays highlighted after a change event.
pub const HIGHLIGHT_FOR: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// API response types (mirror the scraper's JSON shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamsView {
    pub home: String,
    pub away: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct OddsView {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchView {
    pub id: String,
    pub teams: TeamsView,
    pub score: String,
    pub odds: OddsView,
    pub time: String,
    pub sport: String,
    pub updated_at_ns: i64,
}

/// One frame from `/subscriptions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeFrame {
    pub kind: String,
    #[serde(rename = "match")]
    pub snapshot: MatchView,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct HealthView {
    pub subscribers: usize,
    pub cycle_running: bool,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub cycles_skipped: u64,
    pub last_cycle_at_ns: u64,
    pub last_cycle_duration_ms: u64,
    pub last_unique_records: u64,
    pub last_failed_sports: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct LatencyView {
    pub sport: String,
    pub samples: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

/// Messages from the change-stream task.
#[derive(Debug)]
pub enum FeedMsg {
    Connected,
    Disconnected(String),
    Change(ChangeFrame),
}

#[derive(Debug)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub feed: ConnectionStatus,
    pub matches: Vec<MatchView>,
    pub health: HealthView,
    pub latency: Vec<LatencyView>,
    /// Only show this sport; None = all.
    pub sport_filter: Option<String>,
    /// match id → when it last changed.
    pub recent: HashMap<String, Instant>,
    pub events_seen: u64,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            feed: ConnectionStatus::Connecting,
            matches: Vec::new(),
            health: HealthView::default(),
            latency: Vec::new(),
            sport_filter: None,
            recent: HashMap::new(),
            events_seen: 0,
            base_url,
        }
    }

    /// `ws://` twin of the HTTP base url.
    pub fn subscriptions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{base}")
        };
        format!("{ws_base}/subscriptions")
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let matches_url = format!("{}/matches", self.base_url);
        let health_url = format!("{}/health", self.base_url);
        let latency_url = format!("{}/stats/latency", self.base_url);

        let (matches_res, health_res, latency_res) = tokio::join!(
            client.get(&matches_url).send(),
            client.get(&health_url).send(),
            client.get(&latency_url).send(),
        );

        let matches_resp = match matches_res {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match matches_resp.json::<Vec<MatchView>>().await {
            Ok(m) => {
                self.matches = m;
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthView>().await {
                self.health = health;
            }
        }
        if let Ok(l) = latency_res {
            if let Ok(latency) = l.json::<Vec<LatencyView>>().await {
                self.latency = latency;
            }
        }
    }

    pub fn apply_feed(&mut self, msg: FeedMsg, now: Instant) {
        match msg {
            FeedMsg::Connected => self.feed = ConnectionStatus::Connected,
            FeedMsg::Disconnected(reason) => self.feed = ConnectionStatus::Error(reason),
            FeedMsg::Change(frame) => self.apply_change(frame, now),
        }
    }

    /// Upserts the snapshot so the row updates before the next poll, and
    /// marks it as recently changed.
    pub fn apply_change(&mut self, frame: ChangeFrame, now: Instant) {
        self.events_seen += 1;
        let snapshot = frame.snapshot;
        self.recent.insert(snapshot.id.clone(), now);
        match self.matches.iter_mut().find(|m| m.id == snapshot.id) {
            Some(existing) => *existing = snapshot,
            None => self.matches.insert(0, snapshot),
        }
    }

    pub fn is_recent(&self, id: &str, now: Instant) -> bool {
        self.recent
            .get(id)
            .is_some_and(|at| now.saturating_duration_since(*at) < HIGHLIGHT_FOR)
    }

    pub fn prune_recent(&mut self, now: Instant) {
        self.recent
            .retain(|_, at| now.saturating_duration_since(*at) < HIGHLIGHT_FOR);
    }

    pub fn sports(&self) -> Vec<String> {
        self.matches
            .iter()
            .map(|m| m.sport.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// All → first sport → … → last sport → all.
    pub fn cycle_sport_filter(&mut self) {
        let sports = self.sports();
        self.sport_filter = match &self.sport_filter {
            None => sports.first().cloned(),
            Some(current) => sports
                .iter()
                .position(|s| s == current)
                .and_then(|i| sports.get(i + 1))
                .cloned(),
        };
    }

    pub fn visible_matches(&self) -> Vec<&MatchView> {
        self.matches
            .iter()
            .filter(|m| self.sport_filter.as_ref().map_or(true, |s| &m.sport == s))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// 0 means "not observed".
pub fn format_odds(v: f64) -> String {
    if v > 0.0 {
        format!("{v:.2}")
    } else {
        "—".to_string()
    }
}

/// Convert nanosecond epoch timestamp to HH:MM:SS string.
pub fn format_time_ns(ns: i64) -> String {
    let secs = (ns / 1_000_000_000) as u64;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: &str, sport: &str, score: &str) -> MatchView {
        MatchView {
            id: id.to_string(),
            teams: TeamsView { home: "A".to_string(), away: "B".to_string() },
            score: score.to_string(),
            odds: OddsView::default(),
            time: "10'".to_string(),
            sport: sport.to_string(),
            updated_at_ns: 0,
        }
    }

    #[test]
    fn parses_server_change_frame() {
        let json = r#"{"kind":"updated","match":{"id":"m1","teams":{"home":"A","away":"B"},
            "score":"2-1","odds":{"home":1.5,"draw":3.2,"away":6.0},"time":"77'",
            "sport":"soccer","updated_at_ns":1700000000000000000}}"#;
        let frame: ChangeFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.kind, "updated");
        assert_eq!(frame.snapshot.score, "2-1");
        assert_eq!(frame.snapshot.odds.draw, 3.2);
    }

    #[test]
    fn change_upserts_and_highlights() {
        let mut app = AppState::new("http://localhost:4000".to_string());
        app.matches = vec![view("m1", "soccer", "0-0")];
        let now = Instant::now();

        app.apply_change(ChangeFrame { kind: "updated".into(), snapshot: view("m1", "soccer", "1-0") }, now);
        app.apply_change(ChangeFrame { kind: "created".into(), snapshot: view("m2", "tennis", "0-0") }, now);

        assert_eq!(app.matches.len(), 2);
        assert_eq!(app.matches[0].id, "m2");
        assert_eq!(app.matches[1].score, "1-0");
        assert!(app.is_recent("m1", now));
        assert!(!app.is_recent("m1", now + HIGHLIGHT_FOR));
        assert_eq!(app.events_seen, 2);

        app.prune_recent(now + HIGHLIGHT_FOR);
        assert!(app.recent.is_empty());
    }

    #[test]
    fn sport_filter_cycles_through_sports_then_all() {
        let mut app = AppState::new("http://localhost:4000".to_string());
        app.matches = vec![view("1", "tennis", "0-0"), view("2", "soccer", "0-0"), view("3", "soccer", "1-1")];

        app.cycle_sport_filter();
        assert_eq!(app.sport_filter.as_deref(), Some("soccer"));
        assert_eq!(app.visible_matches().len(), 2);
        app.cycle_sport_filter();
        assert_eq!(app.sport_filter.as_deref(), Some("tennis"));
        app.cycle_sport_filter();
        assert_eq!(app.sport_filter, None);
        assert_eq!(app.visible_matches().len(), 3);
    }

    #[test]
    fn subscriptions_url_follows_base_scheme() {
        let app = AppState::new("http://localhost:4000/".to_string());
        assert_eq!(app.subscriptions_url(), "ws://localhost:4000/subscriptions");
        let app = AppState::new("https://scores.example.com".to_string());
        assert_eq!(app.subscriptions_url(), "wss://scores.example.com/subscriptions");
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(format_odds(1.857), "1.86");
        assert_eq!(format_odds(0.0), "—");
        assert_eq!(truncate("Borussia Mönchengladbach", 10), "Borussia …");
        assert_eq!(truncate("PSG", 10), "PSG");
        assert_eq!(format_time_ns(3_661_000_000_000), "01:01:01");
    }
}
