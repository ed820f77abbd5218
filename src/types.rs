use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Ordered (home, away) pair. Both names are non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamPair {
    home: String,
    away: String,
}

impl TeamPair {
    /// Returns None when either name is blank.
    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Option<Self> {
        let home = home.into().trim().to_string();
        let away = away.into().trim().to_string();
        if home.is_empty() || away.is_empty() {
            return None;
        }
        Some(Self { home, away })
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn away(&self) -> &str {
        &self.away
    }
}

impl std::fmt::Display for TeamPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} vs {}", self.home, self.away)
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

/// Decimal odds per outcome. 0.0 means the outcome was not observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Odds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

// ---------------------------------------------------------------------------
// MatchRecord: one observation from one scrape
// ---------------------------------------------------------------------------

pub const DEFAULT_SCORE: &str = "0-0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub teams: TeamPair,
    /// "home-away" exactly as rendered.
    pub score: String,
    pub odds: Odds,
    /// Free-text clock label ("45'", "HT", "2nd set"...).
    pub time: String,
    pub sport: String,
}

// ---------------------------------------------------------------------------
// PersistedMatch: durable state, one per (teams, sport)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMatch {
    pub id: String,
    pub teams: TeamPair,
    pub score: String,
    pub odds: Odds,
    pub time: String,
    pub sport: String,
    /// Nanosecond UTC epoch of the last reconciliation write.
    pub updated_at_ns: i64,
}

impl PersistedMatch {
    pub fn from_record(id: String, record: MatchRecord, updated_at_ns: i64) -> Self {
        Self {
            id,
            teams: record.teams,
            score: record.score,
            odds: record.odds,
            time: record.time,
            sport: record.sport,
            updated_at_ns,
        }
    }

    /// Overwrites the mutable fields. `updated_at_ns` only ever moves forward,
    /// even when the clock reading repeats.
    pub fn apply(&mut self, record: MatchRecord, now_ns: i64) {
        self.score = record.score;
        self.odds = record.odds;
        self.time = record.time;
        self.updated_at_ns = now_ns.max(self.updated_at_ns.saturating_add(1));
    }
}

// ---------------------------------------------------------------------------
// ChangeEvent: fanned out to live subscribers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "created"),
            ChangeKind::Updated => write!(f, "updated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    #[serde(rename = "match")]
    pub snapshot: PersistedMatch,
}

/// Wall clock in nanoseconds since the Unix epoch (0 if the clock is before it).
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(score: &str, time: &str) -> MatchRecord {
        MatchRecord {
            teams: TeamPair::new("Team A", "Team B").unwrap(),
            score: score.to_string(),
            odds: Odds::default(),
            time: time.to_string(),
            sport: "soccer".to_string(),
        }
    }

    #[test]
    fn team_pair_rejects_blank_names() {
        assert!(TeamPair::new("Team A", "").is_none());
        assert!(TeamPair::new("   ", "Team B").is_none());
        let pair = TeamPair::new(" Team A ", "Team B\n").unwrap();
        assert_eq!(pair.home(), "Team A");
        assert_eq!(pair.away(), "Team B");
    }

    #[test]
    fn team_pair_is_order_sensitive() {
        assert_ne!(TeamPair::new("A", "B"), TeamPair::new("B", "A"));
    }

    #[test]
    fn apply_moves_updated_at_forward_on_repeated_clock() {
        let mut m = PersistedMatch::from_record("id1".to_string(), record("0-0", "10'"), 1_000);
        m.apply(record("1-0", "12'"), 1_000);
        assert_eq!(m.updated_at_ns, 1_001);
        assert_eq!(m.score, "1-0");
        assert_eq!(m.time, "12'");
        m.apply(record("1-1", "50'"), 5_000);
        assert_eq!(m.updated_at_ns, 5_000);
    }

    #[test]
    fn now_ns_is_epoch_nanoseconds() {
        let a = now_ns();
        let b = now_ns();
        // 2020-01-01T00:00:00Z
        assert!(a > 1_577_836_800_000_000_000);
        assert!(b >= a);
    }

    #[test]
    fn change_event_serializes_snapshot_as_match() {
        let event = ChangeEvent {
            kind: ChangeKind::Created,
            snapshot: PersistedMatch::from_record("id1".to_string(), record("0-0", ""), 1),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "created");
        assert_eq!(json["match"]["id"], "id1");
        assert_eq!(json["match"]["teams"]["home"], "Team A");
    }
}
