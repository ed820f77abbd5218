use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const DATABASE_URL: &str = "sqlite:scores.db";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Viewport the browser renders at.
pub const VIEWPORT: (u32, u32) = (1280, 800);

/// DOM marker that signals the match table has rendered.
pub const MARKER_SELECTOR: &str = ".table-f";

/// Capacity of the change-event broadcast channel. Subscribers lagging further
/// behind than this skip ahead.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Scrape cycle interval (seconds).
pub const SCRAPE_INTERVAL_SECS: u64 = 300;

/// Pause between sport categories inside one cycle.
pub const SPORT_SETTLE_MS: u64 = 5_000;

/// Pause after scrolling so lazy-loaded rows can materialize.
pub const SCROLL_SETTLE_MS: u64 = 3_000;

/// How long to wait for `MARKER_SELECTOR` before extracting whatever is there.
pub const MARKER_TIMEOUT_MS: u64 = 15_000;

pub const NAVIGATION_TIMEOUT_MS: u64 = 120_000;

/// What to do with a trigger that fires while a cycle is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Drop the trigger.
    Skip,
    /// Let one trigger wait for the running cycle; further ones are dropped.
    Queue,
}

impl std::str::FromStr for OverlapPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(OverlapPolicy::Skip),
            "queue" => Ok(OverlapPolicy::Queue),
            other => Err(AppError::Config(format!(
                "CYCLE_OVERLAP must be 'skip' or 'queue', got '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlapPolicy::Skip => write!(f, "skip"),
            OverlapPolicy::Queue => write!(f, "queue"),
        }
    }
}

/// Browser and page-load settings handed to the renderer.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub chrome_path: Option<PathBuf>,
    pub user_agent: String,
    pub block_resources: bool,
    pub navigation_timeout: Duration,
    pub marker_timeout: Duration,
    pub scroll_settle: Duration,
    /// Parent directory of `screenshots/` and `html/`; None disables the dumps.
    pub artifacts_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_level: String,
    pub api_port: u16,
    pub scrape_interval: Duration,
    pub scrape_on_start: bool,
    pub overlap: OverlapPolicy,
    /// Catalog subset to scrape (SPORTS, comma-separated). Empty = every sport.
    pub sports: Vec<String>,
    pub sport_settle: Duration,
    /// Abort the rest of a batch on the first failed write (RECONCILE_FAIL_FAST).
    pub reconcile_fail_fast: bool,
    pub render: RenderSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let debug_artifacts = parse_bool(&get, "DEBUG_ARTIFACTS", true)?;
        let artifacts_dir = debug_artifacts
            .then(|| PathBuf::from(get("ARTIFACTS_DIR").unwrap_or_else(|| ".".to_string())));

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DATABASE_URL.to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_port: get("API_PORT")
                .unwrap_or_else(|| "4000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            scrape_interval: Duration::from_secs(parse_nonzero_u64(
                &get,
                "SCRAPE_INTERVAL_SECS",
                SCRAPE_INTERVAL_SECS,
            )?),
            scrape_on_start: parse_bool(&get, "SCRAPE_ON_START", true)?,
            overlap: get("CYCLE_OVERLAP")
                .map(|v| v.parse::<OverlapPolicy>())
                .transpose()?
                .unwrap_or(OverlapPolicy::Skip),
            sports: get("SPORTS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            sport_settle: Duration::from_millis(parse_u64(&get, "SPORT_SETTLE_MS", SPORT_SETTLE_MS)?),
            reconcile_fail_fast: parse_bool(&get, "RECONCILE_FAIL_FAST", false)?,
            render: RenderSettings {
                chrome_path: get("CHROME_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
                user_agent: get("USER_AGENT").unwrap_or_else(|| USER_AGENT.to_string()),
                block_resources: parse_bool(&get, "BLOCK_RESOURCES", true)?,
                navigation_timeout: Duration::from_millis(parse_u64(
                    &get,
                    "NAVIGATION_TIMEOUT_MS",
                    NAVIGATION_TIMEOUT_MS,
                )?),
                marker_timeout: Duration::from_millis(parse_u64(
                    &get,
                    "MARKER_TIMEOUT_MS",
                    MARKER_TIMEOUT_MS,
                )?),
                scroll_settle: Duration::from_millis(parse_u64(
                    &get,
                    "SCROLL_SETTLE_MS",
                    SCROLL_SETTLE_MS,
                )?),
                artifacts_dir,
            },
        })
    }

    /// True when DATABASE_URL selects the in-memory store.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.eq_ignore_ascii_case("memory")
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match get(key) {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::Config(format!("{key} must be a non-negative integer, got '{v}'"))),
        None => Ok(default),
    }
}

fn parse_nonzero_u64(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match parse_u64(get, key, default)? {
        0 => Err(AppError::Config(format!("{key} must be greater than zero"))),
        v => Ok(v),
    }
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match get(key) {
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!("{key} must be a boolean, got '{v}'"))),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_source(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.database_url, DATABASE_URL);
        assert_eq!(cfg.api_port, 4000);
        assert_eq!(cfg.scrape_interval, Duration::from_secs(300));
        assert_eq!(cfg.overlap, OverlapPolicy::Skip);
        assert!(cfg.sports.is_empty());
        assert!(cfg.render.block_resources);
        assert_eq!(cfg.render.artifacts_dir, Some(PathBuf::from(".")));
        assert!(!cfg.reconcile_fail_fast);
        assert!(!cfg.uses_memory_store());
    }

    #[test]
    fn parses_overrides() {
        let cfg = config_from(&[
            ("DATABASE_URL", "memory"),
            ("CYCLE_OVERLAP", "Queue"),
            ("SPORTS", "soccer, tennis,,"),
            ("DEBUG_ARTIFACTS", "false"),
            ("SPORT_SETTLE_MS", "0"),
        ])
        .unwrap();
        assert!(cfg.uses_memory_store());
        assert_eq!(cfg.overlap, OverlapPolicy::Queue);
        assert_eq!(cfg.sports, vec!["soccer".to_string(), "tennis".to_string()]);
        assert!(cfg.render.artifacts_dir.is_none());
        assert_eq!(cfg.sport_settle, Duration::ZERO);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(config_from(&[("API_PORT", "99999")]), Err(AppError::Config(_))));
        assert!(matches!(config_from(&[("CYCLE_OVERLAP", "parallel")]), Err(AppError::Config(_))));
        assert!(matches!(config_from(&[("BLOCK_RESOURCES", "maybe")]), Err(AppError::Config(_))));
        assert!(matches!(config_from(&[("SCRAPE_INTERVAL_SECS", "0")]), Err(AppError::Config(_))));
    }
}
