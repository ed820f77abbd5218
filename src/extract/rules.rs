//! Declarative per-sport extraction rules.
//!
//! The live-competition pages share one block layout (teams, clock, odds
//! items) but differ per sport in where the score sits and how many outcomes
//! the odds market has. Each sport is one row in `SPORT_TABLE`; selectors are
//! compiled once into a `SportCatalog` at startup.

use scraper::Selector;

use crate::config::MARKER_SELECTOR;
use crate::error::{AppError, Result};

/// Where the running score is rendered inside a match block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLayout {
    /// Score cells sit directly in the block.
    Flat,
    /// Score cells sit inside the `.sports-table__pts` points column.
    Points,
}

/// Shape of the main odds market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddsLayout {
    /// 1 / X / 2: home, draw, away.
    ThreeWay,
    /// Home / away only; draw stays 0.
    TwoWay,
}

/// One row of the sport table.
#[derive(Debug, Clone, Copy)]
pub struct SportSpec {
    pub name: &'static str,
    pub url: &'static str,
    pub score: ScoreLayout,
    pub odds: OddsLayout,
}

pub const SPORT_TABLE: &[SportSpec] = &[
    SportSpec {
        name: "soccer",
        url: "https://sports.bet9ja.com/liveCompetitions/3000001",
        score: ScoreLayout::Flat,
        odds: OddsLayout::ThreeWay,
    },
    SportSpec {
        name: "tennis",
        url: "https://sports.bet9ja.com/liveCompetitions/3000005",
        score: ScoreLayout::Points,
        odds: OddsLayout::TwoWay,
    },
    SportSpec {
        name: "basketball",
        url: "https://sports.bet9ja.com/liveCompetitions/3000002",
        score: ScoreLayout::Points,
        odds: OddsLayout::TwoWay,
    },
    SportSpec {
        name: "volleyball",
        url: "https://sports.bet9ja.com/liveCompetitions/3000023",
        score: ScoreLayout::Points,
        odds: OddsLayout::TwoWay,
    },
    SportSpec {
        name: "handball",
        url: "https://sports.bet9ja.com/liveCompetitions/3000006",
        score: ScoreLayout::Points,
        odds: OddsLayout::ThreeWay,
    },
    SportSpec {
        name: "snooker",
        url: "https://sports.bet9ja.com/liveCompetitions/3000019",
        score: ScoreLayout::Points,
        odds: OddsLayout::TwoWay,
    },
    SportSpec {
        name: "table-tennis",
        url: "https://sports.bet9ja.com/liveCompetitions/3000020",
        score: ScoreLayout::Points,
        odds: OddsLayout::TwoWay,
    },
];

// ---------------------------------------------------------------------------
// Compiled rules
// ---------------------------------------------------------------------------

/// Selectors shared by every sport.
#[derive(Debug)]
pub struct BlockRules {
    pub block: Selector,
    pub home_team: Selector,
    pub away_team: Selector,
    pub time: Selector,
    /// Text node holding the decimal price inside an odds item.
    pub odds_value: Selector,
}

#[derive(Debug)]
pub struct ScoreRule {
    pub home: Selector,
    pub away: Selector,
}

/// Odds item selectors; `draw` is None for two-outcome markets.
#[derive(Debug)]
pub struct OddsRule {
    pub home: Selector,
    pub draw: Option<Selector>,
    pub away: Selector,
}

#[derive(Debug)]
pub struct SportRules {
    pub name: String,
    pub url: String,
    pub score: ScoreRule,
    pub odds: OddsRule,
}

impl SportRules {
    pub fn compile(spec: &SportSpec) -> Result<Self> {
        let score = match spec.score {
            ScoreLayout::Flat => ScoreRule {
                home: selector(".sports-table__score-home")?,
                away: selector(".sports-table__score-away")?,
            },
            ScoreLayout::Points => ScoreRule {
                home: selector(".sports-table__pts .sports-table__score-home")?,
                away: selector(".sports-table__pts .sports-table__score-away")?,
            },
        };
        let odds = match spec.odds {
            OddsLayout::ThreeWay => OddsRule {
                home: selector(r#".sports-table__odds-item[id$="_sign-1"]"#)?,
                draw: Some(selector(r#".sports-table__odds-item[id$="_sign-X"]"#)?),
                away: selector(r#".sports-table__odds-item[id$="_sign-2"]"#)?,
            },
            OddsLayout::TwoWay => OddsRule {
                home: selector(
                    r#".sports-table__odds-item[id*="_sign-1"], .sports-table__odds-item[id*="_sign-1HH"]"#,
                )?,
                draw: None,
                away: selector(
                    r#".sports-table__odds-item[id*="_sign-2"], .sports-table__odds-item[id*="_sign-2HH"]"#,
                )?,
            },
        };
        Ok(Self {
            name: spec.name.to_string(),
            url: spec.url.to_string(),
            score,
            odds,
        })
    }
}

/// Compiled rules for every sport the scraper visits, in visiting order.
#[derive(Debug)]
pub struct SportCatalog {
    pub blocks: BlockRules,
    pub sports: Vec<SportRules>,
}

impl SportCatalog {
    /// Compiles `specs`, keeping only the names in `only` (all when empty).
    pub fn compile(specs: &[SportSpec], only: &[String]) -> Result<Self> {
        if let Some(unknown) = only
            .iter()
            .find(|name| !specs.iter().any(|s| s.name.eq_ignore_ascii_case(name)))
        {
            return Err(AppError::Config(format!("SPORTS lists unknown sport '{unknown}'")));
        }

        let sports = specs
            .iter()
            .filter(|s| only.is_empty() || only.iter().any(|n| n.eq_ignore_ascii_case(s.name)))
            .map(SportRules::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            blocks: BlockRules {
                block: selector(MARKER_SELECTOR)?,
                home_team: selector(".sports-table__home")?,
                away_team: selector(".sports-table__away")?,
                time: selector(".sports-table__time time")?,
                odds_value: selector(".odd-container")?,
            },
            sports,
        })
    }

    /// The full built-in table.
    pub fn builtin(only: &[String]) -> Result<Self> {
        Self::compile(SPORT_TABLE, only)
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&SportRules> {
        self.sports.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.sports.iter().map(|s| s.name.as_str()).collect()
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Config(format!("invalid selector {css:?}: {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_compiles_every_sport_in_order() {
        let catalog = SportCatalog::builtin(&[]).unwrap();
        assert_eq!(
            catalog.names(),
            vec!["soccer", "tennis", "basketball", "volleyball", "handball", "snooker", "table-tennis"]
        );
    }

    #[test]
    fn three_way_sports_have_a_draw_selector() {
        let catalog = SportCatalog::builtin(&[]).unwrap();
        assert!(catalog.get("soccer").unwrap().odds.draw.is_some());
        assert!(catalog.get("handball").unwrap().odds.draw.is_some());
        assert!(catalog.get("tennis").unwrap().odds.draw.is_none());
        assert!(catalog.get("snooker").unwrap().odds.draw.is_none());
    }

    #[test]
    fn subset_keeps_table_order() {
        let only = vec!["handball".to_string(), "Soccer".to_string()];
        let catalog = SportCatalog::builtin(&only).unwrap();
        assert_eq!(catalog.names(), vec!["soccer", "handball"]);
    }

    #[test]
    fn unknown_sport_is_a_config_error() {
        let only = vec!["curling".to_string()];
        assert!(matches!(SportCatalog::builtin(&only), Err(AppError::Config(_))));
    }

    #[test]
    fn new_rows_are_additive() {
        let specs = [SportSpec {
            name: "darts",
            url: "https://example.invalid/darts",
            score: ScoreLayout::Flat,
            odds: OddsLayout::TwoWay,
        }];
        let catalog = SportCatalog::compile(&specs, &[]).unwrap();
        assert_eq!(catalog.names(), vec!["darts"]);
        assert_eq!(catalog.get("darts").unwrap().url, "https://example.invalid/darts");
    }
}
