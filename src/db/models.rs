//! Row type for the `matches` table (migrations/0001_create_matches.sql).
use crate::error::{AppError, Result};
use crate::types::{Odds, PersistedMatch, TeamPair};

#[derive(Debug, sqlx::FromRow)]
pub struct MatchRow {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub sport: String,
    pub score: String,
    pub odds_home: f64,
    pub odds_draw: f64,
    pub odds_away: f64,
    pub time_label: String,
    pub updated_at: i64,
}

impl TryFrom<MatchRow> for PersistedMatch {
    type Error = AppError;

    fn try_from(row: MatchRow) -> Result<Self> {
        let teams = TeamPair::new(row.home_team, row.away_team)
            .ok_or_else(|| AppError::Store(format!("row {} has a blank team name", row.id)))?;
        Ok(PersistedMatch {
            id: row.id,
            teams,
            score: row.score,
            odds: Odds {
                home: row.odds_home,
                draw: row.odds_draw,
                away: row.odds_away,
            },
            time: row.time_label,
            sport: row.sport,
            updated_at_ns: row.updated_at,
        })
    }
}
