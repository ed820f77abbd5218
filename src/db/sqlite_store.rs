use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::models::MatchRow;
use crate::error::Result;
use crate::state::MatchStore;
use crate::types::{PersistedMatch, TeamPair};

const SELECT_COLUMNS: &str = "SELECT id, home_team, away_team, sport, score, \
     odds_home, odds_draw, odds_away, time_label, updated_at FROM matches";

/// SQLite-backed match store. Identity is enforced by the unique index on
/// (home_team, away_team, sport).
#[derive(Clone)]
pub struct SqliteMatchStore {
    pool: SqlitePool,
}

impl SqliteMatchStore {
    /// Opens (creating if needed) the database at `url` and runs migrations.
    pub async fn connect(url: &str) -> Result<Arc<Self>> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let store = Self::from_pool(pool).await?;
        info!("Database ready at {url}");
        Ok(store)
    }

    /// Single-connection in-memory database; each call gets a fresh one.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Arc<Self>> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Arc<Self>> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Arc::new(Self { pool }))
    }
}

impl MatchStore for SqliteMatchStore {
    async fn find_by_identity(&self, teams: &TeamPair, sport: &str) -> Result<Option<PersistedMatch>> {
        let sql = format!("{SELECT_COLUMNS} WHERE home_team = ? AND away_team = ? AND sport = ?");
        let row = sqlx::query_as::<_, MatchRow>(&sql)
            .bind(teams.home())
            .bind(teams.away())
            .bind(sport)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PersistedMatch::try_from).transpose()
    }

    async fn insert(&self, m: &PersistedMatch) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO matches (
                id, home_team, away_team, sport, score,
                odds_home, odds_draw, odds_away, time_label, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&m.id)
        .bind(m.teams.home())
        .bind(m.teams.away())
        .bind(&m.sport)
        .bind(&m.score)
        .bind(m.odds.home)
        .bind(m.odds.draw)
        .bind(m.odds.away)
        .bind(&m.time)
        .bind(m.updated_at_ns)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, m: &PersistedMatch) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE matches
            SET score = ?, odds_home = ?, odds_draw = ?, odds_away = ?,
                time_label = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&m.score)
        .bind(m.odds.home)
        .bind(m.odds.draw)
        .bind(m.odds.away)
        .bind(&m.time)
        .bind(m.updated_at_ns)
        .bind(&m.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_matches(&self) -> Result<Vec<PersistedMatch>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY updated_at DESC");
        let rows = sqlx::query_as::<_, MatchRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(PersistedMatch::try_from).collect()
    }

    async fn get_match(&self, id: &str) -> Result<Option<PersistedMatch>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = sqlx::query_as::<_, MatchRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PersistedMatch::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::types::Odds;

    fn doc(id: &str, home: &str, away: &str, sport: &str) -> PersistedMatch {
        PersistedMatch {
            id: id.to_string(),
            teams: TeamPair::new(home, away).unwrap(),
            score: "0-0".to_string(),
            odds: Odds { home: 1.5, draw: 3.0, away: 4.5 },
            time: "12'".to_string(),
            sport: sport.to_string(),
            updated_at_ns: 100,
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_identity() {
        let store = SqliteMatchStore::in_memory().await.unwrap();
        store.insert(&doc("m1", "Team A", "Team B", "soccer")).await.unwrap();

        let teams = TeamPair::new("Team A", "Team B").unwrap();
        let found = store.find_by_identity(&teams, "soccer").await.unwrap().unwrap();
        assert_eq!(found, doc("m1", "Team A", "Team B", "soccer"));

        let swapped = TeamPair::new("Team B", "Team A").unwrap();
        assert!(store.find_by_identity(&swapped, "soccer").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_overwrites_mutable_fields() {
        let store = SqliteMatchStore::in_memory().await.unwrap();
        store.insert(&doc("m1", "A", "B", "tennis")).await.unwrap();

        let mut m = doc("m1", "A", "B", "tennis");
        m.score = "2-1".to_string();
        m.odds = Odds::default();
        m.time = "3rd set".to_string();
        m.updated_at_ns = 200;
        store.update(&m).await.unwrap();

        let got = store.get_match("m1").await.unwrap().unwrap();
        assert_eq!(got, m);
        assert_eq!(store.list_matches().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_identity_is_rejected() {
        let store = SqliteMatchStore::in_memory().await.unwrap();
        store.insert(&doc("m1", "A", "B", "soccer")).await.unwrap();
        let err = store.insert(&doc("m2", "A", "B", "soccer")).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn list_orders_by_most_recent_write() {
        let store = SqliteMatchStore::in_memory().await.unwrap();
        let mut older = doc("old", "A", "B", "soccer");
        older.updated_at_ns = 1;
        let mut newer = doc("new", "C", "D", "soccer");
        newer.updated_at_ns = 2;
        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();

        let ids: Vec<String> = store.list_matches().await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
        assert!(store.get_match("nope").await.unwrap().is_none());
    }
}
