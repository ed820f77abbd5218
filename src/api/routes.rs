use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::{HealthSnapshot, HealthState};
use crate::api::latency::{LatencyStats, LatencySummary};
use crate::api::subscribe::subscriptions;
use crate::bus::NotificationBus;
use crate::error::AppError;
use crate::state::MatchStore;
use crate::types::PersistedMatch;

pub struct ApiState<S> {
    pub store: Arc<S>,
    pub bus: NotificationBus,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

// Manual impl: S itself need not be Clone.
impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            bus: self.bus.clone(),
            health: Arc::clone(&self.health),
            latency: Arc::clone(&self.latency),
        }
    }
}

pub fn router<S: MatchStore>(state: ApiState<S>) -> Router {
    Router::new()
        .route("/matches", get(get_matches::<S>))
        .route("/matches/:id", get(get_match::<S>))
        .route("/subscriptions", get(subscriptions::<S>))
        .route("/health", get(get_health::<S>))
        .route("/stats/latency", get(get_stats_latency::<S>))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchesQuery {
    pub sport: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub subscribers: usize,
    #[serde(flatten)]
    pub cycle: HealthSnapshot,
}

/// Most recently updated first.
async fn get_matches<S: MatchStore>(
    State(state): State<ApiState<S>>,
    Query(params): Query<MatchesQuery>,
) -> Result<Json<Vec<PersistedMatch>>, AppError> {
    let matches = state
        .store
        .list_matches()
        .await?
        .into_iter()
        .filter(|m| {
            params
                .sport
                .as_deref()
                .map_or(true, |s| m.sport.eq_ignore_ascii_case(s))
        })
        .collect();
    Ok(Json(matches))
}

async fn get_match<S: MatchStore>(
    State(state): State<ApiState<S>>,
    Path(id): Path<String>,
) -> Result<Json<PersistedMatch>, AppError> {
    state
        .store
        .get_match(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("match {id}")))
}

async fn get_health<S: MatchStore>(State(state): State<ApiState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        subscribers: state.bus.subscriber_count(),
        cycle: state.health.snapshot(),
    })
}

async fn get_stats_latency<S: MatchStore>(State(state): State<ApiState<S>>) -> Json<Vec<LatencySummary>> {
    Json(state.latency.summaries())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::response::IntoResponse;
    use axum::http::StatusCode;

    use crate::state::MemoryMatchStore;
    use crate::types::{Odds, TeamPair};

    fn stored(id: &str, home: &str, sport: &str, updated_at_ns: i64) -> PersistedMatch {
        PersistedMatch {
            id: id.to_string(),
            teams: TeamPair::new(home, "Away").unwrap(),
            score: "1-0".to_string(),
            odds: Odds { home: 1.5, draw: 3.0, away: 5.0 },
            time: "30'".to_string(),
            sport: sport.to_string(),
            updated_at_ns,
        }
    }

    async fn state_with(matches: &[PersistedMatch]) -> ApiState<MemoryMatchStore> {
        let store = MemoryMatchStore::new();
        for m in matches {
            store.insert(m).await.unwrap();
        }
        ApiState {
            store,
            bus: NotificationBus::new(8),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        }
    }

    #[tokio::test]
    async fn lists_matches_with_optional_sport_filter() {
        let state = state_with(&[
            stored("a", "Arsenal", "soccer", 1),
            stored("b", "Nadal", "tennis", 2),
            stored("c", "Chelsea", "soccer", 3),
        ])
        .await;

        let Json(all) = get_matches(State(state.clone()), Query(MatchesQuery::default()))
            .await
            .unwrap();
        assert_eq!(all.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["c", "b", "a"]);

        let Json(soccer) = get_matches(
            State(state),
            Query(MatchesQuery { sport: Some("Soccer".to_string()) }),
        )
        .await
        .unwrap();
        assert_eq!(soccer.len(), 2);
        assert!(soccer.iter().all(|m| m.sport == "soccer"));
    }

    #[tokio::test]
    async fn unknown_match_id_is_404() {
        let state = state_with(&[stored("a", "Arsenal", "soccer", 1)]).await;

        let Json(found) = get_match(State(state.clone()), Path("a".to_string())).await.unwrap();
        assert_eq!(found.teams.home(), "Arsenal");

        let err = get_match(State(state), Path("missing".to_string())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_cycles_and_subscribers() {
        let state = state_with(&[]).await;
        state.health.record_cycle(42, 1_500, 7, 1, 0);
        let _rx = state.bus.subscribe();

        let Json(health) = get_health(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.subscribers, 1);
        assert_eq!(health.cycle.cycles_completed, 1);
        assert_eq!(health.cycle.last_unique_records, 7);

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["last_cycle_duration_ms"], 1_500);
    }

    #[tokio::test]
    async fn latency_endpoint_returns_per_sport_summaries() {
        let state = state_with(&[]).await;
        state.latency.record("soccer", Duration::from_millis(800));

        let Json(stats) = get_stats_latency(State(state)).await;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].sport, "soccer");
    }
}
