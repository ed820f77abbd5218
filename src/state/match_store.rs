use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Result;
use crate::types::{PersistedMatch, TeamPair};

/// Document store for match state, keyed by id with a unique
/// (teams, sport) identity. The reconciler is its only writer.
pub trait MatchStore: Send + Sync + 'static {
    fn find_by_identity(
        &self,
        teams: &TeamPair,
        sport: &str,
    ) -> impl Future<Output = Result<Option<PersistedMatch>>> + Send;

    fn insert(&self, m: &PersistedMatch) -> impl Future<Output = Result<()>> + Send;

    /// Overwrites the stored document with the same id.
    fn update(&self, m: &PersistedMatch) -> impl Future<Output = Result<()>> + Send;

    fn list_matches(&self) -> impl Future<Output = Result<Vec<PersistedMatch>>> + Send;

    fn get_match(&self, id: &str) -> impl Future<Output = Result<Option<PersistedMatch>>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryMatchStore
// ---------------------------------------------------------------------------

type IdentityKey = (TeamPair, String);

/// Process-local store. State is lost on restart.
#[derive(Default)]
pub struct MemoryMatchStore {
    /// id → document
    matches: DashMap<String, PersistedMatch>,
    /// (teams, sport) → id
    identity: DashMap<IdentityKey, String>,
}

impl MemoryMatchStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

impl MatchStore for MemoryMatchStore {
    async fn find_by_identity(&self, teams: &TeamPair, sport: &str) -> Result<Option<PersistedMatch>> {
        let key = (teams.clone(), sport.to_string());
        let Some(id) = self.identity.get(&key).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        Ok(self.matches.get(&id).map(|m| m.clone()))
    }

    async fn insert(&self, m: &PersistedMatch) -> Result<()> {
        self.identity
            .insert((m.teams.clone(), m.sport.clone()), m.id.clone());
        self.matches.insert(m.id.clone(), m.clone());
        Ok(())
    }

    async fn update(&self, m: &PersistedMatch) -> Result<()> {
        self.matches.insert(m.id.clone(), m.clone());
        Ok(())
    }

    async fn list_matches(&self) -> Result<Vec<PersistedMatch>> {
        let mut all: Vec<PersistedMatch> = self.matches.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.updated_at_ns.cmp(&a.updated_at_ns));
        Ok(all)
    }

    async fn get_match(&self, id: &str) -> Result<Option<PersistedMatch>> {
        Ok(self.matches.get(id).map(|m| m.clone()))
    }
}
