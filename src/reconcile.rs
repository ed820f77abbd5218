use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::bus::NotificationBus;
use crate::error::Result;
use crate::state::MatchStore;
use crate::types::{now_ns, ChangeEvent, ChangeKind, MatchRecord, PersistedMatch};

/// Result of reconciling one record inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Created { id: String },
    Updated { id: String },
    Failed { teams: String, sport: String, error: String },
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub outcomes: Vec<RecordOutcome>,
}

impl ReconcileSummary {
    fn push(&mut self, outcome: RecordOutcome) {
        match &outcome {
            RecordOutcome::Created { .. } => self.created += 1,
            RecordOutcome::Updated { .. } => self.updated += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Merges scraped records into the store and announces every write.
pub struct Reconciler<S> {
    store: Arc<S>,
    bus: NotificationBus,
}

impl<S: MatchStore> Reconciler<S> {
    pub fn new(store: Arc<S>, bus: NotificationBus) -> Self {
        Self { store, bus }
    }

    /// Update-in-place on a known (teams, sport), insert otherwise. The event
    /// is published only after the write succeeded.
    pub async fn reconcile(&self, record: MatchRecord) -> Result<ChangeEvent> {
        let now = now_ns() as i64;
        let event = match self.store.find_by_identity(&record.teams, &record.sport).await? {
            Some(mut existing) => {
                existing.apply(record, now);
                self.store.update(&existing).await?;
                ChangeEvent { kind: ChangeKind::Updated, snapshot: existing }
            }
            None => {
                let created = PersistedMatch::from_record(Uuid::new_v4().to_string(), record, now);
                self.store.insert(&created).await?;
                ChangeEvent { kind: ChangeKind::Created, snapshot: created }
            }
        };

        let delivered = self.bus.publish(event.clone());
        debug!(
            match_id = %event.snapshot.id,
            kind = %event.kind,
            delivered,
            "Reconciled {} ({})",
            event.snapshot.teams,
            event.snapshot.sport,
        );
        Ok(event)
    }

    /// Reconciles a batch. With `fail_fast` the first failed write aborts the
    /// rest and is returned as the error; otherwise each failure is recorded
    /// and the batch continues.
    pub async fn reconcile_all(&self, records: Vec<MatchRecord>, fail_fast: bool) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();
        for record in records {
            let teams = record.teams.to_string();
            let sport = record.sport.clone();
            match self.reconcile(record).await {
                Ok(event) => summary.push(match event.kind {
                    ChangeKind::Created => RecordOutcome::Created { id: event.snapshot.id },
                    ChangeKind::Updated => RecordOutcome::Updated { id: event.snapshot.id },
                }),
                Err(e) if fail_fast => return Err(e),
                Err(e) => {
                    warn!(sport = %sport, "Reconcile failed for {teams}: {e}");
                    summary.push(RecordOutcome::Failed { teams, sport, error: e.to_string() });
                }
            }
        }
        Ok(summary)
    }
}
