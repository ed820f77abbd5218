use tokio::sync::broadcast;
use tracing::debug;

use crate::types::ChangeEvent;

/// Fan-out of change events to whoever is listening right now.
///
/// Backed by a tokio broadcast channel: no replay for late subscribers, and a
/// subscriber that falls more than `capacity` events behind skips ahead.
#[derive(Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns the number of subscribers the event reached (0 = dropped).
    pub fn publish(&self, event: ChangeEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("No live subscribers, change event dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeKind, Odds, PersistedMatch, TeamPair};

    fn event(id: &str) -> ChangeEvent {
        ChangeEvent {
            kind: ChangeKind::Created,
            snapshot: PersistedMatch {
                id: id.to_string(),
                teams: TeamPair::new("A", "B").unwrap(),
                score: "0-0".to_string(),
                odds: Odds::default(),
                time: String::new(),
                sport: "soccer".to_string(),
                updated_at_ns: 1,
            },
        }
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = NotificationBus::new(8);
        assert_eq!(bus.publish(event("x")), 0);
    }

    #[tokio::test]
    async fn every_subscriber_gets_each_event() {
        let bus = NotificationBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish(event("m1")), 2);
        assert_eq!(a.recv().await.unwrap().snapshot.id, "m1");
        assert_eq!(b.recv().await.unwrap().snapshot.id, "m1");
    }

    #[tokio::test]
    async fn late_subscriber_sees_no_history() {
        let bus = NotificationBus::new(8);
        let _early = bus.subscribe();
        bus.publish(event("old"));

        let mut late = bus.subscribe();
        bus.publish(event("new"));
        assert_eq!(late.recv().await.unwrap().snapshot.id, "new");
    }
}
