//! Plan change events
//!
//! Mutations at the persistence boundary publish here after commit. Views that
//! show plan or meal aggregates subscribe and refetch instead of every call
//! site remembering to invalidate a cache.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::Macros;

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CAPACITY: usize = 256;

/// Something that changed a plan's aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlanEvent {
    /// A meal's ingredient list and totals were rewritten
    MealTotalsChanged { meal_id: i64, totals: Macros },
    /// A plan slot now points at a different meal
    MealSwapped {
        plan_id: i64,
        old_meal_id: i64,
        new_meal_id: i64,
    },
}

/// Broadcast channel for plan events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlanEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlanEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns how many subscribers received it
    pub fn publish(&self, event: PlanEvent) -> usize {
        tracing::debug!(?event, "Publishing plan event");
        // No subscribers is not an error, nobody needs to refetch
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Log every event until the bus is dropped
pub async fn log_events(mut receiver: broadcast::Receiver<PlanEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => tracing::info!(?event, "Plan changed"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event listener lagged, some events were dropped")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = PlanEvent::MealTotalsChanged {
            meal_id: 4,
            totals: Macros::new(500.0, 30.0, 50.0, 10.0),
        };
        assert_eq!(bus.publish(event.clone()), 2);

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        let delivered = bus.publish(PlanEvent::MealSwapped {
            plan_id: 1,
            old_meal_id: 2,
            new_meal_id: 3,
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(PlanEvent::MealSwapped {
            plan_id: 1,
            old_meal_id: 2,
            new_meal_id: 3,
        })
        .unwrap();
        assert_eq!(json["event"], "meal_swapped");
        assert_eq!(json["new_meal_id"], 3);
    }
}
