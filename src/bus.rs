//! Broadcast bus for live events.
//!
//! The live client publishes every dispatched event here so async page
//! tasks can `subscribe()` without registering callbacks.

use pos_events::LiveEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

const BUS_CAPACITY: usize = 256;

pub type SharedBus = Arc<EventBus>;

pub struct EventBus {
    tx: broadcast::Sender<LiveEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn shared() -> SharedBus {
        Arc::new(Self::new())
    }

    /// Publish to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: LiveEvent) {
        if self.tx.send(event).is_err() {
            debug!("No bus subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pos_events::EventKind;

    #[tokio::test]
    async fn test_subscribers_receive_in_publish_order() {
        let bus = EventBus::shared();
        let mut rx = bus.subscribe();

        bus.publish(LiveEvent::new(EventKind::NewOrder, serde_json::json!({"id": 1})));
        bus.publish(LiveEvent::new(EventKind::TableUpdate, serde_json::json!({"id": 2})));

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::NewOrder);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TableUpdate);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(LiveEvent::new(EventKind::Notification, serde_json::Value::Null));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
