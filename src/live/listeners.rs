//! Ordered listener registry keyed by event kind.

use pos_events::{EventKind, LiveEvent};
use std::sync::Arc;

pub type Listener = Arc<dyn Fn(&LiveEvent) + Send + Sync>;

/// Handle returned by `add_event_listener`, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, EventKind, Listener)>,
}

impl ListenerRegistry {
    pub fn add(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, kind, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Listeners for `kind`, in registration order
    pub fn matching(&self, kind: EventKind) -> Vec<Listener> {
        self.listeners
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| l.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_matching_preserves_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        for n in 0..3 {
            let order = order.clone();
            registry.add(
                EventKind::NewOrder,
                Arc::new(move |_| order.lock().unwrap().push(n)),
            );
        }
        registry.add(EventKind::TableUpdate, Arc::new(|_| panic!("wrong kind")));

        let event = LiveEvent::new(EventKind::NewOrder, serde_json::Value::Null);
        for listener in registry.matching(EventKind::NewOrder) {
            listener(&event);
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_only_drops_that_listener() {
        let mut registry = ListenerRegistry::default();
        let first = registry.add(EventKind::Notification, Arc::new(|_| {}));
        registry.add(EventKind::Notification, Arc::new(|_| {}));

        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        assert_eq!(registry.matching(EventKind::Notification).len(), 1);
    }
}
