//! Inbound WebSocket protocol.
//!
//! The backend pushes `{"event": "...", "data": {...}}` envelopes (some
//! feeds use `type` instead of `event`). The client maps the free-form
//! name onto the closed [`EventKind`] set before anything is dispatched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw envelope as it arrives on the socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Event name, e.g. "table_update" or "order_status_update"
    #[serde(alias = "type")]
    pub event: String,

    /// Event payload
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Resolve the envelope into a typed event.
    ///
    /// Returns `None` for names that map to no known kind.
    pub fn into_event(self) -> Option<LiveEvent> {
        let (kind, action) = EventKind::resolve(&self.event)?;
        Some(LiveEvent {
            kind,
            action,
            data: self.data,
        })
    }
}

/// Closed set of events the dashboards react to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A table changed status, capacity or number
    TableUpdate,
    /// An existing order changed
    OrderUpdate,
    /// A new order was placed
    NewOrder,
    /// A single order line changed
    OrderItemUpdate,
    /// The kitchen queue changed as a whole
    KitchenUpdate,
    /// Free-form notification for the badge
    Notification,
    /// Raised locally once reconnection gives up; never sent by the backend
    ConnectionFailed,
}

impl EventKind {
    /// All kinds, in declaration order
    pub const ALL: [EventKind; 7] = [
        Self::TableUpdate,
        Self::OrderUpdate,
        Self::NewOrder,
        Self::OrderItemUpdate,
        Self::KitchenUpdate,
        Self::Notification,
        Self::ConnectionFailed,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableUpdate => "table_update",
            Self::OrderUpdate => "order_update",
            Self::NewOrder => "new_order",
            Self::OrderItemUpdate => "order_item_update",
            Self::KitchenUpdate => "kitchen_update",
            Self::Notification => "notification",
            Self::ConnectionFailed => "connection_failed",
        }
    }

    /// Map a wire name to a kind.
    ///
    /// Exact names win. Otherwise the name is read as `<entity>_<action>`
    /// and the entity decides the kind, with the rest kept as the action
    /// (`order_status_update` is an `OrderUpdate` with action
    /// `status_update`). `connection_failed` is local-only and never
    /// accepted from the wire.
    pub fn resolve(name: &str) -> Option<(EventKind, Option<String>)> {
        let name = name.trim().to_lowercase();
        if let Some(kind) = Self::ALL
            .into_iter()
            .filter(|k| *k != Self::ConnectionFailed)
            .find(|k| k.as_str() == name)
        {
            return Some((kind, None));
        }

        let (entity, action) = name.split_once('_')?;
        if action.is_empty() {
            return None;
        }
        let kind = match entity {
            "table" | "tables" => Self::TableUpdate,
            "order" | "orders" => Self::OrderUpdate,
            "item" | "items" => Self::OrderItemUpdate,
            "kitchen" => Self::KitchenUpdate,
            _ => return None,
        };
        Some((kind, Some(action.to_string())))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed event ready for dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveEvent {
    pub kind: EventKind,
    /// Action split off a generalized name, if any
    pub action: Option<String>,
    /// Envelope payload, untouched
    pub data: Value,
}

impl LiveEvent {
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self {
            kind,
            action: None,
            data,
        }
    }

    /// Decode the payload into a concrete record type
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{TablePatch, TableStatus};

    #[test]
    fn test_exact_name_resolves_without_action() {
        assert_eq!(
            EventKind::resolve("table_update"),
            Some((EventKind::TableUpdate, None))
        );
        assert_eq!(
            EventKind::resolve("new_order"),
            Some((EventKind::NewOrder, None))
        );
    }

    #[test]
    fn test_generalized_name_extracts_action() {
        assert_eq!(
            EventKind::resolve("order_status_update"),
            Some((EventKind::OrderUpdate, Some("status_update".to_string())))
        );
        assert_eq!(
            EventKind::resolve("kitchen_refresh"),
            Some((EventKind::KitchenUpdate, Some("refresh".to_string())))
        );
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        assert_eq!(EventKind::resolve("weather_report"), None);
        assert_eq!(EventKind::resolve("ping"), None);
        assert_eq!(EventKind::resolve("order_"), None);
        assert_eq!(EventKind::resolve("connection_failed"), None);
    }

    #[test]
    fn test_envelope_accepts_type_alias() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"type":"order_status_update","data":{"id":4}}"#).unwrap();
        let event = envelope.into_event().unwrap();
        assert_eq!(event.kind, EventKind::OrderUpdate);
        assert_eq!(event.action.as_deref(), Some("status_update"));
        assert_eq!(event.data["id"], 4);
    }

    #[test]
    fn test_payload_decodes_into_record() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"event":"table_update","data":{"id":1,"status":"occupied"}}"#)
                .unwrap();
        let event = envelope.into_event().unwrap();
        let patch: TablePatch = event.payload().unwrap();
        assert_eq!(patch.id, 1);
        assert_eq!(patch.status, Some(TableStatus::Occupied));
    }
}
