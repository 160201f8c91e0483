//! Wire protocol types for the POS dashboards.
//!
//! This crate defines the types that cross the boundary between the
//! backend and the dashboard client:
//! - REST records (tables, orders, stats, roles)
//! - the inbound WebSocket envelope and its typed event kinds
//! - outbound socket messages
//!
//! # Modules
//! - [`records`] - Table, order and profile records
//! - [`events`] - Inbound envelope, `EventKind` and `LiveEvent`
//! - [`outbound`] - Messages the client sends over the socket

pub mod events;
pub mod outbound;
pub mod records;

// Re-export commonly used types at crate root
pub use events::{Envelope, EventKind, LiveEvent};
pub use outbound::{OutboundMessage, SubscribeMessage};
pub use records::{
    DashboardStats, Order, OrderItem, OrderPatch, OrderStatus, Table, TablePatch, TableStatus,
    UserRole,
};
