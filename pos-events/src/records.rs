//! Records served by the POS backend.
//!
//! Tables, orders and profile data are fetched wholesale from the REST API
//! and patched in place by live events. Fields the backend may omit are
//! `#[serde(default)]` so partial payloads still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A dining table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    /// Backend identifier
    pub id: u64,

    /// Number printed on the table
    #[serde(default)]
    pub number: Option<u32>,

    /// Seats
    #[serde(default)]
    pub capacity: Option<u32>,

    /// Current status
    #[serde(default)]
    pub status: TableStatus,
}

impl Table {
    /// Apply a partial update. Returns true if anything changed.
    pub fn apply(&mut self, patch: &TablePatch) -> bool {
        let before = self.clone();
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(number) = patch.number {
            self.number = Some(number);
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = Some(capacity);
        }
        *self != before
    }

    /// Label shown on cards ("Table 4", or the id when unnumbered)
    pub fn label(&self) -> String {
        match self.number {
            Some(n) => format!("Table {}", n),
            None => format!("Table #{}", self.id),
        }
    }
}

/// Partial table update carried by `table_update` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TablePatch {
    pub id: u64,
    #[serde(default)]
    pub status: Option<TableStatus>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

/// Table status enumeration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Available,
    Occupied,
    /// Guests left, waiting for a cleaner
    Dirty,
    Reserved,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Occupied => write!(f, "occupied"),
            Self::Dirty => write!(f, "dirty"),
            Self::Reserved => write!(f, "reserved"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl From<&str> for TableStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "available" | "free" => Self::Available,
            "occupied" => Self::Occupied,
            "dirty" | "needs_cleaning" => Self::Dirty,
            "reserved" => Self::Reserved,
            _ => Self::Unknown,
        }
    }
}

/// A kitchen order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: u64,

    #[serde(default)]
    pub table_id: Option<u64>,

    #[serde(default)]
    pub table_number: Option<u32>,

    #[serde(default)]
    pub status: OrderStatus,

    #[serde(default)]
    pub items: Vec<OrderItem>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Apply a partial update. Returns true if anything changed.
    pub fn apply(&mut self, patch: &OrderPatch) -> bool {
        let before = self.clone();
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(items) = &patch.items {
            self.items = items.clone();
        }
        *self != before
    }

    /// Total number of dishes across all items
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// One line of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
}

fn default_quantity() -> u32 {
    1
}

/// Partial order update carried by `order_*` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderPatch {
    #[serde(alias = "order_id")]
    pub id: u64,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub items: Option<Vec<OrderItem>>,
}

/// Order (and order item) status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Cooking,
    Ready,
    Served,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether the kitchen still has work to do on it
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Cooking)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Cooking => write!(f, "cooking"),
            Self::Ready => write!(f, "ready"),
            Self::Served => write!(f, "served"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Summary numbers for the admin overview.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub pending_orders: u64,
    #[serde(default)]
    pub active_tables: u64,
    #[serde(default)]
    pub total_tables: u64,
    #[serde(default)]
    pub revenue_today: f64,
}

/// Role attached to a login. Decides which dashboard the user lands on.
///
/// Decoding goes through `FromStr`, so `"chef"` and `"waiter"` are accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub enum UserRole {
    Admin,
    Chef,
    Cleaner,
    Staff,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "Admin"),
            Self::Chef => write!(f, "Chef"),
            Self::Cleaner => write!(f, "Cleaner"),
            Self::Staff => write!(f, "Staff"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "chef" => Ok(Self::Chef),
            "cleaner" => Ok(Self::Cleaner),
            "staff" | "waiter" => Ok(Self::Staff),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl TryFrom<String> for UserRole {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
