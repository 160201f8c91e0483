//! Dashboard pages.
//!
//! Each page fetches its own data through the API client, renders into the
//! shell, and keeps itself current from live events while mounted.

pub mod kitchen;
pub mod overview;
pub mod tables;

pub use kitchen::{CookingStep, KitchenPage, PendingPage};
pub use overview::OverviewPage;
pub use tables::{TableAction, TablesPage};
