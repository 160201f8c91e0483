//! Dioxus components for the dashboard content area.
//!
//! Pages never build HTML by hand: they hand records to these components
//! and store the server-rendered markup in the shell.

use dioxus::prelude::*;

pub mod kitchen;
pub mod status;
pub mod tables;

pub use kitchen::{KitchenQueue, PendingList};
pub use status::{ErrorPanel, LoadingPanel, StatsCards};
pub use tables::TableGrid;

use crate::api::PendingItem;
use pos_events::{DashboardStats, Order, Table};

fn render(element: Element) -> String {
    dioxus_ssr::render_element(element)
}

pub fn render_loading() -> String {
    render(rsx! { LoadingPanel {} })
}

pub fn render_error(message: &str) -> String {
    let message = message.to_string();
    render(rsx! { ErrorPanel { message } })
}

pub fn render_tables(tables: &[Table]) -> String {
    let tables = tables.to_vec();
    render(rsx! { TableGrid { tables } })
}

pub fn render_kitchen(orders: &[Order]) -> String {
    let orders = orders.to_vec();
    render(rsx! { KitchenQueue { orders } })
}

pub fn render_pending(items: &[PendingItem]) -> String {
    let items = items.to_vec();
    render(rsx! { PendingList { items } })
}

pub fn render_stats(stats: &DashboardStats) -> String {
    let stats = stats.clone();
    render(rsx! { StatsCards { stats } })
}
