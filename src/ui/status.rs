//! Loading, error and overview panels.

use dioxus::prelude::*;
use pos_events::DashboardStats;

/// Placeholder shown while a page loads.
#[component]
pub fn LoadingPanel() -> Element {
    rsx! {
        div { class: "card p-6 loading", aria_busy: "true", "Loading..." }
    }
}

/// Inline error replacing the content area.
#[component]
pub fn ErrorPanel(message: String) -> Element {
    rsx! {
        div { class: "card p-6 error-state",
            h2 { class: "text-xl font-semibold status-err", "Something went wrong" }
            p { class: "text-muted text-sm", "{message}" }
        }
    }
}

/// Admin overview cards.
#[component]
pub fn StatsCards(stats: DashboardStats) -> Element {
    let revenue = format!("{:.2}", stats.revenue_today);

    rsx! {
        div { class: "stats-grid",
            div { class: "card p-4 stat",
                span { class: "font-semibold", "Orders today" }
                p { class: "text-2xl", "{stats.total_orders}" }
            }
            div { class: "card p-4 stat",
                span { class: "font-semibold", "Pending orders" }
                p { class: "text-2xl", "{stats.pending_orders}" }
            }
            div { class: "card p-4 stat",
                span { class: "font-semibold", "Active tables" }
                p { class: "text-2xl", "{stats.active_tables} / {stats.total_tables}" }
            }
            div { class: "card p-4 stat",
                span { class: "font-semibold", "Revenue" }
                p { class: "text-2xl", "{revenue}" }
            }
        }
    }
}
