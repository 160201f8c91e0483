//! Table status grid.

use dioxus::prelude::*;
use pos_events::Table;

use crate::pages::tables::TableAction;

#[component]
pub fn TableGrid(tables: Vec<Table>) -> Element {
    if tables.is_empty() {
        return rsx! {
            div { class: "card p-6", "No tables configured." }
        };
    }

    rsx! {
        div { class: "table-grid",
            for table in tables {
                TableCard { key: "{table.id}", table: table.clone() }
            }
        }
    }
}

/// One card per table; the status doubles as the card's CSS class.
#[component]
fn TableCard(table: Table) -> Element {
    let status = table.status.to_string();
    let label = table.label();
    let action = TableAction::for_status(table.status);

    rsx! {
        div { class: "table-card {status}", "data-table-id": "{table.id}",
            div { class: "flex items-center gap-2 mb-3",
                span { class: "font-semibold text-lg", "{label}" }
                span { class: "badge", "{status}" }
            }
            if let Some(capacity) = table.capacity {
                p { class: "text-sm text-muted", "{capacity} seats" }
            }
            if let Some(action) = action {
                button {
                    class: "btn btn-primary",
                    "data-action": "{action.target}",
                    "{action.label}"
                }
            }
        }
    }
}
