//! Kitchen queue and pending items.

use dioxus::prelude::*;
use pos_events::Order;

use crate::api::PendingItem;
use crate::pages::kitchen::CookingStep;

#[component]
pub fn KitchenQueue(orders: Vec<Order>) -> Element {
    if orders.is_empty() {
        return rsx! {
            div { class: "card p-6", "No orders in the kitchen." }
        };
    }

    rsx! {
        div { class: "kitchen-grid",
            for order in orders {
                OrderCard { key: "{order.id}", order: order.clone() }
            }
        }
    }
}

#[component]
fn OrderCard(order: Order) -> Element {
    let status = order.status.to_string();
    let table = order
        .table_number
        .map(|n| format!("Table {}", n))
        .unwrap_or_else(|| "Takeaway".to_string());
    let placed = order
        .created_at
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default();
    let step = CookingStep::for_status(order.status).map(|s| (s.path(), s.label()));

    rsx! {
        div { class: "order-card {status}", "data-order-id": "{order.id}",
            div { class: "flex items-center gap-2 mb-3",
                span { class: "font-semibold text-lg", "Order #{order.id}" }
                span { class: "badge badge-secondary", "{table}" }
                if !placed.is_empty() {
                    small { "{placed}" }
                }
            }
            ul { class: "order-items",
                for item in order.items.iter() {
                    li { key: "{item.id}",
                        "{item.quantity} × {item.name}"
                        if let Some(notes) = &item.notes {
                            small { class: "item-notes", " ({notes})" }
                        }
                    }
                }
            }
            if let Some((path, label)) = step {
                button { class: "btn btn-primary", "data-action": "{path}", "{label}" }
            }
        }
    }
}

#[component]
pub fn PendingList(items: Vec<PendingItem>) -> Element {
    rsx! {
        table { class: "w-full pending-items",
            thead {
                tr { class: "border-b border-default",
                    th { class: "text-left py-2 px-3 font-semibold", "Order" }
                    th { class: "text-left py-2 px-3 font-semibold", "Table" }
                    th { class: "text-left py-2 px-3 font-semibold", "Dish" }
                    th { class: "text-left py-2 px-3 font-semibold", "Qty" }
                }
            }
            tbody {
                for pending in items {
                    tr { key: "{pending.order_id}-{pending.item.id}", class: "border-b border-default",
                        td { class: "py-2 px-3", "#{pending.order_id}" }
                        td { class: "py-2 px-3",
                            if let Some(n) = pending.table_number {
                                "{n}"
                            } else {
                                "—"
                            }
                        }
                        td { class: "py-2 px-3", "{pending.item.name}" }
                        td { class: "py-2 px-3", "{pending.item.quantity}" }
                    }
                }
            }
        }
    }
}
