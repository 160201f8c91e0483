//! Kitchen display and pending items.
//!
//! `KitchenPage` shows every open order with its next cooking step.
//! Order patches are applied in place; new orders and kitchen-wide
//! updates trigger a refetch since their payloads are not complete orders.

use async_trait::async_trait;
use pos_events::{EventKind, LiveEvent, Order, OrderPatch, OrderStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, PendingItem};
use crate::live::LiveUpdateClient;
use crate::router::Page;
use crate::shell::{Shell, ToastLevel};
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookingStep {
    Start,
    Finish,
}

impl CookingStep {
    pub fn for_status(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Pending => Some(Self::Start),
            OrderStatus::Cooking => Some(Self::Finish),
            _ => None,
        }
    }

    /// Last path segment of the order endpoint
    pub fn path(self) -> &'static str {
        match self {
            Self::Start => "start-cooking",
            Self::Finish => "finish-cooking",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "Start Cooking",
            Self::Finish => "Finish Cooking",
        }
    }
}

/// Open orders, oldest first
#[derive(Debug, Default)]
pub struct KitchenBoard {
    orders: Vec<Order>,
}

impl KitchenBoard {
    pub fn replace(&mut self, mut orders: Vec<Order>) {
        orders.retain(|o| o.status.is_open());
        orders.sort_by_key(|o| (o.created_at, o.id));
        self.orders = orders;
    }

    /// Returns None when the order is not on the board.
    pub fn apply_patch(&mut self, patch: &OrderPatch) -> Option<bool> {
        let index = self.orders.iter().position(|o| o.id == patch.id)?;
        let changed = self.orders[index].apply(patch);
        if !self.orders[index].status.is_open() {
            self.orders.remove(index);
            return Some(true);
        }
        Some(changed)
    }

    pub fn get(&self, id: u64) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}

pub struct KitchenPage {
    api: ApiClient,
    shell: Arc<dyn Shell>,
    board: Mutex<KitchenBoard>,
    mounted: AtomicBool,
}

impl KitchenPage {
    pub fn new(api: ApiClient, shell: Arc<dyn Shell>) -> Arc<Self> {
        Arc::new(Self {
            api,
            shell,
            board: Mutex::new(KitchenBoard::default()),
            mounted: AtomicBool::new(false),
        })
    }

    fn board(&self) -> MutexGuard<'_, KitchenBoard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn attach(self: &Arc<Self>, live: &LiveUpdateClient) {
        let page = Arc::clone(self);
        live.add_event_listener(EventKind::OrderUpdate, move |event| {
            page.handle_order_update(event);
        });
        for kind in [EventKind::NewOrder, EventKind::KitchenUpdate] {
            let page = Arc::clone(self);
            live.add_event_listener(kind, move |event| {
                debug!(kind = %event.kind, "Kitchen refetch");
                page.spawn_refresh();
            });
        }
    }

    pub fn orders(&self) -> Vec<Order> {
        self.board().orders().to_vec()
    }

    fn render(&self) {
        let html = ui::render_kitchen(self.board().orders());
        self.shell.set_content(html);
    }

    fn handle_order_update(self: &Arc<Self>, event: &LiveEvent) {
        let patch: OrderPatch = match event.payload() {
            Ok(patch) => patch,
            Err(e) => {
                warn!("Ignoring order update: {}", e);
                return;
            }
        };
        match self.board().apply_patch(&patch) {
            Some(true) => {}
            Some(false) => return,
            None => {
                // New to this board, the patch alone can't render it
                if patch.status.is_some_and(|s| s.is_open()) {
                    self.spawn_refresh();
                }
                return;
            }
        }
        if self.mounted.load(Ordering::SeqCst) {
            self.render();
        }
    }

    fn spawn_refresh(self: &Arc<Self>) {
        if !self.mounted.load(Ordering::SeqCst) {
            return;
        }
        let page = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = page.refresh().await {
                warn!("Kitchen refresh failed: {}", e);
            }
        });
    }

    /// Refetch the display and re-render if still mounted
    pub async fn refresh(&self) -> anyhow::Result<()> {
        let orders = self.api.kitchen_display().await?;
        self.board().replace(orders);
        if self.mounted.load(Ordering::SeqCst) {
            self.render();
        }
        Ok(())
    }

    /// Advance `order_id` one cooking step.
    pub async fn advance(&self, order_id: u64) -> bool {
        let Some(step) = self
            .board()
            .get(order_id)
            .and_then(|o| CookingStep::for_status(o.status))
        else {
            warn!(order = order_id, "Order has no cooking step");
            return false;
        };

        let result = match step {
            CookingStep::Start => self.api.start_cooking(order_id).await,
            CookingStep::Finish => self.api.finish_cooking(order_id).await,
        };
        if let Err(e) = result {
            warn!(order = order_id, step = step.path(), "Cooking step failed: {}", e);
            self.shell.notify(
                ToastLevel::Error,
                &format!("Could not update order #{}: {}", order_id, e),
            );
            return false;
        }

        info!(order = order_id, step = step.path(), "Cooking step done");
        let status = match step {
            CookingStep::Start => OrderStatus::Cooking,
            CookingStep::Finish => OrderStatus::Ready,
        };
        self.board().apply_patch(&OrderPatch {
            id: order_id,
            status: Some(status),
            items: None,
        });
        if let Err(e) = self.refresh().await {
            warn!("Kitchen refresh failed: {}", e);
        }
        self.shell.notify(
            ToastLevel::Success,
            &format!("Order #{} is {}", order_id, status),
        );
        true
    }
}

#[async_trait]
impl Page for KitchenPage {
    async fn initialize(&self) -> anyhow::Result<()> {
        let orders = self.api.kitchen_display().await?;
        debug!(count = orders.len(), "Kitchen orders loaded");
        self.board().replace(orders);
        self.render();
        Ok(())
    }

    async fn on_mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }

    async fn on_unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }
}

/// Flat list of items still waiting to be cooked.
pub struct PendingPage {
    api: ApiClient,
    shell: Arc<dyn Shell>,
    mounted: AtomicBool,
}

impl PendingPage {
    pub fn new(api: ApiClient, shell: Arc<dyn Shell>) -> Arc<Self> {
        Arc::new(Self {
            api,
            shell,
            mounted: AtomicBool::new(false),
        })
    }

    pub fn attach(self: &Arc<Self>, live: &LiveUpdateClient) {
        for kind in [
            EventKind::NewOrder,
            EventKind::OrderItemUpdate,
            EventKind::KitchenUpdate,
        ] {
            let page = Arc::clone(self);
            live.add_event_listener(kind, move |_| {
                if !page.mounted.load(Ordering::SeqCst) {
                    return;
                }
                let page = Arc::clone(&page);
                tokio::spawn(async move {
                    if let Err(e) = page.refresh().await {
                        warn!("Pending items refresh failed: {}", e);
                    }
                });
            });
        }
    }

    /// Refetch the list and re-render if still mounted
    pub async fn refresh(&self) -> anyhow::Result<Vec<PendingItem>> {
        let items = self.api.pending_items().await?;
        if self.mounted.load(Ordering::SeqCst) {
            self.shell.set_content(ui::render_pending(&items));
        }
        Ok(items)
    }
}

#[async_trait]
impl Page for PendingPage {
    async fn initialize(&self) -> anyhow::Result<()> {
        let items = self.api.pending_items().await?;
        debug!(count = items.len(), "Pending items loaded");
        self.shell.set_content(ui::render_pending(&items));
        Ok(())
    }

    async fn on_mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }

    async fn on_unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }
}
