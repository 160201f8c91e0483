//! Table status board.
//!
//! Fetches all tables on initialize, then keeps the grid current from
//! `table_update` events. Each card offers the one status change that
//! makes sense from where the table is now.

use async_trait::async_trait;
use pos_events::{EventKind, LiveEvent, Table, TablePatch, TableStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::live::LiveUpdateClient;
use crate::router::Page;
use crate::shell::{Shell, ToastLevel};
use crate::ui;

/// Next status offered on a table card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableAction {
    pub label: &'static str,
    pub target: TableStatus,
}

impl TableAction {
    pub fn for_status(status: TableStatus) -> Option<Self> {
        let (label, target) = match status {
            TableStatus::Available => ("Occupy", TableStatus::Occupied),
            TableStatus::Occupied => ("Mark Dirty", TableStatus::Dirty),
            TableStatus::Dirty => ("Mark Clean", TableStatus::Available),
            TableStatus::Reserved => ("Seat Guests", TableStatus::Occupied),
            TableStatus::Unknown => return None,
        };
        Some(Self { label, target })
    }
}

/// Tables in display order
#[derive(Debug, Default)]
pub struct TableBoard {
    tables: Vec<Table>,
}

impl TableBoard {
    pub fn replace(&mut self, mut tables: Vec<Table>) {
        tables.sort_by_key(|t| (t.number.unwrap_or(u32::MAX), t.id));
        self.tables = tables;
    }

    /// Patch the matching table in place. An unseen id with a status is
    /// added so the board never waits for a refetch.
    pub fn apply_patch(&mut self, patch: &TablePatch) -> bool {
        if let Some(table) = self.tables.iter_mut().find(|t| t.id == patch.id) {
            return table.apply(patch);
        }
        let Some(status) = patch.status else {
            return false;
        };
        let mut tables = std::mem::take(&mut self.tables);
        tables.push(Table {
            id: patch.id,
            number: patch.number,
            capacity: patch.capacity,
            status,
        });
        self.replace(tables);
        true
    }

    pub fn get(&self, id: u64) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }
}

pub struct TablesPage {
    api: ApiClient,
    shell: Arc<dyn Shell>,
    board: Mutex<TableBoard>,
    mounted: AtomicBool,
}

impl TablesPage {
    pub fn new(api: ApiClient, shell: Arc<dyn Shell>) -> Arc<Self> {
        Arc::new(Self {
            api,
            shell,
            board: Mutex::new(TableBoard::default()),
            mounted: AtomicBool::new(false),
        })
    }

    fn board(&self) -> MutexGuard<'_, TableBoard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to table events on `live`
    pub fn attach(self: &Arc<Self>, live: &LiveUpdateClient) {
        let page = Arc::clone(self);
        live.add_event_listener(EventKind::TableUpdate, move |event| {
            page.handle_table_update(event);
        });
    }

    pub fn tables(&self) -> Vec<Table> {
        self.board().tables().to_vec()
    }

    fn render(&self) {
        let html = ui::render_tables(self.board().tables());
        self.shell.set_content(html);
    }

    fn handle_table_update(&self, event: &LiveEvent) {
        let patch: TablePatch = match event.payload() {
            Ok(patch) => patch,
            Err(e) => {
                warn!("Ignoring table update: {}", e);
                return;
            }
        };
        let changed = self.board().apply_patch(&patch);
        debug!(table = patch.id, changed, "Table update");
        if changed && self.mounted.load(Ordering::SeqCst) {
            self.render();
        }
    }

    /// Run the card action for `table_id` against the backend.
    pub async fn perform(&self, table_id: u64) -> bool {
        let Some((label, action)) = self
            .board()
            .get(table_id)
            .and_then(|t| TableAction::for_status(t.status).map(|a| (t.label(), a)))
        else {
            warn!(table = table_id, "No action for table");
            return false;
        };

        match self.api.update_table_status(table_id, action.target).await {
            Ok(updated) => {
                let patch = match updated {
                    Some(table) => TablePatch {
                        id: table.id,
                        status: Some(table.status),
                        number: table.number,
                        capacity: table.capacity,
                    },
                    None => TablePatch {
                        id: table_id,
                        status: Some(action.target),
                        number: None,
                        capacity: None,
                    },
                };
                self.board().apply_patch(&patch);
                if self.mounted.load(Ordering::SeqCst) {
                    self.render();
                }
                info!(table = table_id, status = %action.target, "Table status updated");
                self.shell.notify(
                    ToastLevel::Success,
                    &format!("{} is now {}", label, action.target),
                );
                true
            }
            Err(e) => {
                warn!(table = table_id, "Table update failed: {}", e);
                self.shell
                    .notify(ToastLevel::Error, &format!("Could not update {}: {}", label, e));
                false
            }
        }
    }
}

#[async_trait]
impl Page for TablesPage {
    async fn initialize(&self) -> anyhow::Result<()> {
        let tables = self.api.tables().await?;
        debug!(count = tables.len(), "Tables loaded");
        self.board().replace(tables);
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
