//! Admin overview: headline numbers for the day.

use async_trait::async_trait;
use pos_events::EventKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::live::LiveUpdateClient;
use crate::router::Page;
use crate::shell::Shell;
use crate::ui;

pub struct OverviewPage {
    api: ApiClient,
    shell: Arc<dyn Shell>,
    mounted: AtomicBool,
}

impl OverviewPage {
    pub fn new(api: ApiClient, shell: Arc<dyn Shell>) -> Arc<Self> {
        Arc::new(Self {
            api,
            shell,
            mounted: AtomicBool::new(false),
        })
    }

    /// Refresh the numbers whenever orders or tables move
    pub fn attach(self: &Arc<Self>, live: &LiveUpdateClient) {
        for kind in [
            EventKind::NewOrder,
            EventKind::OrderUpdate,
            EventKind::TableUpdate,
        ] {
            let page = Arc::clone(self);
            live.add_event_listener(kind, move |_| {
                if !page.mounted.load(Ordering::SeqCst) {
                    return;
                }
                let page = Arc::clone(&page);
                tokio::spawn(async move {
                    if let Err(e) = page.refresh().await {
                        warn!("Stats refresh failed: {}", e);
                    }
                });
            });
        }
    }

    /// Refetch the numbers; the result is dropped if the page was left
    /// while the request was in flight.
    pub async fn refresh(&self) -> anyhow::Result<()> {
        let stats = self.api.dashboard_stats().await?;
        if self.mounted.load(Ordering::SeqCst) {
            self.shell.set_content(ui::render_stats(&stats));
        } else {
            debug!("Overview left, stale stats dropped");
        }
        Ok(())
    }
}

#[async_trait]
impl Page for OverviewPage {
    async fn initialize(&self) -> anyhow::Result<()> {
        let stats = self.api.dashboard_stats().await?;
        debug!(?stats, "Dashboard stats loaded");
        self.shell.set_content(ui::render_stats(&stats));
        Ok(())
    }

    async fn on_mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }

    async fn on_unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }
}
