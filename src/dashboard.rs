//! Dashboard assembly.
//!
//! A `Dashboard` owns one router, one live client and the pages for its
//! kind, all sharing a single `Document`. Nothing here is global: build as
//! many as you like against different backends.

use pos_events::{EventKind, UserRole};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::bus::EventBus;
use crate::config::Config;
use crate::live::{self, Connector, LiveError, LiveOptions, LiveUpdateClient};
use crate::pages::{KitchenPage, OverviewPage, PendingPage, TablesPage};
use crate::router::{Navigation, Router, RouterOptions};
use crate::shell::{Document, Shell, ToastLevel};

pub const CONNECTION_LOST_BANNER: &str = "Live updates unavailable. Reconnect to resume.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardKind {
    Admin,
    Chef,
    Staff,
}

impl DashboardKind {
    pub fn for_role(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Self::Admin,
            UserRole::Chef => Self::Chef,
            UserRole::Cleaner | UserRole::Staff => Self::Staff,
        }
    }

    pub fn landing_page(self) -> &'static str {
        match self {
            Self::Admin => "dashboard",
            Self::Chef => "kitchen",
            Self::Staff => "tables",
        }
    }

    /// Staff share the admin socket
    pub fn socket_path(self) -> &'static str {
        match self {
            Self::Admin | Self::Staff => "/ws/admin",
            Self::Chef => "/ws/chef",
        }
    }

    pub fn channels(self) -> &'static [&'static str] {
        match self {
            Self::Admin => &["tables", "orders", "kitchen"],
            Self::Chef => &["kitchen", "orders"],
            Self::Staff => &["tables"],
        }
    }

    /// `(route id, label)` in sidebar order
    pub fn nav(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Admin => &[
                ("dashboard", "Dashboard"),
                ("tables", "Tables"),
                ("kitchen", "Kitchen"),
            ],
            Self::Chef => &[("kitchen", "Kitchen"), ("pending", "Pending Items")],
            Self::Staff => &[("tables", "Tables")],
        }
    }

    pub fn home_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin/",
            Self::Chef => "/chef/",
            Self::Staff => "/staff/",
        }
    }
}

impl std::fmt::Display for DashboardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Chef => write!(f, "chef"),
            Self::Staff => write!(f, "staff"),
        }
    }
}

pub struct Dashboard {
    kind: DashboardKind,
    document: Arc<Document>,
    router: Arc<Router>,
    live: LiveUpdateClient,
    tables: Option<Arc<TablesPage>>,
    kitchen: Option<Arc<KitchenPage>>,
    health_check_interval: Duration,
    shutdown: CancellationToken,
}

impl Dashboard {
    pub fn build(
        kind: DashboardKind,
        config: &Config,
        api: ApiClient,
        connector: Arc<dyn Connector>,
        shutdown: CancellationToken,
    ) -> Result<Self, LiveError> {
        let document = Arc::new(Document::with_nav(kind.nav().iter().copied()));
        let shell: Arc<dyn Shell> = document.clone();

        let router = Arc::new(Router::new(
            shell.clone(),
            RouterOptions::from_config(&config.router, kind.landing_page()),
        ));
        let options = LiveOptions::new(&config.ws_base_url, kind.socket_path())?
            .with_channels(kind.channels().iter().copied())
            .with_config(&config.live);
        let live = LiveUpdateClient::new(
            options,
            api.session().clone(),
            connector,
            EventBus::shared(),
            shutdown.clone(),
        );

        let mut tables = None;
        let mut kitchen = None;
        match kind {
            DashboardKind::Admin => {
                let overview = OverviewPage::new(api.clone(), shell.clone());
                overview.attach(&live);
                router.register_page("dashboard", overview);

                let page = TablesPage::new(api.clone(), shell.clone());
                page.attach(&live);
                router.register_page("tables", page.clone());
                tables = Some(page);

                let page = KitchenPage::new(api.clone(), shell.clone());
                page.attach(&live);
                router.register_page("kitchen", page.clone());
                kitchen = Some(page);
            }
            DashboardKind::Chef => {
                let page = KitchenPage::new(api.clone(), shell.clone());
                page.attach(&live);
                router.register_page("kitchen", page.clone());
                kitchen = Some(page);

                let pending = PendingPage::new(api.clone(), shell.clone());
                pending.attach(&live);
                router.register_page("pending", pending);
            }
            DashboardKind::Staff => {
                let page = TablesPage::new(api.clone(), shell.clone());
                page.attach(&live);
                router.register_page("tables", page.clone());
                tables = Some(page);
            }
        }

        let doc = document.clone();
        router.set_before_navigate(move |_, _| {
            if doc.modal().is_some() {
                doc.close_modal();
            }
        });
        Self::attach_chrome(&document, &live);

        Ok(Self {
            kind,
            document,
            router,
            live,
            tables,
            kitchen,
            health_check_interval: Duration::from_secs(config.live.health_check_interval_secs),
            shutdown,
        })
    }

    /// Badge, toasts and the connection banner
    fn attach_chrome(document: &Arc<Document>, live: &LiveUpdateClient) {
        let doc = document.clone();
        live.add_event_listener(EventKind::Notification, move |event| {
            doc.bump_badge();
            if let Some(message) = event.data.get("message").and_then(|m| m.as_str()) {
                doc.notify(ToastLevel::Info, message);
            }
        });

        let doc = document.clone();
        live.add_event_listener(EventKind::NewOrder, move |_| doc.bump_badge());

        let doc = document.clone();
        live.add_event_listener(EventKind::ConnectionFailed, move |_| {
            doc.set_banner(Some(CONNECTION_LOST_BANNER));
            doc.notify(ToastLevel::Error, "Lost connection to the server");
        });
    }

    /// Open the live socket and route to `location_hash` (or the landing page).
    pub async fn start(&self, location_hash: Option<&str>) -> Navigation {
        info!(dashboard = %self.kind, "Starting dashboard");
        if !self.live.connect() {
            warn!("Live updates not started");
        }
        self.router.initialize(location_hash).await
    }

    pub fn spawn_health_check(&self) -> JoinHandle<()> {
        live::spawn_health_check(
            self.live.clone(),
            self.health_check_interval,
            self.shutdown.clone(),
        )
    }

    /// Manual retry after the client gave up
    pub fn reconnect(&self) -> bool {
        self.document.set_banner(None);
        self.live.connect()
    }

    /// The user opened the notification panel
    pub fn view_notifications(&self) -> u32 {
        let unseen = self.document.badge();
        self.document.clear_badge();
        unseen
    }

    pub fn stop(&self) {
        self.live.disconnect();
    }

    pub fn kind(&self) -> DashboardKind {
        self.kind
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn live(&self) -> &LiveUpdateClient {
        &self.live
    }

    pub fn tables_page(&self) -> Option<&Arc<TablesPage>> {
        self.tables.as_ref()
    }

    pub fn kitchen_page(&self) -> Option<&Arc<KitchenPage>> {
        self.kitchen.as_ref()
    }
}
