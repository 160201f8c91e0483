//! Hash-fragment router for the dashboards.
//!
//! Routes map a page id to a load action. Navigation updates the shell
//! (title, nav highlight, loading placeholder), then resolves and awaits
//! the action. Page modules may register after the router starts, so a
//! missing or failing target is retried with linear backoff before the
//! content area shows an error.

mod history;

pub use history::{History, HistoryState};

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::RouterConfig;
use crate::shell::Shell;

pub type LoadFuture = BoxFuture<'static, anyhow::Result<()>>;
pub type LoadHandler = Arc<dyn Fn() -> LoadFuture + Send + Sync>;
pub type BeforeNavigate = Arc<dyn Fn(Option<&str>, &str) + Send + Sync>;

/// A stateful dashboard view owned by the router.
#[async_trait]
pub trait Page: Send + Sync {
    /// Full setup: fetch and render. Safe to call again after unmount.
    async fn initialize(&self) -> anyhow::Result<()>;

    async fn on_mount(&self) {}

    async fn on_unmount(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Idle,
    Navigating,
    Loaded,
    Error,
}

/// Outcome of one `navigate_to` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Already on that route, nothing touched
    Unchanged,
    Loaded,
    /// Gave up after `attempts` lookups
    Failed { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub landing_page: String,
}

impl RouterOptions {
    pub fn from_config(config: &RouterConfig, landing_page: &str) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            landing_page: config
                .landing_page
                .clone()
                .unwrap_or_else(|| landing_page.to_string()),
        }
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            landing_page: "dashboard".to_string(),
        }
    }
}

struct RouteEntry {
    handler: LoadHandler,
    title: Option<String>,
}

struct PageEntry {
    page: Arc<dyn Page>,
    initialized: bool,
}

enum Target {
    Handler(LoadHandler),
    Page(Arc<dyn Page>),
}

struct RouterInner {
    routes: HashMap<String, RouteEntry>,
    pages: HashMap<String, PageEntry>,
    current: Option<String>,
    state: RouterState,
    history: History,
    before_navigate: Option<BeforeNavigate>,
}

pub struct Router {
    shell: Arc<dyn Shell>,
    options: RouterOptions,
    inner: Mutex<RouterInner>,
}

impl Router {
    pub fn new(shell: Arc<dyn Shell>, options: RouterOptions) -> Self {
        Self {
            shell,
            options,
            inner: Mutex::new(RouterInner {
                routes: HashMap::new(),
                pages: HashMap::new(),
                current: None,
                state: RouterState::Idle,
                history: History::default(),
                before_navigate: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RouterInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register or replace the load action for `id`
    pub fn add_route<F, Fut>(&self, id: impl Into<String>, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.insert_route(id.into(), None, handler);
    }

    /// Register or replace the load action for `id`, with a display title
    pub fn add_titled_route<F, Fut>(&self, id: impl Into<String>, title: impl Into<String>, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.insert_route(id.into(), Some(title.into()), handler);
    }

    fn insert_route<F, Fut>(&self, id: String, title: Option<String>, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: LoadHandler = Arc::new(move || -> LoadFuture { Box::pin(handler()) });
        let replaced = self
            .lock()
            .routes
            .insert(id.clone(), RouteEntry { handler, title })
            .is_some();
        debug!(route = %id, replaced, "Route registered");
    }

    /// Register a page instance. Its `initialize` is the load action unless
    /// an explicit route exists under the same id.
    pub fn register_page(&self, id: impl Into<String>, page: Arc<dyn Page>) {
        let id = id.into();
        debug!(page = %id, "Page registered");
        self.lock().pages.insert(
            id,
            PageEntry {
                page,
                initialized: false,
            },
        );
    }

    pub fn set_before_navigate<F>(&self, hook: F)
    where
        F: Fn(Option<&str>, &str) + Send + Sync + 'static,
    {
        self.lock().before_navigate = Some(Arc::new(hook));
    }

    pub fn current_route(&self) -> Option<String> {
        self.lock().current.clone()
    }

    pub fn state(&self) -> RouterState {
        self.lock().state
    }

    pub fn landing_page(&self) -> &str {
        &self.options.landing_page
    }

    /// Hash fragment for the current route, e.g. `#tables`
    pub fn location_hash(&self) -> String {
        format!("#{}", self.current_route().unwrap_or_default())
    }

    pub fn is_page_initialized(&self, id: &str) -> bool {
        self.lock().pages.get(id).is_some_and(|e| e.initialized)
    }

    /// Read the initial route from `location_hash` (or fall back to the
    /// landing page) and navigate there.
    pub async fn initialize(&self, location_hash: Option<&str>) -> Navigation {
        let route = location_hash
            .and_then(route_from_hash)
            .unwrap_or_else(|| self.options.landing_page.clone());
        info!(route = %route, "Router initialized");
        self.navigate(&route, true).await
    }

    /// Back/forward listener: go to the route recorded in `state`.
    pub async fn handle_pop_state(&self, state: Option<HistoryState>) -> Navigation {
        let route = state
            .map(|s| s.page)
            .unwrap_or_else(|| self.options.landing_page.clone());
        self.navigate(&route, false).await
    }

    pub async fn back(&self) -> Option<Navigation> {
        let state = self.lock().history.back()?;
        Some(self.handle_pop_state(Some(state)).await)
    }

    pub async fn forward(&self) -> Option<Navigation> {
        let state = self.lock().history.forward()?;
        Some(self.handle_pop_state(Some(state)).await)
    }

    pub async fn navigate_to(&self, id: &str) -> Navigation {
        self.navigate(id, true).await
    }

    async fn navigate(&self, id: &str, push_history: bool) -> Navigation {
        let (previous, outgoing, hook, title) = {
            let mut inner = self.lock();
            if inner.current.as_deref() == Some(id) {
                debug!(route = %id, "Already on route");
                return Navigation::Unchanged;
            }
            let previous = inner.current.replace(id.to_string());
            inner.state = RouterState::Navigating;

            let outgoing = match previous.as_deref() {
                Some(prev) => inner.pages.get_mut(prev).map(|entry| {
                    entry.initialized = false;
                    entry.page.clone()
                }),
                None => None,
            };
            if push_history {
                inner.history.push(HistoryState::new(id));
            }
            let title = inner
                .routes
                .get(id)
                .and_then(|r| r.title.clone())
                .unwrap_or_else(|| title_from_id(id));
            (previous, outgoing, inner.before_navigate.clone(), title)
        };

        info!(from = ?previous, to = %id, "Navigating");
        if let Some(hook) = hook {
            hook(previous.as_deref(), id);
        }
        self.shell.set_title(&title);
        self.shell.highlight_nav(previous.as_deref(), id);
        if let Some(page) = outgoing {
            page.on_unmount().await;
        }
        self.shell.show_loading();

        let attempts = self.options.max_retries.saturating_add(1);
        let mut last_error = String::new();
        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.options.retry_base_delay * attempt;
                debug!(route = %id, attempt, ?delay, "Retrying navigation");
                tokio::time::sleep(delay).await;
            }

            let result = match self.resolve(id) {
                None => {
                    last_error = format!("Page not found: {}", id);
                    warn!(route = %id, attempt, "Route not registered yet");
                    continue;
                }
                Some(Target::Handler(handler)) => handler().await,
                Some(Target::Page(page)) => self.load_page(id, page).await,
            };

            match result {
                Ok(()) => {
                    self.finish(id, RouterState::Loaded, None);
                    return Navigation::Loaded;
                }
                Err(e) => {
                    warn!(route = %id, attempt, "Page load failed: {:#}", e);
                    last_error = format!("Failed to load {}: {}", id, e);
                }
            }
        }

        self.finish(id, RouterState::Error, Some(&last_error));
        Navigation::Failed { attempts }
    }

    fn resolve(&self, id: &str) -> Option<Target> {
        let inner = self.lock();
        if let Some(route) = inner.routes.get(id) {
            return Some(Target::Handler(route.handler.clone()));
        }
        inner.pages.get(id).map(|e| Target::Page(e.page.clone()))
    }

    async fn load_page(&self, id: &str, page: Arc<dyn Page>) -> anyhow::Result<()> {
        if !self.is_page_initialized(id) {
            page.initialize().await?;
            if self.current_route().as_deref() == Some(id) {
                if let Some(entry) = self.lock().pages.get_mut(id) {
                    entry.initialized = true;
                }
            }
        }
        page.on_mount().await;
        Ok(())
    }

    /// Record the terminal state, unless a newer navigation took over.
    fn finish(&self, id: &str, state: RouterState, error: Option<&str>) {
        {
            let mut inner = self.lock();
            if inner.current.as_deref() != Some(id) {
                debug!(route = %id, "Navigation superseded, result ignored");
                return;
            }
            inner.state = state;
        }
        if let Some(message) = error {
            self.shell.show_error(message);
        }
    }
}

/// `#tables` / `tables` / `#/tables` -> `tables`; empty -> None
pub fn route_from_hash(hash: &str) -> Option<String> {
    let route = hash.trim().trim_start_matches('#').trim_start_matches('/');
    if route.is_empty() {
        None
    } else {
        Some(route.to_string())
    }
}

/// `pending-items` -> `Pending Items`
fn title_from_id(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Document;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn router_with(doc: &Arc<Document>) -> Arc<Router> {
        let shell: Arc<dyn Shell> = doc.clone();
        Arc::new(Router::new(shell, RouterOptions::default()))
    }

    fn counting_route(router: &Router, id: &str) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        router.add_route(id, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        calls
    }

    #[derive(Default)]
    struct RecordingPage {
        initializations: AtomicUsize,
        mounts: AtomicUsize,
        unmounts: AtomicUsize,
    }

    #[async_trait]
    impl Page for RecordingPage {
        async fn initialize(&self) -> anyhow::Result<()> {
            self.initializations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_mount(&self) {
            self.mounts.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_unmount(&self) {
            self.unmounts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregistered_route_gives_up_after_four_lookups() {
        let doc = Arc::new(Document::new());
        let router = router_with(&doc);

        let started = Instant::now();
        let outcome = router.navigate_to("reports").await;

        assert_eq!(outcome, Navigation::Failed { attempts: 4 });
        // 500 + 1000 + 1500 ms between the four lookups
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
        assert_eq!(router.state(), RouterState::Error);
        assert!(doc.content().contains("Page not found: reports"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_registration_is_picked_up_by_retry() {
        let doc = Arc::new(Document::new());
        let router = router_with(&doc);

        let late = router.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            late.add_route("tables", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        });

        let started = Instant::now();
        let outcome = router.navigate_to("tables").await;

        assert_eq!(outcome, Navigation::Loaded);
        // found on the third lookup, after the 500 and 1000 ms waits
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(router.state(), RouterState::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigating_to_current_route_touches_nothing() {
        let doc = Arc::new(Document::with_nav([("tables", "Tables")]));
        let router = router_with(&doc);
        let calls = counting_route(&router, "tables");

        assert_eq!(router.navigate_to("tables").await, Navigation::Loaded);
        let mutations = doc.mutations();

        assert_eq!(router.navigate_to("tables").await, Navigation::Unchanged);
        assert_eq!(doc.mutations(), mutations);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_handler_is_retried_then_succeeds() {
        let doc = Arc::new(Document::new());
        let router = router_with(&doc);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        router.add_route("kitchen", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    anyhow::bail!("backend unavailable");
                }
                Ok(())
            }
        });

        assert_eq!(router.navigate_to("kitchen").await, Navigation::Loaded);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_error_surfaces_after_retries() {
        let doc = Arc::new(Document::new());
        let router = router_with(&doc);
        router.add_route("kitchen", || async { anyhow::bail!("backend unavailable") });

        let outcome = router.navigate_to("kitchen").await;
        assert_eq!(outcome, Navigation::Failed { attempts: 4 });
        assert!(doc.content().contains("backend unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retry_setting_does_not_overflow() {
        let doc = Arc::new(Document::new());
        let shell: Arc<dyn Shell> = doc.clone();
        let options = RouterOptions {
            max_retries: u32::MAX,
            ..RouterOptions::default()
        };
        let router = Arc::new(Router::new(shell, options));
        let calls = counting_route(&router, "tables");

        assert_eq!(router.navigate_to("tables").await, Navigation::Loaded);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_registration_wins() {
        let doc = Arc::new(Document::new());
        let router = router_with(&doc);
        let first = counting_route(&router, "tables");
        let second = counting_route(&router, "tables");

        router.navigate_to("tables").await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_title_nav_and_hook_follow_navigation() {
        let doc = Arc::new(Document::with_nav([
            ("dashboard", "Dashboard"),
            ("pending-items", "Pending"),
        ]));
        let router = router_with(&doc);
        router.add_titled_route("dashboard", "Overview", || async { Ok(()) });
        router.add_route("pending-items", || async { Ok(()) });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        router.set_before_navigate(move |from, to| {
            log.lock()
                .unwrap()
                .push((from.map(str::to_string), to.to_string()));
        });

        router.navigate_to("dashboard").await;
        assert_eq!(doc.title(), "Overview");
        router.navigate_to("pending-items").await;
        assert_eq!(doc.title(), "Pending Items");
        assert_eq!(doc.active_nav().as_deref(), Some("pending-items"));

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (None, "dashboard".to_string()),
                (Some("dashboard".to_string()), "pending-items".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_outgoing_page_reinitializes_on_next_visit() {
        let doc = Arc::new(Document::new());
        let router = router_with(&doc);
        let page = Arc::new(RecordingPage::default());
        router.register_page("tables", page.clone());
        router.add_route("kitchen", || async { Ok(()) });

        router.navigate_to("tables").await;
        assert!(router.is_page_initialized("tables"));

        router.navigate_to("kitchen").await;
        assert!(!router.is_page_initialized("tables"));
        assert_eq!(page.unmounts.load(Ordering::SeqCst), 1);

        router.navigate_to("tables").await;
        assert_eq!(page.initializations.load(Ordering::SeqCst), 2);
        assert_eq!(page.mounts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_reads_hash_or_falls_back_to_landing() {
        let doc = Arc::new(Document::new());
        let router = router_with(&doc);
        counting_route(&router, "dashboard");
        let tables = counting_route(&router, "tables");

        router.initialize(Some("#tables")).await;
        assert_eq!(router.current_route().as_deref(), Some("tables"));
        assert_eq!(router.location_hash(), "#tables");
        assert_eq!(tables.load(Ordering::SeqCst), 1);

        let other = router_with(&doc);
        counting_route(&other, "dashboard");
        other.initialize(Some("#")).await;
        assert_eq!(other.current_route().as_deref(), Some("dashboard"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_and_forward_replay_history() {
        let doc = Arc::new(Document::new());
        let router = router_with(&doc);
        counting_route(&router, "dashboard");
        let tables = counting_route(&router, "tables");

        router.initialize(None).await;
        router.navigate_to("tables").await;

        assert_eq!(router.back().await, Some(Navigation::Loaded));
        assert_eq!(router.current_route().as_deref(), Some("dashboard"));
        assert_eq!(router.forward().await, Some(Navigation::Loaded));
        assert_eq!(router.current_route().as_deref(), Some("tables"));
        assert_eq!(tables.load(Ordering::SeqCst), 2);
        assert_eq!(router.forward().await, None);

        router.handle_pop_state(None).await;
        assert_eq!(router.current_route().as_deref(), Some("dashboard"));
    }

    #[test]
    fn test_route_from_hash() {
        assert_eq!(route_from_hash("#tables").as_deref(), Some("tables"));
        assert_eq!(route_from_hash("#/kitchen").as_deref(), Some("kitchen"));
        assert_eq!(route_from_hash("#"), None);
        assert_eq!(route_from_hash(""), None);
    }

    #[test]
    fn test_title_from_id() {
        assert_eq!(title_from_id("pending-items"), "Pending Items");
        assert_eq!(title_from_id("dashboard"), "Dashboard");
    }
}
