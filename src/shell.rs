//! The visible surface a dashboard draws into.
//!
//! `Shell` is what the router and pages are allowed to touch: the page
//! title, the navigation highlight, the content area and the notification
//! chrome. `Document` is the in-process implementation; it keeps the
//! rendered HTML and counts every mutation.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    pub shown_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub id: String,
    pub label: String,
    pub active: bool,
}

pub trait Shell: Send + Sync {
    fn set_title(&self, title: &str);
    /// Clear the highlight on `previous` (if any) and set it on `next`
    fn highlight_nav(&self, previous: Option<&str>, next: &str);
    fn show_loading(&self);
    fn set_content(&self, html: String);
    fn show_error(&self, message: &str);
    fn notify(&self, level: ToastLevel, message: &str);
    /// Persistent banner; `None` removes it
    fn set_banner(&self, message: Option<&str>);
    fn bump_badge(&self);
}

#[derive(Default)]
struct DocumentState {
    title: String,
    nav: Vec<NavEntry>,
    content: String,
    toasts: Vec<Toast>,
    banner: Option<String>,
    badge: u32,
    sidebar_open: bool,
    modal: Option<String>,
    mutations: u64,
}

/// In-memory document model.
#[derive(Default)]
pub struct Document {
    state: Mutex<DocumentState>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document with a navigation bar of `(id, label)` entries
    pub fn with_nav<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let doc = Self::new();
        doc.lock().nav = entries
            .into_iter()
            .map(|(id, label)| NavEntry {
                id: id.to_string(),
                label: label.to_string(),
                active: false,
            })
            .collect();
        doc
    }

    fn lock(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate(&self, f: impl FnOnce(&mut DocumentState)) {
        let mut state = self.lock();
        f(&mut state);
        state.mutations += 1;
    }

    pub fn title(&self) -> String {
        self.lock().title.clone()
    }

    pub fn content(&self) -> String {
        self.lock().content.clone()
    }

    pub fn nav(&self) -> Vec<NavEntry> {
        self.lock().nav.clone()
    }

    pub fn active_nav(&self) -> Option<String> {
        self.lock()
            .nav
            .iter()
            .find(|e| e.active)
            .map(|e| e.id.clone())
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().toasts.clone()
    }

    /// Drop toasts older than `max_age`
    pub fn expire_toasts(&self, max_age: Duration) {
        let mut state = self.lock();
        let before = state.toasts.len();
        state.toasts.retain(|t| t.shown_at.elapsed() < max_age);
        if state.toasts.len() != before {
            state.mutations += 1;
        }
    }

    pub fn banner(&self) -> Option<String> {
        self.lock().banner.clone()
    }

    pub fn badge(&self) -> u32 {
        self.lock().badge
    }

    /// Reset the badge once the user has looked at notifications
    pub fn clear_badge(&self) {
        self.mutate(|s| s.badge = 0);
    }

    pub fn toggle_sidebar(&self) -> bool {
        let mut open = false;
        self.mutate(|s| {
            s.sidebar_open = !s.sidebar_open;
            open = s.sidebar_open;
        });
        open
    }

    pub fn sidebar_open(&self) -> bool {
        self.lock().sidebar_open
    }

    pub fn open_modal(&self, id: &str) {
        self.mutate(|s| s.modal = Some(id.to_string()));
    }

    pub fn close_modal(&self) {
        self.mutate(|s| s.modal = None);
    }

    pub fn modal(&self) -> Option<String> {
        self.lock().modal.clone()
    }

    /// Number of mutations since creation
    pub fn mutations(&self) -> u64 {
        self.lock().mutations
    }
}

impl Shell for Document {
    fn set_title(&self, title: &str) {
        self.mutate(|s| s.title = title.to_string());
    }

    fn highlight_nav(&self, previous: Option<&str>, next: &str) {
        self.mutate(|s| {
            for entry in s.nav.iter_mut() {
                if Some(entry.id.as_str()) == previous {
                    entry.active = false;
                }
                if entry.id == next {
                    entry.active = true;
                }
            }
        });
    }

    fn show_loading(&self) {
        let html = ui::render_loading();
        self.mutate(|s| s.content = html);
    }

    fn set_content(&self, html: String) {
        self.mutate(|s| s.content = html);
    }

    fn show_error(&self, message: &str) {
        let html = ui::render_error(message);
        self.mutate(|s| s.content = html);
    }

    fn notify(&self, level: ToastLevel, message: &str) {
        self.mutate(|s| {
            s.toasts.push(Toast {
                level,
                message: message.to_string(),
                shown_at: Instant::now(),
            })
        });
    }

    fn set_banner(&self, message: Option<&str>) {
        self.mutate(|s| s.banner = message.map(str::to_string));
    }

    fn bump_badge(&self) {
        self.mutate(|s| s.badge += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_moves_between_entries() {
        let doc = Document::with_nav([("dashboard", "Dashboard"), ("tables", "Tables")]);
        doc.highlight_nav(None, "dashboard");
        assert_eq!(doc.active_nav().as_deref(), Some("dashboard"));

        doc.highlight_nav(Some("dashboard"), "tables");
        assert_eq!(doc.active_nav().as_deref(), Some("tables"));
        assert_eq!(doc.nav().iter().filter(|e| e.active).count(), 1);
    }

    #[test]
    fn test_every_write_counts_as_mutation() {
        let doc = Document::new();
        assert_eq!(doc.mutations(), 0);
        doc.set_title("Tables");
        doc.show_loading();
        doc.bump_badge();
        assert_eq!(doc.mutations(), 3);
        assert_eq!(doc.badge(), 1);
        assert!(doc.content().contains("Loading"));
    }

    #[test]
    fn test_ui_state_toggles() {
        let doc = Document::new();
        assert!(doc.toggle_sidebar());
        assert!(!doc.toggle_sidebar());

        doc.open_modal("order-details");
        assert_eq!(doc.modal().as_deref(), Some("order-details"));
        doc.close_modal();
        assert_eq!(doc.modal(), None);
    }

    #[test]
    fn test_toasts_expire() {
        let doc = Document::new();
        doc.notify(ToastLevel::Error, "Failed to load tables");
        assert_eq!(doc.toasts().len(), 1);

        doc.expire_toasts(Duration::from_secs(60));
        assert_eq!(doc.toasts().len(), 1);
        doc.expire_toasts(Duration::ZERO);
        assert!(doc.toasts().is_empty());
    }
}
