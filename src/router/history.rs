//! Back/forward stack of visited routes.

use serde::{Deserialize, Serialize};

/// State recorded with every history entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryState {
    pub page: String,
}

impl HistoryState {
    pub fn new(page: impl Into<String>) -> Self {
        Self { page: page.into() }
    }
}

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryState>,
    index: usize,
}

impl History {
    /// Push a new entry, dropping anything ahead of the cursor
    pub fn push(&mut self, state: HistoryState) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(state);
        self.index = self.entries.len() - 1;
    }

    pub fn back(&mut self) -> Option<HistoryState> {
        if self.index == 0 || self.entries.is_empty() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index).cloned()
    }

    pub fn forward(&mut self) -> Option<HistoryState> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).cloned()
    }

    pub fn current(&self) -> Option<&HistoryState> {
        self.entries.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
