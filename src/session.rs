//! Persisted session keys.
//!
//! The dashboards keep four keys between runs: `token`, `user_role`,
//! `user` (JSON) and `user_data`. They live in a small JSON object on disk
//! and every write is flushed immediately.

use pos_events::UserRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "token";
pub const USER_ROLE_KEY: &str = "user_role";
pub const USER_KEY: &str = "user";
pub const USER_DATA_KEY: &str = "user_data";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Profile kept under the `user` key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredUser {
    pub user_id: u64,
    pub user_role: UserRole,
    #[serde(default)]
    pub username: Option<String>,
}

/// Key-value session storage backed by a JSON file.
///
/// Cloning shares the same underlying map.
#[derive(Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl SessionStore {
    /// Open the store at `path`, loading existing keys if the file exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        debug!(path = %path.display(), keys = entries.len(), "Session loaded");
        Ok(Self {
            path: Some(path),
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), SessionError> {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value.into());
        self.persist(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        let mut entries = self.lock();
        entries.clear();
        self.persist(&entries)
    }

    pub fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn user_role(&self) -> Option<UserRole> {
        let raw = self.get(USER_ROLE_KEY)?;
        match raw.parse() {
            Ok(role) => Some(role),
            Err(e) => {
                warn!("Ignoring stored role: {}", e);
                None
            }
        }
    }

    pub fn user(&self) -> Option<StoredUser> {
        let raw = self.get(USER_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    /// Record a successful login in one write
    pub fn store_login(
        &self,
        token: &str,
        user: &StoredUser,
        user_data: Option<&serde_json::Value>,
    ) -> Result<(), SessionError> {
        let mut entries = self.lock();
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        entries.insert(USER_ROLE_KEY.to_string(), user.user_role.to_string());
        entries.insert(USER_KEY.to_string(), serde_json::to_string(user)?);
        match user_data {
            Some(data) => {
                entries.insert(USER_DATA_KEY.to_string(), data.to_string());
            }
            None => {
                entries.remove(USER_DATA_KEY);
            }
        }
        self.persist(&entries)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(path, raw).map_err(|source| SessionError::Io {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = SessionStore::open(&path).unwrap();
        store.set(TOKEN_KEY, "abc").unwrap();
        store.set(USER_ROLE_KEY, "Admin").unwrap();

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.token().as_deref(), Some("abc"));
        assert_eq!(reopened.user_role(), Some(UserRole::Admin));
    }

    #[test]
    fn test_store_login_writes_all_keys() {
        let store = SessionStore::in_memory();
        let user = StoredUser {
            user_id: 1,
            user_role: UserRole::Chef,
            username: None,
        };
        store
            .store_login("t1", &user, Some(&serde_json::json!({"shift": "night"})))
            .unwrap();

        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("t1"));
        assert_eq!(store.get(USER_ROLE_KEY).as_deref(), Some("Chef"));
        assert_eq!(store.user(), Some(user));
        assert_eq!(
            store.get(USER_DATA_KEY).as_deref(),
            Some(r#"{"shift":"night"}"#)
        );
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let store = SessionStore::in_memory();
        store.set(TOKEN_KEY, "").unwrap();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = SessionStore::in_memory();
        store.set(TOKEN_KEY, "abc").unwrap();
        store.set(USER_ROLE_KEY, "nonsense").unwrap();
        assert_eq!(store.user_role(), None);

        store.clear().unwrap();
        assert_eq!(store.get(USER_ROLE_KEY), None);
        assert_eq!(store.token(), None);
    }
}
