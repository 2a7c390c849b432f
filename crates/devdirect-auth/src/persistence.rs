//! Durable mirror of the active bearer token.
//!
//! [`FileTokenStore`] keeps a small scoped key-value file (string keys to
//! string values, like browser local storage) with the plain token under one
//! fixed key. Failures never propagate: a broken store is logged and behaves
//! as empty, so the session still works for the current process lifetime.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use devdirect_settings::StorageSettings;
use parking_lot::Mutex;

use crate::errors::AuthError;

/// Durable storage for the active bearer token.
///
/// Implementations must be idempotent, must not fail, and `read` must not
/// have side effects.
///
/// `write` and `clear` run synchronously inside the session store's write
/// lock, on whatever runtime thread commits the transition. Keep them to
/// fast local writes and never call back into the store from them.
/// [`FileTokenStore`] does a small blocking file write, which is fine for a
/// single-key file on local disk; a network-backed store belongs behind a
/// queue, not here.
pub trait TokenPersistence: Send + Sync {
    /// Store `token` under the fixed key.
    fn write(&self, token: &str);
    /// The stored token, if any.
    fn read(&self) -> Option<String>;
    /// Remove the stored token.
    fn clear(&self);
}

type Entries = BTreeMap<String, String>;

/// File-backed token store.
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
    legacy_keys: Vec<String>,
}

impl FileTokenStore {
    /// Store under `key` in the file at `path`.
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            legacy_keys: Vec::new(),
        }
    }

    /// Build from storage settings.
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(settings.resolved_path(), settings.token_key.clone())
            .with_legacy_keys(settings.legacy_keys.clone())
    }

    /// Keys read as a fallback and removed on clear.
    #[must_use]
    pub fn with_legacy_keys(mut self, keys: Vec<String>) -> Self {
        self.legacy_keys = keys;
        self
    }

    /// Storage file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Entries, AuthError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(AuthError::Persistence(format!("read failed: {e}"))),
        };
        serde_json::from_str(&data).map_err(|e| AuthError::Persistence(format!("corrupt store: {e}")))
    }

    fn save(&self, entries: &Entries) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&self.path, perms);
        }

        Ok(())
    }

    fn try_write(&self, token: &str) -> Result<(), AuthError> {
        let mut entries = self.load().unwrap_or_default();
        let _ = entries.insert(self.key.clone(), token.to_string());
        self.save(&entries)
    }

    fn try_clear(&self) -> Result<(), AuthError> {
        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(e) => {
                // Unreadable store: drop it so no stale token survives.
                tracing::warn!(path = ?self.path, error = %e, "discarding unreadable token store");
                return match std::fs::remove_file(&self.path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(AuthError::Io(e)),
                };
            }
        };

        let before = entries.len();
        entries.retain(|k, _| *k != self.key && !self.legacy_keys.contains(k));
        if entries.len() == before {
            return Ok(());
        }
        self.save(&entries)
    }
}

impl TokenPersistence for FileTokenStore {
    fn write(&self, token: &str) {
        if let Err(e) = self.try_write(token) {
            tracing::warn!(path = ?self.path, error = %e, "token not persisted, keeping it in memory only");
        }
    }

    fn read(&self) -> Option<String> {
        let entries = match self.load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "token store unavailable");
                return None;
            }
        };

        if let Some(token) = entries.get(&self.key).filter(|t| !t.is_empty()) {
            return Some(token.clone());
        }
        self.legacy_keys.iter().find_map(|k| {
            let token = entries.get(k).filter(|t| !t.is_empty())?;
            tracing::debug!(key = %k, "token found under legacy key");
            Some(token.clone())
        })
    }

    fn clear(&self) {
        if let Err(e) = self.try_clear() {
            tracing::warn!(path = ?self.path, error = %e, "failed to clear persisted token");
        }
    }
}

/// Token store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token, as if persisted by an earlier run.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenPersistence for MemoryTokenStore {
    fn write(&self, token: &str) {
        *self.token.lock() = Some(token.to_string());
    }

    fn read(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn clear(&self) {
        *self.token.lock() = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
