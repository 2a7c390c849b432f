//! Token persistence and placeholder-session settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where and under which key the active bearer token is persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Storage file. Empty means `~/.devdirect/storage.json`.
    pub path: String,
    /// Key holding the plain bearer token.
    pub token_key: String,
    /// Older keys read as a fallback and removed on sign-out.
    pub legacy_keys: Vec<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            token_key: "authToken".to_string(),
            legacy_keys: vec!["auth_token".to_string()],
        }
    }
}

impl StorageSettings {
    /// Storage file path, falling back to `~/.devdirect/storage.json`.
    pub fn resolved_path(&self) -> PathBuf {
        if self.path.is_empty() {
            crate::loader::data_dir().join("storage.json")
        } else {
            PathBuf::from(&self.path)
        }
    }
}

/// Identity used when a backend token arrives without a user.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Placeholder user id.
    pub placeholder_user_id: String,
    /// Placeholder user email.
    pub placeholder_email: String,
    /// Lifetime reported for backend tokens, in seconds.
    pub expires_in_seconds: u64,
    /// Token type reported for backend tokens.
    pub token_type: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            placeholder_user_id: "backend-user".to_string(),
            placeholder_email: "backend-authenticated".to_string(),
            expires_in_seconds: 3600,
            token_type: "bearer".to_string(),
        }
    }
}
