//! Backend API client settings.

use serde::{Deserialize, Serialize};

/// Settings for the shared outgoing-request client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL of the first-party backend.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Path of the backend login endpoint.
    pub login_path: String,
    /// Path of the backend registration endpoint.
    pub register_path: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 30_000,
            login_path: "/auth/login".to_string(),
            register_path: "/auth/register".to_string(),
        }
    }
}
