//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file only needs the keys it overrides.

mod api;
mod routes;
mod storage;

pub use api::*;
pub use routes::*;
pub use storage::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "api": { "baseUrl": "https://api.devdirect.id" },
///   "storage": { "tokenKey": "authToken" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevDirectSettings {
    /// Settings schema version.
    pub version: String,
    /// Backend API client settings.
    pub api: ApiSettings,
    /// Token persistence settings.
    pub storage: StorageSettings,
    /// Placeholder identity for token-only backend sessions.
    pub session: SessionSettings,
    /// Navigation targets.
    pub routes: RouteSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for DevDirectSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            api: ApiSettings::default(),
            storage: StorageSettings::default(),
            session: SessionSettings::default(),
            routes: RouteSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
