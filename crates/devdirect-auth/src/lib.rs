//! # devdirect-auth
//!
//! Session reconciliation for DevDirect.
//!
//! Two identity sources can sign a user in:
//! - **External**: the hosted identity service, followed through its change
//!   stream ([`ExternalProvider`])
//! - **Custom**: the first-party backend, whose bearer token is persisted
//!   across restarts ([`CustomBackendProvider`])
//!
//! [`SessionStore`] decides which one is authoritative. A backend session
//! locks out external updates until sign-out. Every transition persists the
//! token and rebinds the shared [`ApiClient`] atomically.
//!
//! [`CallbackResolver`] finalizes the redirect flow of the external provider
//! and routes the user by role.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use devdirect_auth::{ExternalProvider, SessionStore};
//! use devdirect_settings::load_settings;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = load_settings()?;
//! devdirect_auth::init_logging(&settings);
//! let external = Arc::new(ExternalProvider::new());
//! let store = Arc::new(SessionStore::from_settings(&settings, external)?);
//! let _subscription = store.initialize().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod backend;
pub mod callback;
pub mod client;
pub mod errors;
pub mod notify;
pub mod persistence;
pub mod provider;
pub mod store;

pub use backend::{AuthResponse, BackendAuthApi, LoginRequest, RegisterRequest};
pub use callback::{CallbackOutcome, CallbackResolver};
pub use client::ApiClient;
pub use errors::{AuthError, ErrorCategory};
pub use notify::{
    Navigator, Notifier, RecordingNavigator, RecordingNotifier, Toast, ToastKind, TracingNotifier,
};
pub use persistence::{FileTokenStore, MemoryTokenStore, TokenPersistence};
pub use provider::{CustomBackendProvider, ExternalProvider, ProviderAdapter, SignInRequest};
pub use store::{SessionSnapshot, SessionStore, Subscription};

use devdirect_settings::DevDirectSettings;

/// Install the global `tracing` subscriber from `settings.logging`.
///
/// Call once at startup, before [`SessionStore::initialize`].
pub fn init_logging(settings: &DevDirectSettings) {
    devdirect_core::logging::init(&settings.logging.level, settings.logging.json);
    tracing::debug!(level = %settings.logging.level, json = settings.logging.json, "logging initialized");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
