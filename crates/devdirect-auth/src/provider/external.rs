//! In-process bridge to the external identity service.
//!
//! The SDK integration pushes what it learns through [`ExternalProvider::publish`];
//! the bridge remembers the latest session and fans the change out to every
//! subscriber.

use std::collections::BTreeMap;

use async_trait::async_trait;
use devdirect_core::{AuthMode, ProviderEvent, ProviderEventKind, Session};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;

use super::ProviderAdapter;
use crate::errors::AuthError;

const CHANNEL_CAPACITY: usize = 64;

/// Parameters for starting an OAuth sign-in with the identity service.
///
/// The SDK integration hands this to the service; the user comes back on
/// `redirect_to`, where [`CallbackResolver`](crate::CallbackResolver) takes over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    /// OAuth provider name, e.g. `google`.
    pub provider: String,
    /// Absolute callback URL.
    pub redirect_to: String,
    /// Extra query parameters for the authorization request.
    pub query_params: BTreeMap<String, String>,
}

/// External identity provider bridge.
pub struct ExternalProvider {
    current: RwLock<Option<Session>>,
    tx: broadcast::Sender<ProviderEvent>,
}

impl ExternalProvider {
    /// Bridge with no session.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            current: RwLock::new(None),
            tx,
        }
    }

    /// Bridge that already holds a restored session.
    pub fn with_session(session: Session) -> Self {
        let provider = Self::new();
        *provider.current.write() = Some(session.with_provider(AuthMode::External));
        provider
    }

    /// Record a change from the identity service and notify subscribers.
    ///
    /// Returns how many subscribers received the event.
    pub fn publish(&self, kind: ProviderEventKind, session: Option<Session>) -> usize {
        let session = match kind {
            ProviderEventKind::SignedOut => None,
            _ => session.map(|s| s.with_provider(AuthMode::External)),
        };
        *self.current.write() = session.clone();

        let receivers = self.tx.send(ProviderEvent::new(kind, session)).unwrap_or(0);
        tracing::debug!(kind = ?kind, receivers, "external provider event published");
        receivers
    }

    /// Build the request that starts an OAuth sign-in.
    ///
    /// Offline access with a forced consent prompt, so the service always
    /// returns a refresh token.
    pub fn sign_in_request(&self, provider: &str, redirect_to: impl Into<String>) -> SignInRequest {
        let query_params = BTreeMap::from([
            ("access_type".to_string(), "offline".to_string()),
            ("prompt".to_string(), "consent".to_string()),
        ]);
        let request = SignInRequest {
            provider: provider.to_string(),
            redirect_to: redirect_to.into(),
            query_params,
        };
        tracing::info!(provider, redirect_to = %request.redirect_to, "external sign-in started");
        request
    }

    /// Number of live change-stream subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ExternalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for ExternalProvider {
    fn mode(&self) -> AuthMode {
        AuthMode::External
    }

    async fn read_current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.current.read().clone())
    }

    fn on_change(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        Some(self.tx.subscribe())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let _ = self.publish(ProviderEventKind::SignedOut, None);
        Ok(())
    }
}
