//! Identity providers.
//!
//! Two sources can produce a session: the external identity service
//! ([`ExternalProvider`]) and the first-party backend
//! ([`CustomBackendProvider`]). Both sit behind [`ProviderAdapter`] so the
//! session store and the callback resolver never depend on a concrete SDK.

mod custom;
mod external;

use async_trait::async_trait;
use devdirect_core::{AuthMode, ProviderEvent, Session};
use tokio::sync::broadcast;

use crate::errors::AuthError;

pub use custom::CustomBackendProvider;
pub use external::{ExternalProvider, SignInRequest};

/// Uniform interface over an identity source.
///
/// Implementors must be `Send + Sync`; the store shares them across tasks.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which mode sessions from this provider carry.
    fn mode(&self) -> AuthMode;

    /// The provider's current session, if any.
    async fn read_current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Change stream. `None` when the provider never pushes changes.
    fn on_change(&self) -> Option<broadcast::Receiver<ProviderEvent>>;

    /// End the provider-side session.
    async fn sign_out(&self) -> Result<(), AuthError>;
}
