//! First-party backend provider.
//!
//! The backend has no change stream; its only durable state is the bearer
//! token in [`TokenPersistence`]. A token found there is turned into a
//! session with a placeholder user, since the backend token carries no
//! profile of its own.

use std::sync::Arc;

use async_trait::async_trait;
use devdirect_core::{AuthMode, ProviderEvent, Session, User};
use devdirect_settings::SessionSettings;
use tokio::sync::broadcast;

use super::ProviderAdapter;
use crate::backend::{BackendAuthApi, LoginRequest, RegisterRequest};
use crate::errors::AuthError;
use crate::persistence::TokenPersistence;

/// Backend-issued token provider.
pub struct CustomBackendProvider {
    api: BackendAuthApi,
    tokens: Arc<dyn TokenPersistence>,
    settings: SessionSettings,
}

impl CustomBackendProvider {
    /// Provider over the backend API and the shared token store.
    pub fn new(api: BackendAuthApi, tokens: Arc<dyn TokenPersistence>) -> Self {
        Self::with_settings(api, tokens, SessionSettings::default())
    }

    /// Provider with custom placeholder-session settings.
    pub fn with_settings(
        api: BackendAuthApi,
        tokens: Arc<dyn TokenPersistence>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            api,
            tokens,
            settings,
        }
    }

    /// Placeholder user for tokens that arrive without a profile.
    pub fn placeholder_user(&self) -> User {
        User::new(
            self.settings.placeholder_user_id.as_str(),
            self.settings.placeholder_email.as_str(),
        )
    }

    /// Session for a backend token, with the placeholder user when `user` is `None`.
    pub fn session_for_token(&self, token: &str, user: Option<User>) -> Session {
        Session {
            access_token: token.to_string(),
            refresh_token: String::new(),
            expires_in_seconds: self.settings.expires_in_seconds,
            token_type: self.settings.token_type.clone(),
            user: user.unwrap_or_else(|| self.placeholder_user()),
            provider: AuthMode::Custom,
        }
    }

    /// Exchange credentials for a backend token and its user.
    pub async fn login(&self, request: &LoginRequest) -> Result<(String, User), AuthError> {
        let (status, resp) = self.api.login(request).await?;
        let data = resp.into_credentials(status)?;
        tracing::info!(user_id = %data.user.id, "backend login succeeded");
        Ok((data.token, data.user.into_user()))
    }

    /// Create an account. Returns the token and user when the backend signs
    /// the new account in directly.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(String, User), AuthError> {
        let (status, resp) = self.api.register(request).await?;
        let data = resp.into_credentials(status)?;
        tracing::info!(user_id = %data.user.id, "backend registration succeeded");
        Ok((data.token, data.user.into_user()))
    }
}

#[async_trait]
impl ProviderAdapter for CustomBackendProvider {
    fn mode(&self) -> AuthMode {
        AuthMode::Custom
    }

    async fn read_current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self
            .tokens
            .read()
            .map(|token| self.session_for_token(&token, None)))
    }

    fn on_change(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        None
    }

    /// Nothing to revoke remotely. The token store is cleared by the
    /// session store's commit, never here.
    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
