//! Session store.
//!
//! [`SessionStore`] is the single authority over "who is signed in". It
//! reconciles two identity sources:
//!
//! - the external provider, which pushes changes over a broadcast stream, and
//! - the first-party backend, whose token is found in persistence at startup
//!   or handed over by a login flow.
//!
//! A backend (`Custom`) session locks the mode: external updates are ignored
//! until sign-out. Every transition swaps the session, persists or clears the
//! token, rebinds the API client and emits a [`SessionEvent`] inside one write
//! lock, so no reader ever sees a half-applied change.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use devdirect_core::{
    AuthMode, EventEmitter, ProviderEvent, Session, SessionEvent, TransitionReason, User,
};
use devdirect_settings::DevDirectSettings;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::backend::{BackendAuthApi, LoginRequest, RegisterRequest};
use crate::client::ApiClient;
use crate::errors::AuthError;
use crate::notify::{Notifier, Toast, TracingNotifier};
use crate::persistence::{FileTokenStore, TokenPersistence};
use crate::provider::{CustomBackendProvider, ProviderAdapter};

#[derive(Debug)]
struct StoreState {
    mode: AuthMode,
    session: Option<Session>,
    loading: bool,
    awaiting_initial: bool,
    initialized: bool,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            mode: AuthMode::Uninitialized,
            session: None,
            loading: true,
            awaiting_initial: false,
            initialized: false,
        }
    }
}

/// Point-in-time view of the store.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Active mode.
    pub mode: AuthMode,
    /// Held session.
    pub session: Option<Session>,
    /// Whether startup resolution is still pending.
    pub loading: bool,
}

/// Live subscription to the external provider's change stream.
///
/// Dropping it stops the listener.
#[derive(Debug)]
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    fn inactive() -> Self {
        Self { handle: None }
    }

    /// Whether a listener is running.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop listening now.
    pub fn unsubscribe(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("provider subscription closed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Reconciles external and backend sessions into one authoritative identity.
pub struct SessionStore {
    state: RwLock<StoreState>,
    external: Arc<dyn ProviderAdapter>,
    custom: Arc<CustomBackendProvider>,
    tokens: Arc<dyn TokenPersistence>,
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
    events: EventEmitter,
}

impl SessionStore {
    /// Create a store.
    ///
    /// `custom` must read from the same `tokens` store for startup restore to
    /// see what this store persists.
    pub fn new(
        external: Arc<dyn ProviderAdapter>,
        custom: Arc<CustomBackendProvider>,
        tokens: Arc<dyn TokenPersistence>,
        api: ApiClient,
    ) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            external,
            custom,
            tokens,
            api,
            notifier: Arc::new(TracingNotifier),
            events: EventEmitter::new(),
        }
    }

    /// Wire a store from settings: file-backed tokens, settings-driven client.
    pub fn from_settings(
        settings: &DevDirectSettings,
        external: Arc<dyn ProviderAdapter>,
    ) -> Result<Self, AuthError> {
        let tokens: Arc<dyn TokenPersistence> =
            Arc::new(FileTokenStore::from_settings(&settings.storage));
        let api = ApiClient::from_settings(&settings.api)?;
        let custom = Arc::new(CustomBackendProvider::with_settings(
            BackendAuthApi::with_settings(api.clone(), &settings.api),
            tokens.clone(),
            settings.session.clone(),
        ));
        Ok(Self::new(external, custom, tokens, api))
    }

    /// Replace the notifier used for sign-out failures.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Resolve the startup identity and start following the external provider.
    ///
    /// A persisted backend token wins immediately. Otherwise the store stays
    /// pending until either the external provider's initial read or its first
    /// change event arrives, whichever is first.
    #[tracing::instrument(skip_all, name = "session_store_init")]
    pub async fn initialize(self: &Arc<Self>) -> Result<Subscription, AuthError> {
        {
            let mut state = self.state.write();
            if state.initialized {
                return Err(AuthError::AlreadyInitialized);
            }
            state.initialized = true;
        }

        let persisted = match self.custom.read_current_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "persisted token unreadable, ignoring");
                None
            }
        };

        let restored = persisted.is_some();
        {
            let mut state = self.state.write();
            if let Some(session) = persisted {
                state.loading = false;
                state.awaiting_initial = false;
                if state.mode != AuthMode::Custom {
                    self.commit(
                        &mut state,
                        AuthMode::Custom,
                        Some(session),
                        TransitionReason::PersistedToken,
                    );
                }
            } else {
                state.awaiting_initial = state.loading;
            }
        }

        let subscription = self.subscribe_provider();
        if restored {
            return Ok(subscription);
        }

        let initial = match self.external.read_current_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(provider = %self.external.mode(), error = %e, category = %e.category(), "initial session read failed");
                None
            }
        };

        {
            let mut state = self.state.write();
            if state.awaiting_initial {
                let _ = self.apply_external_locked(&mut state, initial, TransitionReason::InitialSession);
            } else {
                tracing::debug!("initial session superseded");
            }
        }

        Ok(subscription)
    }

    fn subscribe_provider(self: &Arc<Self>) -> Subscription {
        let Some(rx) = self.external.on_change() else {
            tracing::debug!("external provider has no change stream");
            return Subscription::inactive();
        };
        let handle = tokio::spawn(listen(Arc::downgrade(self), rx));
        Subscription {
            handle: Some(handle),
        }
    }

    fn handle_provider_event(&self, event: &ProviderEvent) {
        tracing::debug!(kind = ?event.kind, "provider event");
        let mut state = self.state.write();
        let _ = self.apply_external_locked(
            &mut state,
            event.effective_session().cloned(),
            TransitionReason::ProviderEvent,
        );
    }

    /// Adopt an external session, or `None` for signed out.
    ///
    /// Ignored while a backend session holds the mode lock. Returns whether
    /// the update was applied.
    pub fn apply_external_session(&self, session: Option<Session>) -> bool {
        let mut state = self.state.write();
        self.apply_external_locked(&mut state, session, TransitionReason::Callback)
    }

    fn apply_external_locked(
        &self,
        state: &mut StoreState,
        session: Option<Session>,
        reason: TransitionReason,
    ) -> bool {
        state.awaiting_initial = false;
        state.loading = false;

        if state.mode == AuthMode::Custom {
            tracing::info!(reason = reason.as_str(), "backend session active, ignoring external update");
            let _ = self.events.emit(SessionEvent::ignored(reason));
            return false;
        }

        match session {
            Some(session) => {
                let mode = self.external.mode();
                let session = session.with_provider(mode);
                self.commit(state, mode, Some(session), reason);
            }
            None => self.commit(state, AuthMode::None, None, reason),
        }
        true
    }

    /// Adopt a backend token. Always wins, and locks out external updates.
    pub fn set_custom_auth(&self, token: &str, user: Option<User>) -> Session {
        let session = self.custom.session_for_token(token, user);
        let mut state = self.state.write();
        state.awaiting_initial = false;
        state.loading = false;
        self.commit(
            &mut state,
            AuthMode::Custom,
            Some(session.clone()),
            TransitionReason::CustomLogin,
        );
        session
    }

    /// Log in against the backend and adopt the resulting session.
    pub async fn sign_in_with_backend(&self, request: &LoginRequest) -> Result<Session, AuthError> {
        let (token, user) = self.custom.login(request).await?;
        Ok(self.set_custom_auth(&token, Some(user)))
    }

    /// Register against the backend and adopt the resulting session.
    pub async fn register_with_backend(
        &self,
        request: &RegisterRequest,
    ) -> Result<Session, AuthError> {
        let (token, user) = self.custom.register(request).await?;
        Ok(self.set_custom_auth(&token, Some(user)))
    }

    /// End the current session. Always leaves the store signed out.
    ///
    /// An external session is also ended at the provider; if that fails the
    /// user is told, and local state is cleared regardless.
    pub async fn sign_out(&self) {
        let mode = self.state.read().mode;

        if mode == AuthMode::External {
            match AssertUnwindSafe(self.external.sign_out()).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, category = %e.category(), "provider sign-out failed, clearing locally");
                    self.notifier
                        .notify(Toast::error("Sign out failed", e.to_string()));
                }
                Err(_) => {
                    tracing::error!("provider sign-out panicked, clearing locally");
                    self.notifier.notify(Toast::error(
                        "Sign out failed",
                        "An unexpected error occurred while signing out",
                    ));
                }
            }
        }

        let mut state = self.state.write();
        state.awaiting_initial = false;
        state.loading = false;
        if state.mode == AuthMode::None && state.session.is_none() {
            self.tokens.clear();
            self.api.unbind();
            tracing::debug!("already signed out");
            return;
        }
        self.commit(&mut state, AuthMode::None, None, TransitionReason::SignOut);
    }

    fn commit(
        &self,
        state: &mut StoreState,
        mode: AuthMode,
        session: Option<Session>,
        reason: TransitionReason,
    ) {
        let from = state.mode;

        match session.as_ref().filter(|s| s.has_token()) {
            Some(s) => {
                self.tokens.write(&s.access_token);
                self.api.bind(&s.access_token);
            }
            None => {
                self.tokens.clear();
                self.api.unbind();
            }
        }

        state.mode = mode;
        state.session = session;

        let _ = self.events.emit(SessionEvent::transition(from, mode, reason));
        tracing::info!(from = %from, to = %mode, reason = reason.as_str(), "session transition");
    }

    /// Whether startup resolution is still pending.
    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    /// Active mode.
    pub fn mode(&self) -> AuthMode {
        self.state.read().mode
    }

    /// Held session.
    pub fn session(&self) -> Option<Session> {
        self.state.read().session.clone()
    }

    /// User of the held session.
    pub fn user(&self) -> Option<User> {
        self.state.read().session.as_ref().map(|s| s.user.clone())
    }

    /// Consistent view of mode, session and loading.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            mode: state.mode,
            session: state.session.clone(),
            loading: state.loading,
        }
    }

    /// Receive every [`SessionEvent`] emitted after this call.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Shared API client whose token this store manages.
    pub fn api_client(&self) -> &ApiClient {
        &self.api
    }
}

async fn listen(store: Weak<SessionStore>, mut rx: broadcast::Receiver<ProviderEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let Some(store) = store.upgrade() else {
                    tracing::debug!("session store dropped, listener exiting");
                    break;
                };
                store.handle_provider_event(&event);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "provider listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::debug!("provider change stream closed");
                break;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
