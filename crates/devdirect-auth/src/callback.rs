//! Redirect-callback finalization.
//!
//! After the external provider redirects back to `/auth/callback`, a
//! [`CallbackResolver`] reads the provider's session once, hands it to the
//! [`SessionStore`], tells the user how it went and navigates by role.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use devdirect_core::Role;
use devdirect_settings::RouteSettings;
use futures::FutureExt;
use tokio::sync::watch;

use crate::errors::{AuthError, ErrorCategory};
use crate::notify::{Navigator, Notifier, Toast};
use crate::provider::ProviderAdapter;
use crate::store::SessionStore;

/// How a callback ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// A session was found; the user was sent to `target`.
    SignedIn {
        /// Role used for routing.
        role: Role,
        /// Route navigated to.
        target: String,
    },
    /// The provider answered without a session.
    Incomplete,
    /// The provider failed, or something unexpected happened.
    Failed {
        /// What went wrong.
        message: String,
    },
}

/// One-shot resolver for the auth redirect callback.
pub struct CallbackResolver {
    store: Arc<SessionStore>,
    provider: Arc<dyn ProviderAdapter>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    routes: RouteSettings,
    loading: watch::Sender<bool>,
}

struct LoadingGuard<'a>(&'a watch::Sender<bool>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.send_replace(false);
    }
}

impl CallbackResolver {
    /// Resolver with default routes.
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn ProviderAdapter>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (loading, _) = watch::channel(true);
        Self {
            store,
            provider,
            notifier,
            navigator,
            routes: RouteSettings::default(),
            loading,
        }
    }

    /// Override navigation targets.
    #[must_use]
    pub fn with_routes(mut self, routes: RouteSettings) -> Self {
        self.routes = routes;
        self
    }

    /// Loading flag: `true` until `resolve` finishes, on every path.
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Route for a role.
    pub fn target_for(&self, role: Role) -> &str {
        match role {
            Role::Applicant => &self.routes.applicant_dashboard,
            Role::Recruiter => &self.routes.recruiter_dashboard,
        }
    }

    /// Finalize the callback. Never fails: every error becomes a toast, a
    /// redirect to the landing page and a [`CallbackOutcome::Failed`].
    #[tracing::instrument(skip_all, name = "auth_callback")]
    pub async fn resolve(self) -> CallbackOutcome {
        let _guard = LoadingGuard(&self.loading);

        match AssertUnwindSafe(self.run()).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::error!(error = %e, category = %e.category(), "callback handling failed");
                self.fail_generic(e.to_string())
            }
            Err(_) => {
                tracing::error!("callback handling panicked");
                self.fail_generic("panic during callback handling".to_string())
            }
        }
    }

    async fn run(&self) -> Result<CallbackOutcome, AuthError> {
        let session = match self.provider.read_current_session().await {
            Ok(session) => session,
            Err(e) if e.category() == ErrorCategory::Provider => {
                let message = match &e {
                    AuthError::Provider { message } if !message.is_empty() => message.clone(),
                    AuthError::Backend { message, .. } if !message.is_empty() => message.clone(),
                    _ => "Something went wrong during authentication".to_string(),
                };
                tracing::warn!(error = %e, "provider rejected callback");
                self.notifier
                    .notify(Toast::error("Authentication failed", message.clone()));
                self.navigator.navigate(&self.routes.landing);
                return Ok(CallbackOutcome::Failed { message });
            }
            Err(AuthError::NoSession) => None,
            Err(e) => return Err(e),
        };

        let Some(session) = session else {
            tracing::info!("callback finished without a session");
            self.notifier.notify(Toast::error(
                "Authentication incomplete",
                "Unable to complete authentication. Please try again.",
            ));
            self.navigator.navigate(&self.routes.landing);
            return Ok(CallbackOutcome::Incomplete);
        };

        let role = Role::from_metadata(&session.user.metadata);
        if session.has_token() {
            let applied = self.store.apply_external_session(Some(session));
            tracing::info!(applied, role = %role, "callback session handed to store");
        } else {
            tracing::warn!("callback session has no access token");
        }

        self.notifier.notify(Toast::success(
            "Login successful",
            "You are signed in. Welcome to DevDirect!",
        ));
        let target = self.target_for(role).to_string();
        self.navigator.navigate(&target);
        Ok(CallbackOutcome::SignedIn { role, target })
    }

    fn fail_generic(&self, message: String) -> CallbackOutcome {
        self.notifier.notify(Toast::error(
            "Authentication error",
            "An unexpected error occurred during authentication",
        ));
        self.navigator.navigate(&self.routes.landing);
        CallbackOutcome::Failed { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use devdirect_core::{AuthMode, ProviderEvent, Session, User};
    use tokio::sync::broadcast;

    use crate::backend::BackendAuthApi;
    use crate::client::ApiClient;
    use crate::notify::{RecordingNavigator, RecordingNotifier, ToastKind};
    use crate::persistence::{MemoryTokenStore, TokenPersistence};
    use crate::provider::{CustomBackendProvider, ExternalProvider};

    enum Script {
        Session(Option<Session>),
        ProviderError(String),
        Unexpected,
        Panic,
    }

    struct ScriptedProvider(Script);

    #[async_trait]
    impl ProviderAdapter for ScriptedProvider {
        fn mode(&self) -> AuthMode {
            AuthMode::External
        }

        async fn read_current_session(&self) -> Result<Option<Session>, AuthError> {
            match &self.0 {
                Script::Session(s) => Ok(s.clone()),
                Script::ProviderError(m) => Err(AuthError::provider(m.clone())),
                Script::Unexpected => Err(AuthError::Unexpected("storage quota".into())),
                Script::Panic => panic!("sdk bug"),
            }
        }

        fn on_change(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
            None
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            Ok(())
        }
    }

    struct Harness {
        store: Arc<SessionStore>,
        tokens: Arc<MemoryTokenStore>,
        notifier: RecordingNotifier,
        navigator: RecordingNavigator,
    }

    impl Harness {
        fn new() -> Self {
            let tokens = Arc::new(MemoryTokenStore::new());
            let api = ApiClient::new("http://localhost:8080");
            let custom = Arc::new(CustomBackendProvider::new(
                BackendAuthApi::new(api.clone()),
                tokens.clone(),
            ));
            let store = SessionStore::new(
                Arc::new(ExternalProvider::new()),
                custom,
                tokens.clone(),
                api,
            );
            Self {
                store: Arc::new(store),
                tokens,
                notifier: RecordingNotifier::new(),
                navigator: RecordingNavigator::new(),
            }
        }

        fn resolver(&self, script: Script) -> CallbackResolver {
            CallbackResolver::new(
                self.store.clone(),
                Arc::new(ScriptedProvider(script)),
                Arc::new(self.notifier.clone()),
                Arc::new(self.navigator.clone()),
            )
        }
    }

    fn session(token: &str, role: Option<&str>) -> Session {
        let mut user = User::new("u1", "a@b.c");
        if let Some(role) = role {
            user = user.with_metadata("role", role);
        }
        Session {
            access_token: token.into(),
            refresh_token: String::new(),
            expires_in_seconds: 3600,
            token_type: "bearer".into(),
            user,
            provider: AuthMode::External,
        }
    }

    #[tokio::test]
    async fn recruiter_goes_to_recruiter_dashboard() {
        let h = Harness::new();
        let outcome = h
            .resolver(Script::Session(Some(session("abc", Some("recruiter")))))
            .resolve()
            .await;

        assert_eq!(
            outcome,
            CallbackOutcome::SignedIn {
                role: Role::Recruiter,
                target: "/recruiter/dashboard".into()
            }
        );
        assert_eq!(h.tokens.read().as_deref(), Some("abc"));
        assert_eq!(h.store.mode(), AuthMode::External);
        assert_eq!(h.notifier.last().unwrap().kind, ToastKind::Success);
        assert_eq!(h.navigator.current().as_deref(), Some("/recruiter/dashboard"));
    }

    #[tokio::test]
    async fn missing_role_defaults_to_applicant() {
        let h = Harness::new();
        let outcome = h
            .resolver(Script::Session(Some(session("abc", None))))
            .resolve()
            .await;
        assert_matches!(outcome, CallbackOutcome::SignedIn { role: Role::Applicant, ref target } if target == "/dashboard");
    }

    #[tokio::test]
    async fn unknown_role_defaults_to_applicant() {
        let h = Harness::new();
        let _ = h
            .resolver(Script::Session(Some(session("abc", Some("admin")))))
            .resolve()
            .await;
        assert_eq!(h.navigator.current().as_deref(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn typed_role_without_metadata_routes_to_applicant_dashboard() {
        let h = Harness::new();
        let mut typed = session("abc", None);
        typed.user.role = Some(Role::Recruiter);

        let outcome = h.resolver(Script::Session(Some(typed))).resolve().await;

        assert_matches!(outcome, CallbackOutcome::SignedIn { role: Role::Applicant, ref target } if target == "/dashboard");
        assert_eq!(h.navigator.current().as_deref(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn provider_error_goes_to_landing() {
        let h = Harness::new();
        let outcome = h
            .resolver(Script::ProviderError("invalid_grant".into()))
            .resolve()
            .await;

        assert_eq!(
            outcome,
            CallbackOutcome::Failed {
                message: "invalid_grant".into()
            }
        );
        let toast = h.notifier.last().unwrap();
        assert_eq!(toast.title, "Authentication failed");
        assert_eq!(toast.description, "invalid_grant");
        assert_eq!(h.navigator.current().as_deref(), Some("/"));
        assert!(h.tokens.read().is_none());
    }

    #[tokio::test]
    async fn empty_provider_message_uses_fallback() {
        let h = Harness::new();
        let _ = h.resolver(Script::ProviderError(String::new())).resolve().await;
        assert_eq!(
            h.notifier.last().unwrap().description,
            "Something went wrong during authentication"
        );
    }

    #[tokio::test]
    async fn no_session_is_incomplete() {
        let h = Harness::new();
        let outcome = h.resolver(Script::Session(None)).resolve().await;
        assert_eq!(outcome, CallbackOutcome::Incomplete);
        assert_eq!(h.notifier.last().unwrap().title, "Authentication incomplete");
        assert_eq!(h.navigator.current().as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn unexpected_error_is_generic() {
        let h = Harness::new();
        let outcome = h.resolver(Script::Unexpected).resolve().await;
        assert_matches!(outcome, CallbackOutcome::Failed { .. });
        assert_eq!(h.notifier.last().unwrap().title, "Authentication error");
        assert_eq!(h.navigator.current().as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn panic_is_caught_and_loading_cleared() {
        let h = Harness::new();
        let resolver = h.resolver(Script::Panic);
        let loading = resolver.loading();
        assert!(*loading.borrow());

        let outcome = resolver.resolve().await;
        assert_matches!(outcome, CallbackOutcome::Failed { .. });
        assert!(!*loading.borrow());
        assert_eq!(h.notifier.last().unwrap().title, "Authentication error");
    }

    #[tokio::test]
    async fn loading_cleared_on_success() {
        let h = Harness::new();
        let resolver = h.resolver(Script::Session(Some(session("abc", None))));
        let loading = resolver.loading();
        let _ = resolver.resolve().await;
        assert!(!*loading.borrow());
    }

    #[tokio::test]
    async fn empty_token_is_not_handed_over() {
        let h = Harness::new();
        let outcome = h
            .resolver(Script::Session(Some(session("", Some("recruiter")))))
            .resolve()
            .await;
        assert_matches!(outcome, CallbackOutcome::SignedIn { .. });
        assert!(h.tokens.read().is_none());
        assert_eq!(h.store.mode(), AuthMode::Uninitialized);
    }

    #[tokio::test]
    async fn custom_session_is_not_displaced() {
        let h = Harness::new();
        let _ = h.store.set_custom_auth("tok1", None);
        let _ = h
            .resolver(Script::Session(Some(session("tok2", None))))
            .resolve()
            .await;
        assert_eq!(h.store.mode(), AuthMode::Custom);
        assert_eq!(h.tokens.read().as_deref(), Some("tok1"));
    }

    #[tokio::test]
    async fn custom_routes() {
        let h = Harness::new();
        let routes = RouteSettings {
            landing: "/home".into(),
            ..RouteSettings::default()
        };
        let _ = h
            .resolver(Script::Session(None))
            .with_routes(routes)
            .resolve()
            .await;
        assert_eq!(h.navigator.current().as_deref(), Some("/home"));
    }
}
