//! Identity types shared by every DevDirect crate.
//!
//! [`Session`] and [`User`] have no setters: a transition always builds a new
//! value and swaps it in whole. [`AuthMode`] names which provider produced the
//! session currently held, and a held session always carries the same mode in
//! [`Session::provider`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key holding the user's role.
pub const ROLE_METADATA_KEY: &str = "role";

// ─────────────────────────────────────────────────────────────────────────────
// AuthMode
// ─────────────────────────────────────────────────────────────────────────────

/// Which provider is authoritative for the current identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Startup has not resolved yet.
    #[default]
    Uninitialized,
    /// Nobody is signed in.
    None,
    /// Session issued by the external identity provider.
    External,
    /// Session issued by the first-party backend. Locks out external updates.
    Custom,
}

impl AuthMode {
    /// Stable lowercase name, used in log fields and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::None => "none",
            Self::External => "external",
            Self::Custom => "custom",
        }
    }

    /// Whether this mode carries a session.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::External | Self::Custom)
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// Application role of a signed-in user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Job seeker. The fallback for missing or unknown roles.
    #[default]
    Applicant,
    /// Hiring side.
    Recruiter,
}

impl Role {
    /// Parse a role name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applicant" => Some(Self::Applicant),
            "recruiter" => Some(Self::Recruiter),
            _ => None,
        }
    }

    /// Read `metadata["role"]`, defaulting to [`Role::Applicant`].
    #[must_use]
    pub fn from_metadata(metadata: &Map<String, Value>) -> Self {
        metadata
            .get(ROLE_METADATA_KEY)
            .and_then(Value::as_str)
            .and_then(Self::parse)
            .unwrap_or_default()
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applicant => "applicant",
            Self::Recruiter => "recruiter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User / Session
// ─────────────────────────────────────────────────────────────────────────────

/// An authenticated user as reported by the authoritative provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Provider-side identifier.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Role, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Free-form provider metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl User {
    /// Create a user with empty metadata and no role.
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            created_at: Utc::now(),
            role: None,
            metadata: Map::new(),
        }
    }

    /// Builder: set the role, mirroring it into `metadata["role"]`.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        let _ = self.metadata.insert(
            ROLE_METADATA_KEY.to_string(),
            Value::String(role.as_str().to_string()),
        );
        self
    }

    /// Builder: set a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.metadata.insert(key.into(), value.into());
        self
    }

    /// Role used for navigation. Only `metadata["role"]` counts; the typed
    /// field is informational and never overrides it.
    #[must_use]
    pub fn effective_role(&self) -> Role {
        Role::from_metadata(&self.metadata)
    }
}

/// The authenticated-identity bundle held by the session store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token sent with every request.
    pub access_token: String,
    /// Refresh token (empty for backend tokens).
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in_seconds: u64,
    /// Token type, normally `bearer`.
    pub token_type: String,
    /// The signed-in user.
    pub user: User,
    /// Provider that produced this session.
    pub provider: AuthMode,
}

impl Session {
    /// Whether the session carries a usable access token.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Copy of this session re-tagged with another provider.
    #[must_use]
    pub fn with_provider(self, provider: AuthMode) -> Self {
        Self { provider, ..self }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider change events
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of change reported by the external provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderEventKind {
    /// First event after subscribing, carrying the restored session.
    InitialSession,
    /// Interactive sign-in completed.
    SignedIn,
    /// Session ended.
    SignedOut,
    /// Access token was refreshed by the provider.
    TokenRefreshed,
    /// User profile changed.
    UserUpdated,
}

/// A change notification from the external provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderEvent {
    /// What happened.
    pub kind: ProviderEventKind,
    /// Session after the change; `None` when signed out.
    pub session: Option<Session>,
}

impl ProviderEvent {
    /// Build an event.
    #[must_use]
    pub fn new(kind: ProviderEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    /// The session this event establishes. Sign-out events never carry one.
    #[must_use]
    pub fn effective_session(&self) -> Option<&Session> {
        match self.kind {
            ProviderEventKind::SignedOut => None,
            _ => self.session.as_ref(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(token: &str) -> Session {
        Session {
            access_token: token.to_string(),
            refresh_token: String::new(),
            expires_in_seconds: 3600,
            token_type: "bearer".to_string(),
            user: User::new("u1", "a@b.c"),
            provider: AuthMode::External,
        }
    }

    #[test]
    fn auth_mode_display_and_serde() {
        assert_eq!(AuthMode::Custom.to_string(), "custom");
        assert_eq!(
            serde_json::to_string(&AuthMode::External).unwrap(),
            "\"external\""
        );
        assert_eq!(AuthMode::default(), AuthMode::Uninitialized);
    }

    #[test]
    fn auth_mode_is_authenticated() {
        assert!(AuthMode::External.is_authenticated());
        assert!(AuthMode::Custom.is_authenticated());
        assert!(!AuthMode::None.is_authenticated());
        assert!(!AuthMode::Uninitialized.is_authenticated());
    }

    #[test]
    fn role_parse() {
        assert_eq!(Role::parse("recruiter"), Some(Role::Recruiter));
        assert_eq!(Role::parse("applicant"), Some(Role::Applicant));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn role_from_metadata_defaults_to_applicant() {
        let mut meta = Map::new();
        assert_eq!(Role::from_metadata(&meta), Role::Applicant);

        let _ = meta.insert("role".into(), json!("superuser"));
        assert_eq!(Role::from_metadata(&meta), Role::Applicant);

        let _ = meta.insert("role".into(), json!(42));
        assert_eq!(Role::from_metadata(&meta), Role::Applicant);

        let _ = meta.insert("role".into(), json!("recruiter"));
        assert_eq!(Role::from_metadata(&meta), Role::Recruiter);
    }

    #[test]
    fn with_role_mirrors_metadata() {
        let user = User::new("u1", "a@b.c").with_role(Role::Recruiter);
        assert_eq!(user.role, Some(Role::Recruiter));
        assert_eq!(user.metadata["role"], "recruiter");
        assert_eq!(user.effective_role(), Role::Recruiter);
    }

    #[test]
    fn effective_role_reads_metadata_only() {
        let mut user = User::new("u1", "a@b.c").with_metadata("role", "applicant");
        user.role = Some(Role::Recruiter);
        assert_eq!(user.effective_role(), Role::Applicant);

        let typed_only = User {
            role: Some(Role::Recruiter),
            ..User::new("u2", "x@y.z")
        };
        assert_eq!(typed_only.effective_role(), Role::Applicant);
    }

    #[test]
    fn session_serde_camel_case() {
        let json = serde_json::to_value(session("abc")).unwrap();
        assert_eq!(json["accessToken"], "abc");
        assert_eq!(json["expiresInSeconds"], 3600);
        assert_eq!(json["provider"], "external");
        assert!(json["user"].get("role").is_none());
    }

    #[test]
    fn session_with_provider_retags() {
        let s = session("abc").with_provider(AuthMode::Custom);
        assert_eq!(s.provider, AuthMode::Custom);
        assert_eq!(s.access_token, "abc");
    }

    #[test]
    fn has_token() {
        assert!(session("abc").has_token());
        assert!(!session("").has_token());
    }

    #[test]
    fn signed_out_event_has_no_effective_session() {
        let ev = ProviderEvent::new(ProviderEventKind::SignedOut, Some(session("abc")));
        assert!(ev.effective_session().is_none());

        let ev = ProviderEvent::new(ProviderEventKind::SignedIn, Some(session("abc")));
        assert_eq!(ev.effective_session().unwrap().access_token, "abc");
    }

    #[test]
    fn provider_event_kind_serde() {
        assert_eq!(
            serde_json::to_string(&ProviderEventKind::TokenRefreshed).unwrap(),
            "\"TOKEN_REFRESHED\""
        );
    }
}
