//! First-party backend auth endpoints.
//!
//! `POST /auth/login` and `POST /auth/register` both answer with an
//! [`AuthResponse`] envelope. Error statuses usually carry the same envelope
//! in the body; those are returned as-is so the caller can read `message`.
//! Only transport failures and unreadable error bodies become errors.

use chrono::{DateTime, Utc};
use devdirect_core::{Role, User};
use devdirect_settings::ApiSettings;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::errors::AuthError;

/// Login credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Registration payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Requested role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Envelope status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Request succeeded.
    Success,
    /// Request failed; see `message` / `error`.
    Error,
}

/// User as reported by the backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendUser {
    /// Backend identifier.
    pub id: String,
    /// Email.
    pub email: String,
    /// How the account was created (`email`, `google`, ...).
    #[serde(default)]
    pub auth_provider: String,
    /// Role name.
    #[serde(default)]
    pub role: String,
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created_at: String,
}

impl BackendUser {
    /// Convert into the shared [`User`] type.
    ///
    /// The role is mirrored into metadata only when it is a known role.
    /// An unparseable `created_at` falls back to now.
    pub fn into_user(self) -> User {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let mut user = User::new(self.id, self.email);
        user.created_at = created_at;
        if !self.auth_provider.is_empty() {
            user = user.with_metadata("auth_provider", self.auth_provider);
        }
        match Role::parse(&self.role) {
            Some(role) => user.with_role(role),
            None => user,
        }
    }
}

/// Payload of a successful login or registration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthData {
    /// Opaque bearer token.
    pub token: String,
    /// The account.
    pub user: BackendUser,
}

/// Response envelope shared by the auth endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Outcome.
    pub status: ResponseStatus,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Token and user on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AuthData>,
    /// Error detail on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResponse {
    /// Token and user when the call succeeded with a non-empty token.
    pub fn into_credentials(self, status: u16) -> Result<AuthData, AuthError> {
        match (self.status, self.data) {
            (ResponseStatus::Success, Some(data)) if !data.token.is_empty() => Ok(data),
            (_, _) => Err(AuthError::Backend {
                status,
                message: self.error.filter(|e| !e.is_empty()).unwrap_or(self.message),
            }),
        }
    }
}

/// Client for the backend auth endpoints.
#[derive(Clone, Debug)]
pub struct BackendAuthApi {
    client: ApiClient,
    login_path: String,
    register_path: String,
}

impl BackendAuthApi {
    /// Use the default endpoint paths.
    pub fn new(client: ApiClient) -> Self {
        Self::with_settings(client, &ApiSettings::default())
    }

    /// Use the endpoint paths from settings.
    pub fn with_settings(client: ApiClient, settings: &ApiSettings) -> Self {
        Self {
            client,
            login_path: settings.login_path.clone(),
            register_path: settings.register_path.clone(),
        }
    }

    /// `POST /auth/login`.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest) -> Result<(u16, AuthResponse), AuthError> {
        self.post(&self.login_path, request).await
    }

    /// `POST /auth/register`.
    #[tracing::instrument(skip_all)]
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<(u16, AuthResponse), AuthError> {
        self.post(&self.register_path, request).await
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(u16, AuthResponse), AuthError> {
        let resp = self.client.post(path).json(body).send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;

        match serde_json::from_str::<AuthResponse>(&text) {
            Ok(parsed) => {
                tracing::debug!(path, status, outcome = ?parsed.status, "backend auth response");
                Ok((status, parsed))
            }
            Err(_) if !(200..300).contains(&status) => Err(AuthError::Backend {
                status,
                message: text,
            }),
            Err(e) => Err(AuthError::Json(e)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
