//! Auth error types.

use std::fmt;

/// Four-way classification used to decide how an error propagates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The identity service returned an error. Terminal for the callback flow.
    Provider,
    /// The provider succeeded but returned no session. Terminal for the callback flow.
    NoSession,
    /// The durable token store failed. Swallowed; the session stays in memory.
    Persistence,
    /// Anything else.
    Unexpected,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Provider => "provider",
            Self::NoSession => "no_session",
            Self::Persistence => "persistence",
            Self::Unexpected => "unexpected",
        })
    }
}

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The identity service reported an error.
    #[error("provider error: {message}")]
    Provider {
        /// Message from the provider.
        message: String,
    },

    /// The provider returned no session.
    #[error("no session returned by provider")]
    NoSession,

    /// The durable token store failed.
    #[error("token persistence failed: {0}")]
    Persistence(String),

    /// The backend answered with an error status or an unsuccessful body.
    #[error("backend error ({status}): {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `SessionStore::initialize` was called twice.
    #[error("session store already initialized")]
    AlreadyInitialized,

    /// Anything else.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AuthError {
    /// Shorthand for [`AuthError::Provider`].
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Classification of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Provider { .. } | Self::Backend { .. } => ErrorCategory::Provider,
            Self::NoSession => ErrorCategory::NoSession,
            Self::Persistence(_) | Self::Io(_) => ErrorCategory::Persistence,
            Self::Http(_) | Self::Json(_) | Self::AlreadyInitialized | Self::Unexpected(_) => {
                ErrorCategory::Unexpected
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let err = AuthError::provider("invalid_grant");
        assert_eq!(err.to_string(), "provider error: invalid_grant");
        assert_eq!(err.category(), ErrorCategory::Provider);
    }

    #[test]
    fn backend_error_display() {
        let err = AuthError::Backend {
            status: 401,
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.to_string(), "backend error (401): Invalid credentials");
        assert_eq!(err.category(), ErrorCategory::Provider);
    }

    #[test]
    fn io_error_is_persistence() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AuthError::from(io_err);
        assert!(err.to_string().contains("denied"));
        assert_eq!(err.category(), ErrorCategory::Persistence);
    }

    #[test]
    fn remaining_categories() {
        assert_eq!(AuthError::NoSession.category(), ErrorCategory::NoSession);
        assert_eq!(
            AuthError::Unexpected("boom".into()).category(),
            ErrorCategory::Unexpected
        );
        assert_eq!(
            AuthError::AlreadyInitialized.category(),
            ErrorCategory::Unexpected
        );
        assert_eq!(ErrorCategory::NoSession.to_string(), "no_session");
    }
}
