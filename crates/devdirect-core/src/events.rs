//! Session transition events and the broadcast emitter that carries them.
//!
//! Every state change in the session store produces a [`SessionEvent`] with
//! the old and new [`AuthMode`]. Consumers subscribe through
//! [`EventEmitter::subscribe`]; emitting never blocks, and slow receivers lag
//! instead of stalling the store.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::AuthMode;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// Why the session store changed state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    /// A persisted backend token was found at startup.
    PersistedToken,
    /// The external provider's initial session read resolved.
    InitialSession,
    /// A change event from the external provider.
    ProviderEvent,
    /// The redirect callback finalized an external session.
    Callback,
    /// A backend login handed over its token.
    CustomLogin,
    /// Explicit sign-out.
    SignOut,
}

impl TransitionReason {
    /// Stable snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PersistedToken => "persisted_token",
            Self::InitialSession => "initial_session",
            Self::ProviderEvent => "provider_event",
            Self::Callback => "callback",
            Self::CustomLogin => "custom_login",
            Self::SignOut => "sign_out",
        }
    }
}

/// Observable session store event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A committed state change.
    Transition {
        /// Mode before the change.
        from: AuthMode,
        /// Mode after the change.
        to: AuthMode,
        /// What triggered it.
        reason: TransitionReason,
        /// When it was committed.
        timestamp: DateTime<Utc>,
    },
    /// An external update that the mode lock rejected.
    ExternalUpdateIgnored {
        /// What carried the rejected update.
        reason: TransitionReason,
        /// When it was rejected.
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Build a transition event stamped now.
    #[must_use]
    pub fn transition(from: AuthMode, to: AuthMode, reason: TransitionReason) -> Self {
        Self::Transition {
            from,
            to,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Build an ignored-update event stamped now.
    #[must_use]
    pub fn ignored(reason: TransitionReason) -> Self {
        Self::ExternalUpdateIgnored {
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Event name for logs.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Transition { .. } => "session_transition",
            Self::ExternalUpdateIgnored { .. } => "external_update_ignored",
        }
    }
}

/// Broadcast-based emitter for [`SessionEvent`]s.
pub struct EventEmitter {
    tx: broadcast::Sender<SessionEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Create an emitter with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an emitter with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Emit to all subscribers. Returns how many receivers got it.
    pub fn emit(&self, event: SessionEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total number of events emitted.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn emit_with_no_subscribers() {
        let emitter = EventEmitter::new();
        let count = emitter.emit(SessionEvent::ignored(TransitionReason::ProviderEvent));
        assert_eq!(count, 0);
        assert_eq!(emitter.emit_count(), 1);
    }

    #[tokio::test]
    async fn emit_and_receive_transition() {
        let emitter = EventEmitter::new();
        let mut rx = emitter.subscribe();

        let count = emitter.emit(SessionEvent::transition(
            AuthMode::Uninitialized,
            AuthMode::Custom,
            TransitionReason::PersistedToken,
        ));
        assert_eq!(count, 1);

        let received = rx.recv().await.unwrap();
        assert_matches!(
            received,
            SessionEvent::Transition {
                from: AuthMode::Uninitialized,
                to: AuthMode::Custom,
                reason: TransitionReason::PersistedToken,
                ..
            }
        );
    }

    #[test]
    fn subscriber_count_tracks_drops() {
        let emitter = EventEmitter::new();
        let rx1 = emitter.subscribe();
        let rx2 = emitter.subscribe();
        assert_eq!(emitter.subscriber_count(), 2);
        drop(rx1);
        assert_eq!(emitter.subscriber_count(), 1);
        drop(rx2);
        assert_eq!(emitter.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_receiver_lags() {
        let emitter = EventEmitter::with_capacity(1);
        let mut rx = emitter.subscribe();
        let _ = emitter.emit(SessionEvent::ignored(TransitionReason::Callback));
        let _ = emitter.emit(SessionEvent::ignored(TransitionReason::Callback));
        assert_matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        );
    }

    #[test]
    fn event_serde_tagged() {
        let ev = SessionEvent::transition(
            AuthMode::External,
            AuthMode::None,
            TransitionReason::SignOut,
        );
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "transition");
        assert_eq!(json["from"], "external");
        assert_eq!(json["to"], "none");
        assert_eq!(json["reason"], "sign_out");
        assert_eq!(ev.event_type(), "session_transition");
    }

    #[test]
    fn reason_names() {
        assert_eq!(TransitionReason::CustomLogin.as_str(), "custom_login");
        assert_eq!(TransitionReason::PersistedToken.as_str(), "persisted_token");
    }
}
