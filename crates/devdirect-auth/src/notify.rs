//! User-facing feedback and navigation seams.
//!
//! The auth flows never render anything themselves. They hand a [`Toast`] to
//! a [`Notifier`] and a route to a [`Navigator`]; the host application decides
//! what those mean.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Severity of a toast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Error,
    /// Neutral information.
    Info,
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        })
    }
}

/// A short notification shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    /// Severity.
    pub kind: ToastKind,
    /// Headline.
    pub title: String,
    /// Detail line.
    pub description: String,
}

impl Toast {
    /// Success toast.
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, title, description)
    }

    /// Error toast.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, title, description)
    }

    /// Informational toast.
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, title, description)
    }

    fn new(kind: ToastKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Shows toasts.
pub trait Notifier: Send + Sync {
    /// Show `toast`. Must not block.
    fn notify(&self, toast: Toast);
}

/// Performs client-side navigation.
pub trait Navigator: Send + Sync {
    /// Navigate to `route`.
    fn navigate(&self, route: &str);
}

/// Notifier that writes toasts to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.kind {
            ToastKind::Error => {
                tracing::warn!(title = %toast.title, description = %toast.description, "toast");
            }
            ToastKind::Success | ToastKind::Info => {
                tracing::info!(kind = %toast.kind, title = %toast.title, description = %toast.description, "toast");
            }
        }
    }
}

/// Notifier that keeps every toast, for headless hosts and tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts shown so far, oldest first.
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }

    /// Most recent toast.
    pub fn last(&self) -> Option<Toast> {
        self.toasts.lock().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }
}

/// Navigator that keeps every route, for headless hosts and tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes visited so far, oldest first.
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().clone()
    }

    /// Most recent route.
    pub fn current(&self) -> Option<String> {
        self.routes.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        tracing::debug!(route, "navigate");
        self.routes.lock().push(route.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devdirect_core::logging::test_utils::capture_logs;
    use tracing::Level;

    #[test]
    fn constructors_set_kind() {
        assert_eq!(Toast::success("a", "b").kind, ToastKind::Success);
        assert_eq!(Toast::error("a", "b").kind, ToastKind::Error);
        assert_eq!(Toast::info("a", "b").kind, ToastKind::Info);
    }

    #[test]
    fn recording_notifier_shares_state_across_clones() {
        let notifier = RecordingNotifier::new();
        let handle = notifier.clone();
        notifier.notify(Toast::error("Authentication failed", "bad code"));
        assert_eq!(handle.toasts().len(), 1);
        assert_eq!(handle.last().unwrap().title, "Authentication failed");
    }

    #[test]
    fn recording_navigator_tracks_current_route() {
        let nav = RecordingNavigator::new();
        assert!(nav.current().is_none());
        nav.navigate("/");
        nav.navigate("/dashboard");
        assert_eq!(nav.routes(), vec!["/", "/dashboard"]);
        assert_eq!(nav.current().as_deref(), Some("/dashboard"));
    }

    #[test]
    fn tracing_notifier_logs_errors_at_warn() {
        let (logs, _guard) = capture_logs();
        TracingNotifier.notify(Toast::error("Authentication error", "boom"));
        TracingNotifier.notify(Toast::success("Welcome", "signed in"));
        assert_eq!(logs.count_at_level(Level::WARN), 1);
        assert!(logs.has_field("title", "Welcome"));
    }

    #[test]
    fn toast_serde() {
        let json = serde_json::to_value(Toast::info("t", "d")).unwrap();
        assert_eq!(json["kind"], "info");
    }
}
