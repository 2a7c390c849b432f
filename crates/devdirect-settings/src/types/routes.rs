//! Navigation targets used after authentication.

use serde::{Deserialize, Serialize};

/// Routes the callback resolver navigates to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteSettings {
    /// Public landing page; every failed or incomplete sign-in ends here.
    pub landing: String,
    /// Applicant home.
    pub applicant_dashboard: String,
    /// Recruiter home.
    pub recruiter_dashboard: String,
    /// Where the external provider redirects after sign-in.
    pub callback: String,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            landing: "/".to_string(),
            applicant_dashboard: "/dashboard".to_string(),
            recruiter_dashboard: "/recruiter/dashboard".to_string(),
            callback: "/auth/callback".to_string(),
        }
    }
}

impl RouteSettings {
    /// Absolute callback URL for `origin` (e.g. `https://app.devdirect.id`).
    pub fn callback_url(&self, origin: &str) -> String {
        format!("{}{}", origin.trim_end_matches('/'), self.callback)
    }
}
