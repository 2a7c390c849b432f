//! # devdirect-settings
//!
//! Configuration for the DevDirect session layer, loaded from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`DevDirectSettings::default()`]
//! 2. **Settings file**: `~/.devdirect/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `DEVDIRECT_*` overrides
//!
//! Settings are loaded once by the application and passed down explicitly;
//! there is no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{data_dir, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = DevDirectSettings::default();
        assert!(loader::validate(&settings).is_ok());
        assert_eq!(settings.routes.landing, "/");
        assert_eq!(settings.routes.applicant_dashboard, "/dashboard");
        assert_eq!(settings.routes.recruiter_dashboard, "/recruiter/dashboard");
        assert_eq!(settings.routes.callback, "/auth/callback");
        assert_eq!(settings.storage.legacy_keys, vec!["auth_token"]);
        assert_eq!(settings.session.placeholder_user_id, "backend-user");
    }

    #[test]
    fn settings_path_under_data_dir() {
        assert!(settings_path().starts_with(data_dir()));
    }
}
