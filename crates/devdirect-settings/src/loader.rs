//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`DevDirectSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `DEVDIRECT_*` environment overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::DevDirectSettings;

/// Directory holding settings and the token storage file (`~/.devdirect`).
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".devdirect")
}

/// Path to the settings file (`~/.devdirect/settings.json`).
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DevDirectSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<DevDirectSettings> {
    let defaults = serde_json::to_value(DevDirectSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: DevDirectSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `DEVDIRECT_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut DevDirectSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary lookup.
///
/// Empty values are ignored. Numbers outside their range are logged and
/// ignored.
pub fn apply_overrides_from<F>(settings: &mut DevDirectSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("DEVDIRECT_API_BASE_URL") {
        settings.api.base_url = v;
    }
    if let Some(v) = read("DEVDIRECT_API_TIMEOUT_MS") {
        match parse_u64_range(&v, 100, 600_000) {
            Some(ms) => settings.api.timeout_ms = ms,
            None => tracing::warn!(key = "DEVDIRECT_API_TIMEOUT_MS", value = %v, "invalid u64 env var, ignoring"),
        }
    }
    if let Some(v) = read("DEVDIRECT_STORAGE_PATH") {
        settings.storage.path = v;
    }
    if let Some(v) = read("DEVDIRECT_TOKEN_KEY") {
        settings.storage.token_key = v;
    }
    if let Some(v) = read("DEVDIRECT_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("DEVDIRECT_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => tracing::warn!(key = "DEVDIRECT_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

/// Reject settings the session layer cannot run with.
pub fn validate(settings: &DevDirectSettings) -> Result<()> {
    let base = settings.api.base_url.as_str();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(SettingsError::InvalidValue(format!(
            "api.baseUrl must be an http(s) URL, got {base:?}"
        )));
    }
    if settings.api.timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "api.timeoutMs must be positive".to_string(),
        ));
    }
    if settings.storage.token_key.is_empty() {
        return Err(SettingsError::InvalidValue(
            "storage.tokenKey is empty".to_string(),
        ));
    }
    Ok(())
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
