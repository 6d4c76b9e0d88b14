//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`LingoSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate values the server cannot run with
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::LingoSettings;

/// Resolve the path to the settings file (`~/.lingo/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".lingo").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LingoSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or the result fails validation, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<LingoSettings> {
    let mut settings = read_layers(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn read_layers(path: &Path) -> Result<LingoSettings> {
    let defaults = serde_json::to_value(LingoSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
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

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored (with a warning) and the file/default value
/// is kept.
pub fn apply_env_overrides(settings: &mut LingoSettings) {
    if let Some(v) = read_env_string("LINGO_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("LINGO_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("CORS_ORIGIN") {
        settings.server.cors_origin = v;
    }
    if let Some(v) = read_env_usize("LINGO_SEND_QUEUE", 1, 65_536) {
        settings.server.send_queue_capacity = v;
    }
    if let Some(v) = read_env_string("LINGO_WORDLIST") {
        settings.words.targets_path = PathBuf::from(v);
    }
    if let Some(v) = read_env_string("LINGO_VALID_GUESSES") {
        settings.words.guesses_path = Some(PathBuf::from(v));
    }
    if let Some(v) = read_env_bool("LINGO_LOG_JSON") {
        settings.logging.json = v;
    }
}

/// Reject settings the server cannot start with.
pub fn validate(settings: &LingoSettings) -> Result<()> {
    let server = &settings.server;
    if server.send_queue_capacity == 0 {
        return Err(SettingsError::invalid(
            "server.sendQueueCapacity",
            "must be at least 1",
        ));
    }
    if server.heartbeat_interval_secs == 0 {
        return Err(SettingsError::invalid(
            "server.heartbeatIntervalSecs",
            "must be at least 1",
        ));
    }
    if server.heartbeat_timeout_secs < server.heartbeat_interval_secs {
        return Err(SettingsError::invalid(
            "server.heartbeatTimeoutSecs",
            format!(
                "{} is shorter than the ping interval ({})",
                server.heartbeat_timeout_secs, server.heartbeat_interval_secs
            ),
        ));
    }
    if settings.words.fallback_target.trim().is_empty() {
        return Err(SettingsError::invalid(
            "words.fallbackTarget",
            "must not be empty",
        ));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

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

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}
