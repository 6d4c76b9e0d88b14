//! # lingo-settings
//!
//! Layered configuration for the lingo server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`LingoSettings::default()`]
//! 2. **User file**: `~/.lingo/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `LINGO_*` and `CORS_ORIGIN` overrides
//!
//! The loaded value is built once at startup and handed to the server; there
//! is no global settings instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
