//! Settings type definitions.
//!
//! All types use camelCase field names and `#[serde(default)]`, so a partial
//! JSON file only needs the keys it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LingoSettings {
    pub server: ServerSettings,
    pub words: WordSettings,
    pub logging: LoggingSettings,
}

/// Network and connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Origin allowed by the CORS layer.
    pub cors_origin: String,
    /// Capacity of each connection's outbound queue.
    pub send_queue_capacity: usize,
    /// Seconds between WebSocket pings.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this many seconds without a pong.
    pub heartbeat_timeout_secs: u64,
    /// Largest accepted inbound WebSocket message, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origin: "http://localhost:5173".to_string(),
            send_queue_capacity: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
        }
    }
}

/// Word list locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordSettings {
    /// Newline-separated candidate target words.
    pub targets_path: PathBuf,
    /// Newline-separated dictionary of acceptable guesses. `None` accepts
    /// any alphabetic word.
    pub guesses_path: Option<PathBuf>,
    /// Target used when the target list is missing or empty.
    pub fallback_target: String,
}

impl Default for WordSettings {
    fn default() -> Self {
        Self {
            targets_path: PathBuf::from("data/wordlist.txt"),
            guesses_path: Some(PathBuf::from("data/valid_guesses.txt")),
            fallback_target: "CRANE".to_string(),
        }
    }
}

/// Log output settings. `RUST_LOG` still wins over `level`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
