//! # lingo
//!
//! Multiplayer word-guessing server binary: loads settings and word lists,
//! starts the HTTP/WebSocket server, and shuts down on ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lingo_core::{WordList, WordSource};
use lingo_server::{LingoServer, ServerConfig};
use lingo_settings::{LingoSettings, LoggingSettings, ServerSettings};
use tracing_subscriber::EnvFilter;

/// Lingo game server.
#[derive(Parser, Debug)]
#[command(name = "lingo", about = "Multiplayer word-guessing game server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.lingo/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn apply(&self, settings: &mut LingoSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.log_json {
            settings.logging.json = true;
        }
    }
}

fn server_config(settings: &ServerSettings) -> ServerConfig {
    ServerConfig {
        host: settings.host.clone(),
        port: settings.port,
        cors_origin: settings.cors_origin.clone(),
        send_queue_capacity: settings.send_queue_capacity,
        heartbeat_interval_secs: settings.heartbeat_interval_secs,
        heartbeat_timeout_secs: settings.heartbeat_timeout_secs,
        max_message_size: settings.max_message_size,
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = match &args.settings {
        Some(path) => lingo_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => lingo_settings::load_settings().context("Failed to load settings")?,
    };
    args.apply(&mut settings);
    init_tracing(&settings.logging);

    let words = WordList::load(
        &settings.words.targets_path,
        settings.words.guesses_path.as_deref(),
        &settings.words.fallback_target,
    );
    tracing::info!(
        targets = words.targets().len(),
        dictionary = words.has_dictionary(),
        "word list ready"
    );
    let words: Arc<dyn WordSource> = Arc::new(words);

    let server = LingoServer::new(server_config(&settings.server), words);
    let (addr, serve_handle) = server
        .listen()
        .await
        .with_context(|| format!("Failed to bind {}", server.config().bind_addr()))?;
    tracing::info!(%addr, "lingo ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    server
        .shutdown()
        .graceful_shutdown(vec![serve_handle], None)
        .await;
    Ok(())
}
