//! # lingo-server
//!
//! Game sessions and the Axum HTTP + `WebSocket` layer in front of them.
//!
//! - [`registry`]: owns every game, allocates ids, serializes mutation per game
//! - [`session`]: one game's state and its guess-submission critical section
//! - [`websocket`]: player connections, the per-player receive loop, broadcast
//! - [`routes`]: `/start`, `/games`, `/join`, `/health`
//! - [`server`]: router, CORS, listen
//! - [`shutdown`]: graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod protocol;
pub mod registry;
pub mod routes;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use registry::{GuessOutcome, SessionRegistry};
pub use server::LingoServer;
pub use session::Session;
