//! WebSocket layer: player connections, the per-player receive loop and
//! snapshot broadcasting.

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod session;
