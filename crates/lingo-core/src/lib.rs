//! # lingo-core
//!
//! Domain core for the lingo game server.
//!
//! - [`feedback`]: per-letter scoring of a guess against the target word
//! - [`game`]: guess records, snapshots and lobby summaries
//! - [`words`]: the [`words::WordSource`] seam and a file-backed word list
//! - [`ids`]: branded identifiers for games and connections
//! - [`errors`]: error taxonomy shared by the server layers

#![deny(unsafe_code)]

pub mod errors;
pub mod feedback;
pub mod game;
pub mod ids;
pub mod words;

pub use errors::{GameError, GuessRejected, InvalidReason, TransportError, WordListError};
pub use feedback::{LetterMark, compute_feedback};
pub use game::{GameSummary, Guess, PlayerOrdinal, Snapshot};
pub use ids::{ConnectionId, GameId};
pub use words::{FALLBACK_TARGET, WordList, WordSource, normalize_guess};
