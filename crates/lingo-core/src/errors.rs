//! Error taxonomy.
//!
//! Only [`GameError`] is surfaced to clients. [`GuessRejected`] covers the
//! guesses that are dropped without a reply, and [`TransportError`] ends a
//! single connection without touching the game it was attached to.

use std::path::PathBuf;

use thiserror::Error;

use crate::ids::GameId;

/// Failures at the create/join/list entry points.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("game not found: {0}")]
    SessionNotFound(GameId),
    #[error("connection already attached to {game_id}")]
    AlreadyAttached { game_id: GameId },
}

impl GameError {
    /// Message sent to the client over the wire.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "Game not found",
            Self::AlreadyAttached { .. } => "Already joined a game",
        }
    }
}

/// Why a word failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidReason {
    LengthMismatch { expected: usize, actual: usize },
    NotAlphabetic,
    NotInDictionary,
}

/// A guess that was not appended to the log.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GuessRejected {
    #[error("game already completed")]
    SessionCompleted,
    #[error("invalid word {word:?}: {reason:?}")]
    InvalidWord { word: String, reason: InvalidReason },
}

impl GuessRejected {
    /// Short classification for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionCompleted => "completed",
            Self::InvalidWord { .. } => "invalid_word",
        }
    }
}

/// Read or write failure on one player connection.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Failure loading a word file.
#[derive(Debug, Error)]
pub enum WordListError {
    #[error("failed to read word list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
