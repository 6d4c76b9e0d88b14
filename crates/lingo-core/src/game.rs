//! Game records shared between the session layer and the wire layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::GameId;

/// 1-based join position of a player within one game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerOrdinal(usize);

impl PlayerOrdinal {
    /// Ordinal for the player that made the set `players_before + 1` long.
    pub fn after(players_before: usize) -> Self {
        Self(players_before + 1)
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Display label recorded on guesses (`Player 3`).
    pub fn label(self) -> String {
        format!("Player {}", self.0)
    }
}

impl fmt::Display for PlayerOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One accepted guess. Immutable once appended to a game's log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guess {
    /// Label of the player who guessed.
    pub player: String,
    /// Uppercase guessed word, same length as the target.
    pub word: String,
    /// Feedback code string (`G`/`Y`/`X` per position).
    pub result: String,
}

/// Point-in-time view of a game, as broadcast to its players.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub guesses: Vec<Guess>,
    pub completed: bool,
}

/// Lobby entry for a game that is still open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: GameId,
    pub name: String,
    /// Number of players that have joined (disconnects are not subtracted).
    pub players: usize,
}
