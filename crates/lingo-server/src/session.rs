//! One game: target word, guess log, completion flag and attached players.
//!
//! All mutable state sits behind a single `parking_lot::Mutex`. Attaching a
//! player and submitting a guess each run as one critical section that also
//! enqueues the resulting messages, so players see snapshots in log order
//! and a late joiner sees the history before any newer guess. The lock is
//! never held across an `.await`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lingo_core::{
    GameError, GameId, GameSummary, Guess, GuessRejected, InvalidReason, PlayerOrdinal, Snapshot,
    WordSource, compute_feedback, normalize_guess,
};
use parking_lot::Mutex;

use crate::websocket::broadcast;
use crate::websocket::connection::PlayerConnection;

/// A freshly attached player.
#[derive(Clone, Debug)]
pub struct Attached {
    pub ordinal: PlayerOrdinal,
    pub snapshot: Snapshot,
}

/// An accepted guess and the snapshot broadcast for it.
#[derive(Clone, Debug)]
pub struct Accepted {
    pub guess: Guess,
    pub snapshot: Snapshot,
    pub delivery: broadcast::Delivery,
}

#[derive(Default)]
struct SessionState {
    guesses: Vec<Guess>,
    completed: bool,
    players: Vec<Arc<PlayerConnection>>,
}

impl SessionState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            guesses: self.guesses.clone(),
            completed: self.completed,
        }
    }
}

pub struct Session {
    id: GameId,
    seq: u64,
    name: String,
    target: String,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
}

impl Session {
    /// `target` is stored uppercase.
    pub fn new(id: GameId, seq: u64, name: impl Into<String>, target: &str) -> Self {
        Self {
            id,
            seq,
            name: name.into(),
            target: normalize_guess(target),
            created_at: Utc::now(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &GameId {
        &self.id
    }

    /// Creation order within the owning registry.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time since the game was created.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Number of letters in the target word.
    pub fn word_len(&self) -> usize {
        self.target.chars().count()
    }

    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    pub fn player_count(&self) -> usize {
        self.state.lock().players.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().snapshot()
    }

    /// Lobby entry, or `None` once the game is completed.
    pub fn summary_if_active(&self) -> Option<GameSummary> {
        let state = self.state.lock();
        (!state.completed).then(|| GameSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            players: state.players.len(),
        })
    }

    /// Add `conn` to the players and enqueue its join handshake.
    ///
    /// The connection is bound to this game first; a connection that already
    /// joined a game is refused without touching this one.
    pub fn attach(&self, conn: &Arc<PlayerConnection>) -> Result<Attached, GameError> {
        conn.bind_game(self.id.clone())?;

        let mut state = self.state.lock();
        let ordinal = PlayerOrdinal::after(state.players.len());
        state.players.push(Arc::clone(conn));
        let snapshot = state.snapshot();
        let _ = broadcast::greet(conn, ordinal, &snapshot);
        drop(state);

        Ok(Attached { ordinal, snapshot })
    }

    /// Validate, score and append a guess, then broadcast the new snapshot.
    ///
    /// Rejections leave the game untouched and broadcast nothing.
    pub fn submit_guess(
        &self,
        player: PlayerOrdinal,
        raw_word: &str,
        words: &dyn WordSource,
    ) -> Result<Accepted, GuessRejected> {
        let word = normalize_guess(raw_word);

        let mut state = self.state.lock();
        if state.completed {
            return Err(GuessRejected::SessionCompleted);
        }
        self.validate(&word, words)?;

        let guess = Guess {
            player: player.label(),
            result: compute_feedback(&word, &self.target),
            word,
        };
        if guess.word == self.target {
            state.completed = true;
        }
        state.guesses.push(guess.clone());

        let snapshot = state.snapshot();
        let delivery = broadcast::broadcast_snapshot(&self.id, &state.players, &snapshot);
        drop(state);

        Ok(Accepted {
            guess,
            snapshot,
            delivery,
        })
    }

    fn validate(&self, word: &str, words: &dyn WordSource) -> Result<(), GuessRejected> {
        let reject = |reason| GuessRejected::InvalidWord {
            word: word.to_string(),
            reason,
        };
        if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(reject(InvalidReason::NotAlphabetic));
        }
        let actual = word.chars().count();
        let expected = self.word_len();
        if actual != expected {
            return Err(reject(InvalidReason::LengthMismatch { expected, actual }));
        }
        // Targets are always guessable, whatever the dictionary says.
        if word != self.target && !words.is_valid_guess(word) {
            return Err(reject(InvalidReason::NotInDictionary));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> &str {
        &self.target
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("word_len", &self.word_len())
            .finish_non_exhaustive()
    }
}
