//! JSON wire messages.
//!
//! Field names match the browser client: snake_case keys, `game_id` /
//! `player_number`, and a bare `{"error": ..}` object for join failures.
//! Broadcasts are a serialized [`Snapshot`](lingo_core::Snapshot).

use lingo_core::{GameId, GameSummary, Guess, PlayerOrdinal};
use serde::{Deserialize, Serialize};

/// Body of `POST /start`.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub game_name: String,
}

/// Reply to `POST /start`.
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub game_id: GameId,
    pub game_name: String,
}

/// Reply to `GET /games`.
#[derive(Debug, Serialize)]
pub struct GamesResponse {
    pub games: Vec<GameSummary>,
}

/// First frame a client sends on `/join`.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub game_id: GameId,
}

/// Every later client frame.
#[derive(Debug, Deserialize)]
pub struct GuessMessage {
    pub word: String,
}

/// Sent once to a player right after it is attached.
#[derive(Debug, Serialize)]
pub struct JoinedMessage<'a> {
    pub player_number: PlayerOrdinal,
    pub guesses: &'a [Guess],
    pub completed: bool,
}

/// Sent before closing a connection that could not join.
#[derive(Debug, Serialize)]
pub struct ErrorMessage<'a> {
    pub error: &'a str,
}

pub fn parse_join(text: &str) -> Option<JoinRequest> {
    serde_json::from_str(text).ok()
}

pub fn parse_guess(text: &str) -> Option<GuessMessage> {
    serde_json::from_str(text).ok()
}
