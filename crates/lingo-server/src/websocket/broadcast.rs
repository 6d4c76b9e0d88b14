//! Snapshot fan-out to the players of one game.
//!
//! Delivery is best-effort: a failed enqueue is logged and counted, never
//! retried, and never removes the player from the game. Callers invoke these
//! while holding the game's lock, so every player receives snapshots in the
//! order the guesses were appended.

use std::sync::Arc;

use lingo_core::{GameId, PlayerOrdinal, Snapshot};
use metrics::counter;
use tracing::{debug, warn};

use super::connection::PlayerConnection;
use crate::protocol::JoinedMessage;

/// Outcome of one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// Send `snapshot` to every player of `game_id`.
pub fn broadcast_snapshot(
    game_id: &GameId,
    players: &[Arc<PlayerConnection>],
    snapshot: &Snapshot,
) -> Delivery {
    let json = match serde_json::to_string(snapshot) {
        Ok(j) => Arc::new(j),
        Err(e) => {
            warn!(game_id = %game_id, error = %e, "failed to serialize snapshot");
            return Delivery {
                delivered: 0,
                failed: players.len(),
            };
        }
    };

    let mut delivery = Delivery::default();
    for conn in players {
        if conn.send(Arc::clone(&json)) {
            delivery.delivered += 1;
        } else {
            delivery.failed += 1;
            counter!("broadcast_failures_total").increment(1);
            if !conn.is_closed() {
                warn!(conn_id = %conn.id, game_id = %game_id, "failed to send snapshot to player");
            }
        }
    }
    debug!(
        game_id = %game_id,
        guesses = snapshot.guesses.len(),
        delivered = delivery.delivered,
        failed = delivery.failed,
        "broadcast snapshot"
    );
    delivery
}

/// Send the join handshake (ordinal plus current history) to one player.
pub fn greet(conn: &PlayerConnection, ordinal: PlayerOrdinal, snapshot: &Snapshot) -> bool {
    let sent = conn.send_json(&JoinedMessage {
        player_number: ordinal,
        guesses: &snapshot.guesses,
        completed: snapshot.completed,
    });
    if !sent {
        counter!("broadcast_failures_total").increment(1);
        warn!(conn_id = %conn.id, "failed to send join snapshot to player");
    }
    sent
}
