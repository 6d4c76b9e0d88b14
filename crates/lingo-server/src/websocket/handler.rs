//! Per-player receive loop, independent of the socket type.
//!
//! The inbound side is any stream of text frames, so the loop can be driven
//! by an axum `WebSocket` in production and by an in-memory channel in
//! tests. Outbound traffic always goes through the [`PlayerConnection`]
//! queue.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use lingo_core::{GameId, PlayerOrdinal, TransportError};
use tracing::{debug, info, warn};

use super::connection::PlayerConnection;
use crate::protocol::{self, ErrorMessage};
use crate::registry::{GuessOutcome, SessionRegistry};

/// Message sent when the first frame is not a join request.
pub const INVALID_JOIN: &str = "Invalid join request";

/// Why a player loop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// The peer closed the connection or the stream ended.
    PeerClosed,
    /// Reading from the transport failed.
    Transport(TransportError),
    /// The connection was closed locally (heartbeat, shutdown).
    Cancelled,
    /// The handshake failed; the client was told why.
    JoinRefused(String),
}

/// Run one connection from handshake to close.
///
/// The first frame must be `{"game_id": ..}`. On success the player's
/// greeting is already queued and the receive loop starts; on failure an
/// `{"error": ..}` message is queued and the connection closes. The
/// connection is always closed on return.
pub async fn handle_connection<S>(
    mut inbound: S,
    conn: Arc<PlayerConnection>,
    registry: Arc<SessionRegistry>,
) -> LoopExit
where
    S: Stream<Item = Result<String, TransportError>> + Unpin,
{
    let exit = match join(&mut inbound, &conn, &registry).await {
        Ok((game_id, ordinal)) => {
            run_player_loop(&mut inbound, &conn, &registry, &game_id, ordinal).await
        }
        Err(exit) => exit,
    };
    conn.close();
    exit
}

/// Read the join frame and attach the connection to the requested game.
async fn join<S>(
    inbound: &mut S,
    conn: &Arc<PlayerConnection>,
    registry: &SessionRegistry,
) -> Result<(GameId, PlayerOrdinal), LoopExit>
where
    S: Stream<Item = Result<String, TransportError>> + Unpin,
{
    let text = next_frame(inbound, conn).await?;
    let Some(request) = protocol::parse_join(&text) else {
        warn!(conn_id = %conn.id, "first frame is not a join request");
        return Err(refuse(conn, INVALID_JOIN));
    };
    match registry.attach_player(&request.game_id, conn) {
        Ok(attached) => Ok((request.game_id, attached.ordinal)),
        Err(e) => {
            info!(conn_id = %conn.id, error = %e, "join refused");
            Err(refuse(conn, e.client_message()))
        }
    }
}

/// Receive guesses until the connection ends.
///
/// Accepted guesses are broadcast by the game itself; dropped guesses and
/// unparseable frames are logged and ignored.
pub async fn run_player_loop<S>(
    inbound: &mut S,
    conn: &PlayerConnection,
    registry: &SessionRegistry,
    game_id: &GameId,
    player: PlayerOrdinal,
) -> LoopExit
where
    S: Stream<Item = Result<String, TransportError>> + Unpin,
{
    loop {
        let text = match next_frame(inbound, conn).await {
            Ok(text) => text,
            Err(exit) => {
                debug!(conn_id = %conn.id, game_id = %game_id, ?exit, "player loop ended");
                return exit;
            }
        };
        let Some(message) = protocol::parse_guess(&text) else {
            warn!(conn_id = %conn.id, game_id = %game_id, len = text.len(), "ignoring unparseable frame");
            continue;
        };
        match registry.submit_guess(game_id, player, &message.word) {
            Ok(GuessOutcome::Accepted(_) | GuessOutcome::Dropped(_)) => {}
            Err(e) => {
                warn!(conn_id = %conn.id, error = %e, "game vanished under attached player");
                return LoopExit::Cancelled;
            }
        }
    }
}

async fn next_frame<S>(inbound: &mut S, conn: &PlayerConnection) -> Result<String, LoopExit>
where
    S: Stream<Item = Result<String, TransportError>> + Unpin,
{
    tokio::select! {
        biased;
        () = conn.closed() => Err(LoopExit::Cancelled),
        frame = inbound.next() => match frame {
            Some(Ok(text)) => Ok(text),
            Some(Err(TransportError::Closed)) | None => Err(LoopExit::PeerClosed),
            Some(Err(e)) => Err(LoopExit::Transport(e)),
        },
    }
}

fn refuse(conn: &PlayerConnection, message: &str) -> LoopExit {
    let _ = conn.send_json(&ErrorMessage { error: message });
    LoopExit::JoinRefused(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::tests::make_connection;
    use futures::channel::mpsc as frame_channel;
    use futures::stream;
    use lingo_core::WordList;
    use tokio::sync::mpsc;

    fn registry() -> Arc<SessionRegistry> {
        let words = WordList::new(vec!["CRANE"], None::<Vec<String>>);
        Arc::new(SessionRegistry::new(Arc::new(words)))
    }

    fn frames(texts: &[&str]) -> impl Stream<Item = Result<String, TransportError>> + Unpin + use<> {
        stream::iter(
            texts
                .iter()
                .map(|t| Ok::<_, TransportError>((*t).to_string()))
                .collect::<Vec<_>>(),
        )
    }

    async fn recv_json(rx: &mut mpsc::Receiver<Arc<String>>) -> serde_json::Value {
        serde_json::from_str(&rx.recv().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn join_then_guess_then_peer_close() {
        let registry = registry();
        let game = registry.create_session("g");
        let (conn, mut rx) = make_connection(16);

        let join = format!(r#"{{"game_id":"{}"}}"#, game.id());
        let inbound = frames(&[join.as_str(), r#"{"word":"crate"}"#, r#"{"word":"crane"}"#]);
        let exit = handle_connection(inbound, Arc::clone(&conn), Arc::clone(&registry)).await;

        assert_eq!(exit, LoopExit::PeerClosed);
        assert!(conn.is_closed());

        let hello = recv_json(&mut rx).await;
        assert_eq!(hello["player_number"], 1);
        let first = recv_json(&mut rx).await;
        assert_eq!(first["guesses"][0]["result"], "GGGXG");
        assert_eq!(first["completed"], false);
        let second = recv_json(&mut rx).await;
        assert_eq!(second["guesses"].as_array().unwrap().len(), 2);
        assert_eq!(second["completed"], true);
        assert_eq!(second["guesses"][1]["player"], "Player 1");
    }

    #[tokio::test]
    async fn unknown_game_gets_error_and_close() {
        let registry = registry();
        let (conn, mut rx) = make_connection(4);

        let exit = handle_connection(
            frames(&[r#"{"game_id":"game-99"}"#]),
            Arc::clone(&conn),
            registry,
        )
        .await;

        assert_eq!(exit, LoopExit::JoinRefused("Game not found".into()));
        assert!(conn.is_closed());
        let msg = recv_json(&mut rx).await;
        assert_eq!(msg, serde_json::json!({"error": "Game not found"}));
    }

    #[tokio::test]
    async fn malformed_join_is_refused() {
        let (conn, mut rx) = make_connection(4);
        let exit = handle_connection(frames(&["hello"]), Arc::clone(&conn), registry()).await;
        assert_eq!(exit, LoopExit::JoinRefused(INVALID_JOIN.into()));
        assert_eq!(recv_json(&mut rx).await["error"], INVALID_JOIN);
    }

    #[tokio::test]
    async fn bad_frames_and_dropped_guesses_are_ignored() {
        let registry = registry();
        let game = registry.create_session("g");
        let (conn, mut rx) = make_connection(16);

        let join = format!(r#"{{"game_id":"{}"}}"#, game.id());
        let inbound = frames(&[
            join.as_str(),
            "garbage",
            r#"{"guess":"CRATE"}"#,
            r#"{"word":"toolong"}"#,
            r#"{"word":"slate"}"#,
        ]);
        let exit = handle_connection(inbound, Arc::clone(&conn), Arc::clone(&registry)).await;
        assert_eq!(exit, LoopExit::PeerClosed);

        let _hello = recv_json(&mut rx).await;
        let only = recv_json(&mut rx).await;
        assert_eq!(only["guesses"][0]["word"], "SLATE");
        assert!(rx.try_recv().is_err());
        assert_eq!(game.snapshot().guesses.len(), 1);
    }

    #[tokio::test]
    async fn transport_error_ends_only_this_loop() {
        let registry = registry();
        let game = registry.create_session("g");
        let (other, mut other_rx) = make_connection(16);
        let _ = registry.attach_player(game.id(), &other).unwrap();
        let _ = recv_json(&mut other_rx).await;

        let (conn, _rx) = make_connection(16);
        let join = format!(r#"{{"game_id":"{}"}}"#, game.id());
        let inbound = stream::iter(vec![
            Ok(join),
            Err(TransportError::Io("reset by peer".into())),
            Ok(r#"{"word":"crate"}"#.to_string()),
        ]);
        let exit = handle_connection(inbound, Arc::clone(&conn), Arc::clone(&registry)).await;

        assert_eq!(exit, LoopExit::Transport(TransportError::Io("reset by peer".into())));
        assert!(game.snapshot().guesses.is_empty());
        assert!(!other.is_closed());

        // The other player still plays.
        let _ = registry
            .submit_guess(game.id(), PlayerOrdinal::after(0), "crate")
            .unwrap();
        assert_eq!(recv_json(&mut other_rx).await["guesses"][0]["word"], "CRATE");
    }

    #[tokio::test]
    async fn local_close_cancels_waiting_loop() {
        let registry = registry();
        let game = registry.create_session("g");
        let (conn, _rx) = make_connection(16);
        let (tx, rx_frames) = frame_channel::unbounded();
        tx.unbounded_send(Ok(format!(r#"{{"game_id":"{}"}}"#, game.id())))
            .unwrap();

        let task = tokio::spawn(handle_connection(
            rx_frames,
            Arc::clone(&conn),
            Arc::clone(&registry),
        ));
        while game.player_count() == 0 {
            tokio::task::yield_now().await;
        }
        conn.close();

        assert_eq!(task.await.unwrap(), LoopExit::Cancelled);
        drop(tx);
        assert_eq!(game.player_count(), 1);
    }
}
