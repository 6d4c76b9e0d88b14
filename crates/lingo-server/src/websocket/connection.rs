//! Player connection state.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lingo_core::{ConnectionId, GameError, GameId};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One connected player, as seen by the game it joined.
///
/// Outbound messages go through a bounded queue drained by the socket
/// writer task, so enqueueing never blocks. A connection binds to at most
/// one game for its whole life.
pub struct PlayerConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Game this connection joined, set once.
    game_id: OnceLock<GameId>,
    /// Send channel to the socket writer task.
    tx: mpsc::Sender<Arc<String>>,
    /// Cancelled when the connection is closed, from either side.
    closed: CancellationToken,
    /// When this connection was established.
    pub connected_at: Instant,
    /// When the last inbound frame (data, ping or pong) arrived.
    last_seen: Mutex<Instant>,
    /// Messages dropped because the queue was full or the connection closed.
    dropped_messages: AtomicU64,
}

impl PlayerConnection {
    /// Create a connection whose close signal is `closed`.
    ///
    /// Pass a child of the server shutdown token so that shutting the server
    /// down closes every connection.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>, closed: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            id,
            game_id: OnceLock::new(),
            tx,
            closed,
            connected_at: now,
            last_seen: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Bind this connection to a game. Fails if it is already bound.
    pub fn bind_game(&self, game_id: GameId) -> Result<(), GameError> {
        self.game_id
            .set(game_id)
            .map_err(|_| GameError::AlreadyAttached {
                game_id: self.game_id.get().cloned().unwrap_or_else(|| GameId::from_raw("")),
            })
    }

    /// The game this connection joined, if any.
    pub fn game_id(&self) -> Option<&GameId> {
        self.game_id.get()
    }

    /// Enqueue a text message without waiting.
    ///
    /// Returns `false` if the connection is closed or its queue is full, and
    /// increments the dropped message counter.
    pub fn send(&self, message: Arc<String>) -> bool {
        if !self.is_closed() && self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize `value` and enqueue it.
    pub fn send_json<T: Serialize>(&self, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send(Arc::new(json)),
            Err(_) => false,
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Close the connection. Safe to call any number of times.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection is closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Record inbound activity.
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame (or connection establishment).
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

impl std::fmt::Debug for PlayerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerConnection")
            .field("id", &self.id)
            .field("game_id", &self.game_id.get())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_connection(
        capacity: usize,
    ) -> (Arc<PlayerConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = PlayerConnection::new(ConnectionId::new(), tx, CancellationToken::new());
        (Arc::new(conn), rx)
    }

    #[test]
    fn create_connection() {
        let (conn, _rx) = make_connection(4);
        assert!(conn.game_id().is_none());
        assert!(!conn.is_closed());
        assert_eq!(conn.drop_count(), 0);
    }

    #[tokio::test]
    async fn send_message_success() {
        let (conn, mut rx) = make_connection(4);
        assert!(conn.send(Arc::new("hello".into())));
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn send_json_serializes() {
        let (conn, mut rx) = make_connection(4);
        assert!(conn.send_json(&serde_json::json!({"completed": true})));
        assert_eq!(&*rx.recv().await.unwrap(), r#"{"completed":true}"#);
    }

    #[test]
    fn send_to_dropped_receiver_fails() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert!(!conn.send(Arc::new("hello".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn send_to_full_queue_fails() {
        let (conn, _rx) = make_connection(1);
        assert!(conn.send(Arc::new("msg1".into())));
        assert!(!conn.send(Arc::new("msg2".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn send_after_close_fails() {
        let (conn, _rx) = make_connection(4);
        conn.close();
        assert!(!conn.send(Arc::new("late".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn close_is_idempotent() {
        let (conn, _rx) = make_connection(4);
        conn.close();
        conn.close();
        assert!(conn.is_closed());
        assert!(!conn.send(Arc::new("after close".into())));
    }

    #[test]
    fn parent_token_closes_connection() {
        let parent = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(1);
        let conn = PlayerConnection::new(ConnectionId::new(), tx, parent.child_token());
        parent.cancel();
        assert!(conn.is_closed());
    }

    #[test]
    fn bind_game_once() {
        let (conn, _rx) = make_connection(4);
        conn.bind_game(GameId::from_sequence(1)).unwrap();
        let err = conn.bind_game(GameId::from_sequence(2)).unwrap_err();
        assert_eq!(
            err,
            GameError::AlreadyAttached {
                game_id: GameId::from_sequence(1)
            }
        );
        assert_eq!(conn.game_id(), Some(&GameId::from_sequence(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn connected_at_tracks_connection_age() {
        let (conn, _rx) = make_connection(4);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(conn.connected_at.elapsed() >= Duration::from_secs(5));
        assert!(conn.idle_for() >= Duration::from_secs(5));
        conn.mark_alive();
        assert!(conn.idle_for() < Duration::from_secs(1));
    }

    #[test]
    fn mark_alive_resets_idle() {
        let (conn, _rx) = make_connection(4);
        conn.mark_alive();
        assert!(conn.idle_for() < Duration::from_secs(1));
    }
}
