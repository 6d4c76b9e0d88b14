//! Owner of every game in the process.
//!
//! The id map (`DashMap`) and each game's own lock are separate, so
//! creating or looking up one game never waits on a guess in another. The
//! `Arc<Session>` is cloned out of the map before any game lock is taken.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use lingo_core::{GameError, GameId, GameSummary, GuessRejected, PlayerOrdinal, WordSource};
use metrics::counter;
use tracing::{debug, info};

use crate::session::{Accepted, Attached, Session};
use crate::websocket::connection::PlayerConnection;

/// Result of a guess that reached an existing game.
#[derive(Clone, Debug)]
pub enum GuessOutcome {
    /// Appended and broadcast.
    Accepted(Box<Accepted>),
    /// Dropped without a reply.
    Dropped(GuessRejected),
}

pub struct SessionRegistry {
    sessions: DashMap<GameId, Arc<Session>>,
    next_seq: AtomicU64,
    words: Arc<dyn WordSource>,
}

impl SessionRegistry {
    pub fn new(words: Arc<dyn WordSource>) -> Self {
        Self {
            sessions: DashMap::new(),
            next_seq: AtomicU64::new(0),
            words,
        }
    }

    /// Create a game with a random target and return it.
    pub fn create_session(&self, name: &str) -> Arc<Session> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let id = GameId::from_sequence(seq);
        let target = self.words.random_target();
        let session = Arc::new(Session::new(id.clone(), seq, name, &target));
        let _ = self.sessions.insert(id.clone(), Arc::clone(&session));

        counter!("games_created_total").increment(1);
        info!(
            game_id = %id,
            name,
            word_len = session.word_len(),
            created_at = %session.created_at().to_rfc3339(),
            "game created"
        );
        session
    }

    pub fn get_session(&self, id: &GameId) -> Result<Arc<Session>, GameError> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| GameError::SessionNotFound(id.clone()))
    }

    /// Games that are not yet completed, oldest first.
    pub fn list_active_sessions(&self) -> Vec<GameSummary> {
        let mut sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        sessions.sort_by_key(|s| s.seq());
        sessions
            .iter()
            .filter_map(|s| s.summary_if_active())
            .collect()
    }

    /// Attach `conn` to game `id` and enqueue its join handshake.
    pub fn attach_player(
        &self,
        id: &GameId,
        conn: &Arc<PlayerConnection>,
    ) -> Result<Attached, GameError> {
        let session = self.get_session(id)?;
        let attached = session.attach(conn)?;
        info!(
            game_id = %id,
            conn_id = %conn.id,
            player = %attached.ordinal,
            history = attached.snapshot.guesses.len(),
            "player joined"
        );
        Ok(attached)
    }

    /// Submit a guess from `player` to game `id`.
    ///
    /// Only an unknown game is an error; rejected guesses come back as
    /// [`GuessOutcome::Dropped`].
    pub fn submit_guess(
        &self,
        id: &GameId,
        player: PlayerOrdinal,
        raw_word: &str,
    ) -> Result<GuessOutcome, GameError> {
        let session = self.get_session(id)?;
        match session.submit_guess(player, raw_word, self.words.as_ref()) {
            Ok(accepted) => {
                counter!("guesses_accepted_total").increment(1);
                debug!(
                    game_id = %id,
                    player = %player,
                    word = %accepted.guess.word,
                    result = %accepted.guess.result,
                    completed = accepted.snapshot.completed,
                    "guess accepted"
                );
                if accepted.snapshot.completed {
                    info!(
                        game_id = %id,
                        player = %player,
                        guesses = accepted.snapshot.guesses.len(),
                        duration_secs = session.age().num_seconds(),
                        "game completed"
                    );
                }
                Ok(GuessOutcome::Accepted(Box::new(accepted)))
            }
            Err(rejected) => {
                counter!("guesses_dropped_total", "reason" => rejected.kind()).increment(1);
                debug!(game_id = %id, player = %player, reason = %rejected, "guess dropped");
                Ok(GuessOutcome::Dropped(rejected))
            }
        }
    }

    /// Total games ever created, completed ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Games not yet completed.
    pub fn active_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_completed())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::tests::make_connection;
    use lingo_core::{InvalidReason, WordList};

    fn registry_with_target(target: &str) -> SessionRegistry {
        let words = WordList::new(vec![target], None::<Vec<String>>);
        SessionRegistry::new(Arc::new(words))
    }

    fn accepted(outcome: GuessOutcome) -> Box<Accepted> {
        match outcome {
            GuessOutcome::Accepted(a) => a,
            GuessOutcome::Dropped(r) => panic!("guess dropped: {r}"),
        }
    }

    #[test]
    fn ids_are_sequential() {
        let registry = registry_with_target("CRANE");
        let a = registry.create_session("one");
        let b = registry.create_session("two");
        assert_eq!(a.id().as_str(), "game-1");
        assert_eq!(b.id().as_str(), "game-2");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn get_unknown_session() {
        let registry = registry_with_target("CRANE");
        let err = registry.get_session(&GameId::from_raw("nope")).unwrap_err();
        assert_eq!(err, GameError::SessionNotFound(GameId::from_raw("nope")));
    }

    #[test]
    fn attach_unknown_session() {
        let registry = registry_with_target("CRANE");
        let (conn, _rx) = make_connection(4);
        let err = registry
            .attach_player(&GameId::from_sequence(7), &conn)
            .unwrap_err();
        assert_eq!(err.client_message(), "Game not found");
        assert!(conn.game_id().is_none());
    }

    #[test]
    fn listing_drops_completed_games() {
        let registry = registry_with_target("CRANE");
        let done = registry.create_session("done");
        let open = registry.create_session("open");
        let (conn, _rx) = make_connection(4);
        let _ = registry.attach_player(open.id(), &conn).unwrap();

        assert_eq!(registry.list_active_sessions().len(), 2);

        let outcome = registry
            .submit_guess(done.id(), PlayerOrdinal::after(0), "crane")
            .unwrap();
        assert!(accepted(outcome).snapshot.completed);

        let listed = registry.list_active_sessions();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, *open.id());
        assert_eq!(listed[0].name, "open");
        assert_eq!(listed[0].players, 1);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn second_correct_guess_is_dropped() {
        let registry = registry_with_target("CRANE");
        let game = registry.create_session("g");
        let _ = accepted(
            registry
                .submit_guess(game.id(), PlayerOrdinal::after(0), "CRANE")
                .unwrap(),
        );
        let outcome = registry
            .submit_guess(game.id(), PlayerOrdinal::after(1), "CRANE")
            .unwrap();
        assert!(matches!(
            outcome,
            GuessOutcome::Dropped(GuessRejected::SessionCompleted)
        ));
        assert_eq!(game.snapshot().guesses.len(), 1);
    }

    #[test]
    fn short_guess_is_dropped_as_invalid() {
        let registry = registry_with_target("ARENA");
        let game = registry.create_session("g");
        let outcome = registry
            .submit_guess(game.id(), PlayerOrdinal::after(0), "naan")
            .unwrap();
        assert!(matches!(
            outcome,
            GuessOutcome::Dropped(GuessRejected::InvalidWord {
                reason: InvalidReason::LengthMismatch {
                    expected: 5,
                    actual: 4
                },
                ..
            })
        ));
    }

    #[test]
    fn submit_to_unknown_game_is_an_error() {
        let registry = registry_with_target("CRANE");
        let err = registry
            .submit_guess(&GameId::from_sequence(1), PlayerOrdinal::after(0), "CRANE")
            .unwrap_err();
        assert!(matches!(err, GameError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn guesses_are_isolated_between_games() {
        let registry = registry_with_target("CRANE");
        let a = registry.create_session("a");
        let b = registry.create_session("b");
        let (in_b, mut rx_b) = make_connection(8);
        let _ = registry.attach_player(b.id(), &in_b).unwrap();
        let _greeting = rx_b.recv().await.unwrap();

        let _ = accepted(
            registry
                .submit_guess(a.id(), PlayerOrdinal::after(0), "CRANE")
                .unwrap(),
        );

        assert!(rx_b.try_recv().is_err());
        assert!(b.snapshot().guesses.is_empty());
        assert!(!b.is_completed());
    }

    #[tokio::test]
    async fn concurrent_creates_get_distinct_ids() {
        let registry = Arc::new(registry_with_target("CRANE"));
        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.create_session(&format!("g{i}")).id().clone()
            }));
        }
        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(ids.len(), 32);
        assert_eq!(registry.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_guesses_are_serialized() {
        let words = WordList::new(vec!["CRANE"], None::<Vec<String>>);
        let registry = Arc::new(SessionRegistry::new(Arc::new(words)));
        let game = registry.create_session("race");
        let (watcher, mut rx) = make_connection(1024);
        let _ = registry.attach_player(game.id(), &watcher).unwrap();
        let _greeting = rx.recv().await.unwrap();

        // 40 wrong guesses, 10 invalid ones, no winner.
        let mut handles = Vec::new();
        for i in 0..50 {
            let registry = Arc::clone(&registry);
            let id = game.id().clone();
            handles.push(tokio::spawn(async move {
                let word = if i % 5 == 0 { "NOPE" } else { "SLATE" };
                registry
                    .submit_guess(&id, PlayerOrdinal::after(i), word)
                    .unwrap()
            }));
        }
        let mut accepted_count = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), GuessOutcome::Accepted(_)) {
                accepted_count += 1;
            }
        }

        let log = game.snapshot().guesses;
        assert_eq!(accepted_count, 40);
        assert_eq!(log.len(), 40);

        // Broadcasts arrive in log order, each one extending the last.
        let mut last_len = 0;
        while let Ok(msg) = rx.try_recv() {
            let snapshot: lingo_core::Snapshot = serde_json::from_str(&msg).unwrap();
            assert_eq!(snapshot.guesses.len(), last_len + 1);
            assert_eq!(snapshot.guesses[..], log[..snapshot.guesses.len()]);
            last_len = snapshot.guesses.len();
        }
        assert_eq!(last_len, 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_winners_complete_exactly_once() {
        let registry = Arc::new(registry_with_target("CRANE"));
        let game = registry.create_session("race");

        let mut handles = Vec::new();
        for i in 0..20 {
            let registry = Arc::clone(&registry);
            let id = game.id().clone();
            handles.push(tokio::spawn(async move {
                registry
                    .submit_guess(&id, PlayerOrdinal::after(i), "crane")
                    .unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                GuessOutcome::Accepted(a) => {
                    assert!(a.snapshot.completed);
                    winners += 1;
                }
                GuessOutcome::Dropped(r) => assert_eq!(r, GuessRejected::SessionCompleted),
            }
        }
        assert_eq!(winners, 1);
        let snapshot = game.snapshot();
        assert_eq!(snapshot.guesses.len(), 1);
        assert!(snapshot.completed);
        assert_eq!(snapshot.guesses[0].word, "CRANE");
    }
}
