//! WebSocket session lifecycle: one player from upgrade through disconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitStream;
use futures::{SinkExt, Stream, StreamExt, stream};
use lingo_core::{ConnectionId, TransportError};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, instrument, warn};

use super::connection::PlayerConnection;
use super::handler::{LoopExit, handle_connection};
use crate::config::ServerConfig;
use crate::registry::SessionRegistry;
use crate::shutdown::ShutdownCoordinator;

/// How long the writer may take to flush and send Close after the loop ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state a socket needs besides the registry.
#[derive(Clone)]
pub struct SocketContext {
    pub registry: Arc<SessionRegistry>,
    pub config: Arc<ServerConfig>,
    /// Each connection closes on a child of the shutdown token.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Live connection count reported by `/health`.
    pub connections: Arc<AtomicUsize>,
}

/// Run a WebSocket session for a connected player.
///
/// 1. Spawns the writer, which drains the player's queue and pings
/// 2. Runs the join handshake and receive loop over inbound text frames
/// 3. Lets the writer flush, send Close, then cleans up
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub async fn run_ws_session(ws: WebSocket, conn_id: ConnectionId, ctx: SocketContext) {
    let (ws_tx, ws_rx) = ws.split();
    let (send_tx, send_rx) = mpsc::channel::<Arc<String>>(ctx.config.send_queue_capacity.max(1));
    let conn = Arc::new(PlayerConnection::new(
        conn_id,
        send_tx,
        ctx.shutdown.child_token(),
    ));

    let _ = ctx.connections.fetch_add(1, Ordering::Relaxed);
    info!("player connected");
    counter!("ws_connections_total").increment(1);
    gauge!("ws_connections_active").increment(1.0);

    let mut writer = tokio::spawn(
        write_outbound(
            ws_tx,
            send_rx,
            Arc::clone(&conn),
            ctx.config.heartbeat_interval(),
            ctx.config.heartbeat_timeout(),
        )
        .in_current_span(),
    );

    let inbound = std::pin::pin!(inbound_frames(ws_rx, Arc::clone(&conn)));
    let exit = handle_connection(inbound, Arc::clone(&conn), ctx.registry).await;
    if let LoopExit::Transport(e) = &exit {
        warn!(error = %e, "connection read failed");
    }

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        warn!("writer did not finish in time, aborting");
        writer.abort();
    }

    let _ = ctx.connections.fetch_sub(1, Ordering::Relaxed);
    info!(
        ?exit,
        game_id = conn.game_id().map(|id| id.as_str()),
        dropped = conn.drop_count(),
        "player disconnected"
    );
    counter!("ws_disconnections_total").increment(1);
    gauge!("ws_connections_active").decrement(1.0);
    histogram!("ws_connection_duration_seconds")
        .record(conn.connected_at.elapsed().as_secs_f64());
}

/// Forward queued messages to the socket and send periodic pings.
///
/// Closes the connection if nothing arrives from the peer for `timeout`.
/// Once the connection is closed, anything still queued is flushed before
/// the Close frame.
async fn write_outbound<W>(
    mut ws_tx: W,
    mut send_rx: mpsc::Receiver<Arc<String>>,
    conn: Arc<PlayerConnection>,
    interval: Duration,
    timeout: Duration,
) where
    W: futures::Sink<Message> + Unpin,
{
    let mut ping = tokio::time::interval(interval);
    // Skip the immediate first tick
    let _ = ping.tick().await;

    loop {
        tokio::select! {
            biased;
            msg = send_rx.recv() => {
                let Some(text) = msg else { break };
                if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                    break;
                }
            }
            () = conn.closed() => {
                while let Ok(text) = send_rx.try_recv() {
                    if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                        break;
                    }
                }
                break;
            }
            _ = ping.tick() => {
                if conn.idle_for() > timeout {
                    warn!(timeout_secs = timeout.as_secs(), "player unresponsive, disconnecting");
                    break;
                }
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = ws_tx.send(Message::Close(None)).await;
    conn.close();
}

/// Text payloads from the socket. Ping/Pong only refresh liveness; a Close
/// frame ends the stream.
fn inbound_frames(
    ws_rx: SplitStream<WebSocket>,
    conn: Arc<PlayerConnection>,
) -> impl Stream<Item = Result<String, TransportError>> {
    stream::unfold((ws_rx, conn), |(mut ws_rx, conn)| async move {
        loop {
            let frame = match ws_rx.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some((Err(TransportError::Io(e.to_string())), (ws_rx, conn))),
            };
            conn.mark_alive();
            match frame {
                Message::Text(text) => return Some((Ok(text.to_string()), (ws_rx, conn))),
                Message::Binary(data) => {
                    if let Ok(text) = std::str::from_utf8(&data) {
                        return Some((Ok(text.to_string()), (ws_rx, conn)));
                    }
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                }
                Message::Close(_) => {
                    debug!("player sent close frame");
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    })
}
