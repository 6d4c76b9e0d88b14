//! HTTP handlers: create and list games, upgrade to a player socket, health.

use axum::extract::rejection::JsonRejection;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use lingo_core::ConnectionId;
use thiserror::Error;
use tracing::debug;

use crate::health::{self, HealthResponse};
use crate::protocol::{GamesResponse, StartRequest, StartResponse};
use crate::server::AppState;
use crate::websocket::session::run_ws_session;

/// Errors returned to HTTP callers as plain-text bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body")]
    BadRequest(#[source] JsonRejection),
    #[error("Not found")]
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// `POST /start`: create a game.
pub async fn start_game(
    State(state): State<AppState>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<StartResponse>, ApiError> {
    let Json(request) = body.map_err(|e| {
        debug!(error = %e, "rejecting start request");
        ApiError::BadRequest(e)
    })?;
    let session = state.sockets.registry.create_session(&request.game_name);
    Ok(Json(StartResponse {
        game_id: session.id().clone(),
        game_name: session.name().to_string(),
    }))
}

/// `GET /games`: games still open for play.
pub async fn list_games(State(state): State<AppState>) -> Json<GamesResponse> {
    Json(GamesResponse {
        games: state.sockets.registry.list_active_sessions(),
    })
}

/// `GET /join`: upgrade to a player socket.
pub async fn join_game(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let ctx = state.sockets;
    let conn_id = ConnectionId::new();
    ws.max_message_size(ctx.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, conn_id, ctx))
}

/// `GET /health`.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let sockets = &state.sockets;
    Json(health::health_check(
        state.start_time,
        sockets.connections.load(std::sync::atomic::Ordering::Relaxed),
        sockets.registry.active_count(),
    ))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
