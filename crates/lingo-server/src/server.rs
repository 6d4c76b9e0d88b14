//! Axum server wiring: router, CORS, listener and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use lingo_core::WordSource;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;
use crate::routes;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::SocketContext;

#[derive(Clone)]
pub struct AppState {
    pub sockets: SocketContext,
    pub start_time: Instant,
}

pub struct LingoServer {
    config: Arc<ServerConfig>,
    registry: Arc<SessionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    connections: Arc<AtomicUsize>,
    start_time: Instant,
}

impl LingoServer {
    pub fn new(config: ServerConfig, words: Arc<dyn WordSource>) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new(words)),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            connections: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            sockets: SocketContext {
                registry: Arc::clone(&self.registry),
                config: Arc::clone(&self.config),
                shutdown: Arc::clone(&self.shutdown),
                connections: Arc::clone(&self.connections),
            },
            start_time: self.start_time,
        };

        Router::new()
            .route("/start", post(routes::start_game))
            .route("/games", get(routes::list_games))
            .route("/join", get(routes::join_game))
            .route("/health", get(routes::health_handler))
            .fallback(routes::not_found)
            .layer(cors_layer(&self.config.cors_origin))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind and serve in the background.
    ///
    /// Returns the bound address (useful with port 0) and the serve task,
    /// which ends once [`ShutdownCoordinator::shutdown`] is called and open
    /// requests finish.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        info!(%addr, cors_origin = %self.config.cors_origin, "lingo server listening");

        let router = self.router();
        let stop = self.shutdown.token();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
            info!("lingo server stopped");
        });
        Ok((addr, handle))
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

/// CORS for the browser client: one origin (or `*`), GET/POST/OPTIONS,
/// `Content-Type`.
pub fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else if let Ok(value) = HeaderValue::from_str(origin) {
        AllowOrigin::exact(value)
    } else {
        warn!(origin, "invalid CORS origin, cross-origin requests disabled");
        AllowOrigin::list(Vec::<HeaderValue>::new())
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
