//! WebSocket transport server using Axum.
//!
//! Handles HTTP upgrade to WebSocket, the per-connection receive loop, and
//! the health probe. Everything the chat relay decides lives behind
//! [`ConnectionHandler`].

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use futures_util::{StreamExt, stream::SplitStream};
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::outbound::{Outbound, WsOutbound};

/// Internal error status code from RFC 6455, sent when the server drops a
/// connection it can no longer write to.
const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Trait implemented by the relay to react to connection lifecycle events.
/// The transport calls it from each connection's receive loop.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Per-connection state, owned by that connection's receive loop.
    type Session: Send + Sync + 'static;

    /// A client finished the upgrade and is ready to receive.
    fn open(&self, outbound: Arc<dyn Outbound>) -> Self::Session;

    /// One inbound text frame. Frames are delivered strictly in order; the
    /// next frame is not read until this future completes.
    fn on_text(&self, session: &Self::Session, text: &str) -> impl Future<Output = ()> + Send;

    /// Resolves when the handler gives up on the session, for example after
    /// a send to it failed. The receive loop stops reading when this fires.
    fn closed(&self, session: &Self::Session) -> impl Future<Output = ()> + Send;

    /// The receive loop ended, for whatever reason.
    fn close(&self, session: Self::Session) -> impl Future<Output = ()> + Send;

    /// Number of live connections (health probe and connection cap).
    fn connection_count(&self) -> usize;
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Allow cross-origin requests from any origin
    pub enable_cors: bool,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
    /// Largest inbound frame accepted, in bytes
    pub max_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            hostname: "127.0.0.1".into(),
            enable_cors: false,
            max_connections: None,
            max_message_size: 64 * 1024,
        }
    }
}

/// Errors raised while starting the transport.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid listen address `{addr}`: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared state for the transport server.
struct AppState<H: ConnectionHandler> {
    handler: Arc<H>,
    config: TransportConfig,
}

/// The transport server — accepts WebSocket connections and drives their
/// receive loops.
pub struct TransportServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
}

impl TransportServer {
    /// Start the transport server with the given connection handler.
    pub async fn start<H: ConnectionHandler>(
        config: TransportConfig,
        handler: H,
    ) -> Result<Self, StartError> {
        Self::start_shared(config, Arc::new(handler)).await
    }

    /// Start the transport server with a handler that is also used elsewhere.
    pub async fn start_shared<H: ConnectionHandler>(
        config: TransportConfig,
        handler: Arc<H>,
    ) -> Result<Self, StartError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let state = Arc::new(AppState {
            handler,
            config: config.clone(),
        });

        let mut app = Router::new()
            .route("/ws", get(ws_upgrade_handler::<H>))
            .route("/health", get(health_handler::<H>))
            .with_state(state);

        if config.enable_cors {
            app = app.layer(CorsLayer::permissive());
        }

        let addr_text = format!("{}:{}", config.hostname, config.port);
        let addr: SocketAddr = addr_text
            .parse()
            .map_err(|source| StartError::InvalidAddress { addr: addr_text.clone(), source })?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        info!("Chat relay listening on ws://{}:{}/ws", config.hostname, actual_port);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
            {
                warn!("Transport server exited with error: {e}");
            }
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Chat relay transport stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler<H: ConnectionHandler>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    // Checked before the upgrade admits the client, so a burst of concurrent
    // upgrades can briefly overshoot the cap.
    if let Some(max) = state.config.max_connections {
        let current = state.handler.connection_count();
        if current >= max {
            warn!("Connection rejected: max connections reached ({max})");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    ws.max_message_size(state.config.max_message_size)
        .max_frame_size(state.config.max_message_size)
        .on_upgrade(move |socket| handle_ws_connection(socket, state))
        .into_response()
}

async fn health_handler<H: ConnectionHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.handler.connection_count(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

/// Why a receive loop stopped.
#[derive(Debug)]
enum LoopExit {
    ClosedByClient,
    ClosedByServer,
    StreamEnded,
    Error(axum::Error),
}

async fn handle_ws_connection<H: ConnectionHandler>(socket: WebSocket, state: Arc<AppState<H>>) {
    let (ws_tx, mut ws_rx) = socket.split();
    let outbound = Arc::new(WsOutbound::new(ws_tx));

    let session = state.handler.open(outbound.clone());

    let exit = receive_loop(&mut ws_rx, state.handler.as_ref(), &session).await;
    match &exit {
        LoopExit::ClosedByClient => debug!("Client sent close frame"),
        LoopExit::ClosedByServer => {
            debug!("Session closed by server");
            // Usually fails too, since a failed send is what got us here.
            let _ = outbound.close(CLOSE_INTERNAL_ERROR, "Send failed").await;
        }
        LoopExit::StreamEnded => debug!("Client stream ended"),
        LoopExit::Error(e) => warn!("WebSocket error: {e}"),
    }

    state.handler.close(session).await;
    info!("Client disconnected (total: {})", state.handler.connection_count());
}

/// Pings are answered and close frames echoed by tungstenite itself; the
/// loop only has to stop reading after a close.
async fn receive_loop<H: ConnectionHandler>(
    ws_rx: &mut SplitStream<WebSocket>,
    handler: &H,
    session: &H::Session,
) -> LoopExit {
    loop {
        let msg = tokio::select! {
            biased;
            () = handler.closed(session) => return LoopExit::ClosedByServer,
            msg = ws_rx.next() => msg,
        };
        let Some(msg) = msg else {
            return LoopExit::StreamEnded;
        };
        match msg {
            Ok(Message::Text(text)) => {
                handler.on_text(session, text.as_str()).await;
            }
            Ok(Message::Close(_)) => return LoopExit::ClosedByClient,
            Ok(Message::Binary(_)) => {
                debug!("Ignoring binary frame");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => return LoopExit::Error(e),
        }
    }
}
