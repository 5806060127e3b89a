//! ChatRelay — wires the registry, router, and broadcaster to the transport.

use std::sync::Arc;

use relay_protocol::{Envelope, decode};
use relay_transport::{ConnectionHandler, Outbound};
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::connection::Connection;
use crate::registry::Registry;
use crate::router::EventRouter;

/// The chat relay. Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct ChatRelay {
    registry: Arc<Registry>,
    router: EventRouter,
    broadcaster: Broadcaster,
}

impl Default for ChatRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatRelay {
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());
        Self {
            router: EventRouter::new(registry.clone()),
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Admit a client. The returned [`Session`] must be kept by the client's
    /// receive loop; closing or dropping it removes the client.
    pub fn admit(&self, outbound: Arc<dyn Outbound>) -> Session {
        let connection = self.registry.admit(outbound);
        info!("Client connected: {} (total: {})", connection.id(), self.registry.len());
        Session {
            relay: self.clone(),
            connection,
            released: false,
        }
    }

    /// Decode one inbound text frame and act on it. Frames that fail to
    /// decode are dropped.
    pub async fn handle_text(&self, session: &Session, text: &str) {
        match decode(text) {
            Ok(envelope) => self.dispatch(session.connection(), envelope).await,
            Err(e) => debug!(connection_id = %session.id(), "Dropping inbound frame: {e}"),
        }
    }

    /// Route a decoded envelope and broadcast whatever it produces.
    pub async fn dispatch(&self, conn: &Connection, envelope: Envelope) {
        let outgoing = self.router.route(conn, envelope);
        self.broadcast_all(outgoing).await;
    }

    async fn broadcast_all(&self, envelopes: Vec<Envelope>) {
        for envelope in &envelopes {
            self.broadcaster.broadcast(envelope).await;
        }
    }
}

impl ConnectionHandler for ChatRelay {
    type Session = Session;

    fn open(&self, outbound: Arc<dyn Outbound>) -> Session {
        self.admit(outbound)
    }

    async fn on_text(&self, session: &Session, text: &str) {
        self.handle_text(session, text).await;
    }

    async fn closed(&self, session: &Session) {
        session.closed().await;
    }

    async fn close(&self, session: Session) {
        session.close().await;
    }

    fn connection_count(&self) -> usize {
        self.registry.len()
    }
}

/// A client's membership in the relay, held by its receive loop.
///
/// [`Session::closed`] resolves once a send to the client has failed; the
/// loop should then stop reading and call [`Session::close`], which evicts
/// the client and awaits the departure broadcast.
/// If the session is dropped without being closed (the task was cancelled
/// or panicked) eviction still happens in `Drop` and the departure
/// broadcast is spawned onto the current runtime.
pub struct Session {
    relay: ChatRelay,
    connection: Arc<Connection>,
    released: bool,
}

impl Session {
    pub fn id(&self) -> &str {
        self.connection.id()
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Resolves once the connection can no longer be written to.
    pub async fn closed(&self) {
        self.connection.closed().await;
    }

    /// Evict the client and broadcast its departure.
    pub async fn close(mut self) {
        let departures = self.release();
        self.relay.broadcast_all(departures).await;
    }

    /// Evict exactly once and return the departure envelopes.
    fn release(&mut self) -> Vec<Envelope> {
        self.released = true;
        self.connection.mark_closed();

        if self.relay.registry.evict(self.connection.id()).is_none() {
            return Vec::new();
        }
        info!(
            "Client removed: {} (connected {:?})",
            self.connection.id(),
            self.connection.connected_at().elapsed()
        );
        self.relay.router.depart(&self.connection)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let departures = self.release();
        if departures.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let relay = self.relay.clone();
                handle.spawn(async move {
                    relay.broadcast_all(departures).await;
                });
            }
            Err(_) => warn!(
                connection_id = %self.connection.id(),
                "No runtime available; departure not announced"
            ),
        }
    }
}
