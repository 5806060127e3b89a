//! A single client connection and its identity.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use relay_transport::{Outbound, TransportError};
use tokio_util::sync::CancellationToken;

/// Where a connection sits in the join lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState<'a> {
    /// Connected but has not joined yet.
    Anonymous,
    /// Joined under this display name.
    Named(&'a str),
}

/// A connected client.
///
/// The display name is written once by the connection's own receive loop
/// and read by roster queries from any task, so it lives in a `OnceLock`
/// rather than behind a mutex.
pub struct Connection {
    /// Unique connection ID
    id: String,
    /// Admission order, used to keep the roster stable
    seq: u64,
    /// When the client connected
    connected_at: Instant,
    /// Outbound half of the client's channel
    outbound: Arc<dyn Outbound>,
    /// Display name (set by the first successful join)
    display_name: OnceLock<String>,
    /// Cleared after the first failed send or on teardown
    open: AtomicBool,
    /// Cancelled together with `open` so the receive loop can stop
    closed: CancellationToken,
}

impl Connection {
    pub(crate) fn new(id: String, seq: u64, outbound: Arc<dyn Outbound>) -> Self {
        Self {
            id,
            seq,
            connected_at: Instant::now(),
            outbound,
            display_name: OnceLock::new(),
            open: AtomicBool::new(true),
            closed: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.get().map(String::as_str)
    }

    pub fn state(&self) -> ConnectionState<'_> {
        match self.display_name() {
            Some(name) => ConnectionState::Named(name),
            None => ConnectionState::Anonymous,
        }
    }

    /// Set the display name. Returns `false` if one was already set; the
    /// first name sticks for the lifetime of the connection.
    pub fn set_display_name(&self, name: impl Into<String>) -> bool {
        self.display_name.set(name.into()).is_ok()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
        self.closed.cancel();
    }

    /// Resolves once the connection has been marked closed, immediately if
    /// it already was.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Send one text frame. A failure marks the connection closed, which
    /// makes later broadcasts skip it and wakes [`Connection::closed`].
    pub async fn send(&self, text: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        let result = self.outbound.send_text(text).await;
        if result.is_err() {
            self.mark_closed();
        }
        result
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("display_name", &self.display_name())
            .field("open", &self.is_open())
            .finish()
    }
}
