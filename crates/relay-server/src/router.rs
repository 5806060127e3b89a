//! Event Router — turns a decoded inbound envelope into broadcasts.
//!
//! Per-connection state machine:
//!
//! | state     | `join`                       | `message`            | other   |
//! |-----------|------------------------------|----------------------|---------|
//! | Anonymous | set name, announce + roster  | ignored              | ignored |
//! | Named     | ignored                      | relay with timestamp | ignored |
//!
//! The router only decides what to send; the caller hands the result to
//! the [`Broadcaster`](crate::Broadcaster).

use std::sync::Arc;

use chrono::Utc;
use relay_protocol::Envelope;
use tracing::{debug, info};

use crate::connection::{Connection, ConnectionState};
use crate::registry::Registry;

#[derive(Clone)]
pub struct EventRouter {
    registry: Arc<Registry>,
}

impl EventRouter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Apply one inbound envelope from `conn` and return the envelopes to
    /// broadcast, in order.
    pub fn route(&self, conn: &Connection, envelope: Envelope) -> Vec<Envelope> {
        match (conn.state(), envelope) {
            (ConnectionState::Anonymous, Envelope::Join { username }) => {
                if username.is_empty() {
                    debug!(connection_id = %conn.id(), "Ignoring join with empty username");
                    return Vec::new();
                }
                if !conn.set_display_name(username.clone()) {
                    return Vec::new();
                }
                info!(connection_id = %conn.id(), username = %username, "User joined");
                vec![
                    Envelope::user_joined(username, Utc::now()),
                    self.roster(),
                ]
            }
            (ConnectionState::Named(name), Envelope::Message { content, .. }) => {
                vec![Envelope::chat_message(name, content, Utc::now())]
            }
            (state, envelope) => {
                debug!(
                    connection_id = %conn.id(),
                    kind = %envelope.kind(),
                    ?state,
                    "Ignoring envelope"
                );
                Vec::new()
            }
        }
    }

    /// Notifications for a connection that has already been evicted.
    /// Anonymous connections were never on the roster, so they leave
    /// silently.
    pub fn depart(&self, conn: &Connection) -> Vec<Envelope> {
        match conn.state() {
            ConnectionState::Named(name) => {
                info!(connection_id = %conn.id(), username = %name, "User left");
                vec![Envelope::user_left(name, Utc::now()), self.roster()]
            }
            ConnectionState::Anonymous => Vec::new(),
        }
    }

    fn roster(&self) -> Envelope {
        Envelope::users_list(self.registry.named_users())
    }
}
