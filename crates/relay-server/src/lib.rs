//! Chat Relay Server — connection registry, event routing, and fan-out.
//!
//! [`ChatRelay`] ties the pieces together and implements the transport's
//! `ConnectionHandler`, so every WebSocket connection flows through it.

pub mod broadcast;
pub mod connection;
pub mod registry;
pub mod relay;
pub mod router;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use connection::{Connection, ConnectionState};
pub use registry::Registry;
pub use relay::{ChatRelay, Session};
pub use router::EventRouter;
