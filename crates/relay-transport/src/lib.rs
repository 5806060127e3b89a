//! Chat Relay Transport Layer
//!
//! Provides the WebSocket transport for the chat relay.
//! The transport layer handles:
//! - HTTP upgrade and the `/health` probe
//! - Connection lifecycle (open, frame, close)
//! - Writing to a client through an [`Outbound`] channel
//!
//! The transport is decoupled from relay logic via the `ConnectionHandler` trait.

pub mod outbound;
pub mod server;

pub use outbound::{ChannelOutbound, Outbound, OutboundFrame, TransportError, WsOutbound};
pub use server::{ConnectionHandler, StartError, TransportConfig, TransportServer};
