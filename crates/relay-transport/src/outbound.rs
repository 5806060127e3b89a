//! Outbound channels — the write half of a client connection.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, future::BoxFuture, stream::SplitSink};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// Failure on a connection's underlying channel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),
}

/// The exclusive output path to one client.
///
/// Object-safe so the relay can hold `Arc<dyn Outbound>` without caring
/// whether the peer is a WebSocket or an in-process channel.
pub trait Outbound: Send + Sync {
    /// Send one text frame.
    fn send_text<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), TransportError>>;

    /// Send a close frame. The channel is unusable afterwards.
    fn close<'a>(&'a self, code: u16, reason: &'a str) -> BoxFuture<'a, Result<(), TransportError>>;
}

/// Write half of an axum WebSocket.
///
/// The sink sits behind an async mutex so concurrent broadcasts queue up in
/// the order they reached the lock. The lock is per connection.
pub struct WsOutbound {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsOutbound {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink: Mutex::new(sink) }
    }
}

impl Outbound for WsOutbound {
    fn send_text<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            self.sink.lock().await.send(Message::Text(text.to_owned().into())).await?;
            Ok(())
        })
    }

    fn close<'a>(&'a self, code: u16, reason: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            let frame = CloseFrame {
                code,
                reason: reason.to_owned().into(),
            };
            self.sink.lock().await.send(Message::Close(Some(frame))).await?;
            Ok(())
        })
    }
}

/// A frame delivered through a [`ChannelOutbound`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

/// In-process outbound channel backed by an unbounded mpsc queue.
///
/// Used for embedding the relay without a socket and in tests. Sends fail
/// with [`TransportError::Closed`] once the receiving half is dropped.
#[derive(Debug, Clone)]
pub struct ChannelOutbound {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl ChannelOutbound {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Outbound for ChannelOutbound {
    fn send_text<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        let result = self
            .tx
            .send(OutboundFrame::Text(text.to_owned()))
            .map_err(|_| TransportError::Closed);
        Box::pin(async move { result })
    }

    fn close<'a>(&'a self, code: u16, reason: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        let result = self
            .tx
            .send(OutboundFrame::Close { code, reason: reason.to_owned() })
            .map_err(|_| TransportError::Closed);
        Box::pin(async move { result })
    }
}
