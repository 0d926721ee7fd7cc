//! Frame transports used by the client.
//!
//! A [`Connector`] opens one connection to one address. The resulting
//! [`Transport`] moves discrete [`Frame`]s and is shared by the reader loop
//! (which only calls [`Transport::recv`]) and everything that sends, so
//! implementations must allow a `recv` and a `send` to be in flight at the
//! same time.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

mod websocket;

pub use websocket::{WebSocketConnector, WebSocketTransport};

/// One unit delivered by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Application data carrying zero or more encoded messages.
    Data(Bytes),
    /// Liveness check.
    Ping(Bytes),
    /// Liveness check reply.
    Pong(Bytes),
    /// Graceful shutdown notice.
    Close,
}

/// Transport errors.
///
/// Variants carry rendered messages rather than source errors so the value can
/// be cloned and handed to every caller of `Client::close`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Establishing the connection failed.
    #[error("connection failed: {0}")]
    Connect(String),
    /// The connection has already been closed.
    #[error("connection closed")]
    Closed,
    /// Reading or writing the stream failed.
    #[error("stream error: {0}")]
    Stream(String),
}

/// An established, frame-oriented connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Wait for the next frame.
    ///
    /// Must be cancellation-safe: dropping a pending call must not lose a
    /// frame that was already read.
    async fn recv(&self) -> Result<Frame, TransportError>;

    /// Send one frame.
    async fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Opens transports to candidate addresses.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `addr`.
    async fn connect(&self, addr: &str) -> Result<Box<dyn Transport>, TransportError>;
}
