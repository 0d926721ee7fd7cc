//! Error types for client operations.

use thiserror::Error;

use crate::{proto::ProtoError, transport::TransportError};

/// Errors emitted by [`crate::Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Every candidate address failed to connect.
    #[error("dial failed for all addresses {addrs:?}")]
    Dial {
        /// Addresses attempted, in order.
        addrs: Vec<String>,
        /// Error from the last attempt.
        #[source]
        source: TransportError,
    },
    /// `dial` was called without any candidate addresses.
    #[error("no addresses to dial")]
    NoAddresses,
    /// A connection is already bound to the client.
    #[error("client is already connected")]
    AlreadyConnected,
    /// No connection is bound to the client.
    #[error("client is not connected")]
    NotConnected,
    /// The loops of the current lifecycle have already been started.
    #[error("client loops are already running")]
    AlreadyRunning,
    /// The current lifecycle has been torn down.
    #[error("client has been closed; reset it before reuse")]
    Closed,
    /// The client still holds a connection and cannot be reset.
    #[error("client is still connected; close it before resetting")]
    Active,
    /// A handler was registered twice for one operation.
    #[error("handler for operation {0} was already registered")]
    DuplicateRoute(u32),
    /// Encoding an outbound message failed.
    #[error("failed to encode message")]
    Encode(#[source] ProtoError),
    /// Sending an outbound message failed.
    #[error("failed to send message with operation {operation}")]
    Send {
        /// Operation code of the message.
        operation: u32,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// Releasing the connection during teardown failed.
    #[error("failed to close connection")]
    Close(#[source] TransportError),
}
