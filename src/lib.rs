#![doc(html_root_url = "https://docs.rs/opframe/latest")]
//! Public API for the `opframe` library.
//!
//! `opframe` keeps a persistent, message-oriented connection to one of
//! several candidate endpoints. Messages carry an operation code and are
//! routed to handlers registered in a [`DispatchTable`]. The client sends
//! heartbeats, enforces an authentication deadline and tears the connection
//! down exactly once, whoever asks first.

pub mod client;
pub mod metrics;
pub mod proto;
pub mod transport;

pub use client::{Client, ClientBuilder, ClientConfig, ClientError, CloseReason, DispatchTable};
pub use metrics::{CLOSES_TOTAL, CONNECTIONS_ACTIVE, Direction, ERRORS_TOTAL, FRAMES_PROCESSED};
pub use proto::{Message, ProtoError};
pub use transport::{Connector, Frame, Transport, TransportError};
