//! Persistent, message-oriented client.
//!
//! A [`Client`] dials one of several candidate endpoints and runs two loops
//! over the connection. The reader loop decodes inbound frames and queues
//! the messages; the event loop dispatches them by operation code, sends
//! heartbeats and enforces the authentication deadline. Either loop, or the
//! owner, may ask for teardown; it runs exactly once per connection.

mod builder;
mod close;
mod config;
mod dispatch;
mod error;
mod event_loop;
mod reader;
mod runtime;
mod tracing_config;
mod tracing_helpers;

pub use builder::ClientBuilder;
pub use close::{CloseHandler, CloseReason};
pub use config::{
    ClientConfig,
    DEFAULT_AUTH_TIMEOUT,
    DEFAULT_CLOSE_FRAME_TIMEOUT,
    DEFAULT_HEARTBEAT_INTERVAL,
    DEFAULT_QUEUE_CAPACITY,
};
pub use dispatch::{DispatchHandler, DispatchTable, HandlerError};
pub use error::ClientError;
pub use runtime::Client;
pub use tracing_config::TracingConfig;

#[cfg(test)]
mod tests;
