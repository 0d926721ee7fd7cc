//! Utilities for driving an [`opframe::Client`] during tests.
//!
//! The in-memory [`MemoryTransport`] and [`ScriptedConnector`] let tests
//! script the remote end frame by frame; [`WsTestServer`] serves real
//! WebSocket connections on loopback.
//!
//! ```rust
//! use opframe::{Client, proto::Message, proto::op};
//! use opframe_testing::connected_client;
//!
//! # async fn example() {
//! let (client, peer, _connector) = connected_client(Client::builder()).await;
//! client.run().unwrap();
//! peer.push_messages(&[Message::new(1, op::SEND_MSG_REPLY, "hello")]);
//! # }
//! ```

mod connector;
mod memory;
mod recorder;
mod ws_server;

pub use connector::{MEMORY_ADDR, ScriptedConnector, connected_client};
pub use memory::{MemoryPeer, MemoryTransport, memory_pair};
pub use recorder::{CloseRecorder, close_recorder};
pub use ws_server::{WsTestServer, unreachable_url};
