//! Connector that hands out in-memory transports for chosen addresses.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use opframe::{
    client::{Client, ClientBuilder},
    transport::{Connector, Transport, TransportError},
};

use crate::memory::{MemoryPeer, MemoryTransport, memory_pair};

#[derive(Debug, Default)]
struct Script {
    ready: HashMap<String, VecDeque<MemoryTransport>>,
    attempts: Vec<String>,
}

/// Address every `connected_client` dials.
pub const MEMORY_ADDR: &str = "mem://primary";

/// A [`Connector`] that succeeds only for addresses prepared with
/// [`ScriptedConnector::accept`]; every other address is refused.
///
/// Clones share the same script so a test can keep a handle after moving
/// one into a client builder.
#[derive(Clone, Debug, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    /// Create a connector that refuses everything.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Let the next dial of `addr` succeed and return the remote end.
    ///
    /// # Panics
    ///
    /// Panics if the script lock is poisoned.
    pub fn accept(&self, addr: &str) -> MemoryPeer {
        let (transport, peer) = memory_pair();
        self.script
            .lock()
            .expect("script lock")
            .ready
            .entry(addr.to_owned())
            .or_default()
            .push_back(transport);
        peer
    }

    /// Every address dialed so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the script lock is poisoned.
    #[must_use]
    pub fn attempts(&self) -> Vec<String> { self.script.lock().expect("script lock").attempts.clone() }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, addr: &str) -> Result<Box<dyn Transport>, TransportError> {
        let mut script = self.script.lock().expect("script lock");
        script.attempts.push(addr.to_owned());
        match script.ready.get_mut(addr).and_then(VecDeque::pop_front) {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(TransportError::Connect(format!("{addr} refused"))),
        }
    }
}

/// Build a client from `builder` with a fresh [`ScriptedConnector`] and dial
/// [`MEMORY_ADDR`].
///
/// # Panics
///
/// Panics if the dial fails.
pub async fn connected_client(builder: ClientBuilder) -> (Client, MemoryPeer, ScriptedConnector) {
    let connector = ScriptedConnector::new();
    let peer = connector.accept(MEMORY_ADDR);
    let client = builder.connector(connector.clone()).build();
    client.dial(&[MEMORY_ADDR]).await.expect("dial in-memory peer");
    (client, peer, connector)
}
