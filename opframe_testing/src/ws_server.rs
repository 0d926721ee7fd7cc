//! Loopback WebSocket server for end-to-end tests.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite};

/// A bound listener that upgrades accepted connections to WebSocket.
#[derive(Debug)]
pub struct WsTestServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl WsTestServer {
    /// Bind to an ephemeral loopback port.
    ///
    /// # Errors
    ///
    /// Returns any error from binding the listener.
    pub async fn bind() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// `ws://` URL clients should dial.
    #[must_use]
    pub fn url(&self) -> String { format!("ws://{}", self.addr) }

    /// Accept one connection and complete the WebSocket handshake.
    ///
    /// # Errors
    ///
    /// Returns the accept or handshake failure.
    pub async fn accept(&self) -> Result<WebSocketStream<TcpStream>, tungstenite::Error> {
        let (stream, _) = self.listener.accept().await?;
        accept_async(stream).await
    }
}

/// A `ws://` URL nothing listens on.
///
/// # Errors
///
/// Returns any error from binding the throwaway listener.
pub async fn unreachable_url() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("ws://{addr}"))
}
