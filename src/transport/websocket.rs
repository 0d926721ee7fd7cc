//! WebSocket transport built on `tokio-tungstenite`.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{
    SinkExt,
    StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::Mutex,
    time,
};
use tokio_tungstenite::{
    MaybeTlsStream,
    WebSocketStream,
    connect_async,
    tungstenite::{
        self,
        Message as WsMessage,
        protocol::{
            CloseFrame,
            frame::{Utf8Bytes, coding::CloseCode},
        },
    },
};

use super::{Connector, Frame, Transport, TransportError};

/// Connects to `ws://` and `wss://` URLs.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use opframe::transport::WebSocketConnector;
///
/// let connector = WebSocketConnector::default().with_timeout(Duration::from_secs(5));
/// let _ = connector;
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketConnector {
    timeout: Option<Duration>,
}

impl WebSocketConnector {
    /// Abandon a connection attempt that has not completed within `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, addr: &str) -> Result<Box<dyn Transport>, TransportError> {
        let handshake = connect_async(addr);
        let result = match self.timeout {
            Some(timeout) => time::timeout(timeout, handshake)
                .await
                .map_err(|_| TransportError::Connect(format!("timed out after {timeout:?}")))?,
            None => handshake.await,
        };
        let (stream, _response) = result.map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Box::new(WebSocketTransport::new(stream)))
    }
}

/// A WebSocket connection split into independently locked halves so one task
/// can block in [`Transport::recv`] while others send.
pub struct WebSocketTransport<S = MaybeTlsStream<TcpStream>> {
    sink: Mutex<SplitSink<WebSocketStream<S>, WsMessage>>,
    stream: Mutex<SplitStream<WebSocketStream<S>>>,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established WebSocket stream.
    #[must_use]
    pub fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

impl<S> fmt::Debug for WebSocketTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&self) -> Result<Frame, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            let Some(message) = stream.next().await else {
                return Err(TransportError::Closed);
            };
            match message.map_err(stream_error)? {
                WsMessage::Binary(data) => return Ok(Frame::Data(data)),
                WsMessage::Text(text) => {
                    return Ok(Frame::Data(Bytes::copy_from_slice(text.as_bytes())));
                }
                WsMessage::Ping(data) => return Ok(Frame::Ping(data)),
                WsMessage::Pong(data) => return Ok(Frame::Pong(data)),
                WsMessage::Close(_) => return Ok(Frame::Close),
                // Raw frames only surface when reading at the frame level.
                WsMessage::Frame(_) => {}
            }
        }
    }

    async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Data(data) => WsMessage::Binary(data),
            Frame::Ping(data) => WsMessage::Ping(data),
            Frame::Pong(data) => WsMessage::Pong(data),
            Frame::Close => WsMessage::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: Utf8Bytes::from_static(""),
            })),
        };
        self.sink.lock().await.send(message).await.map_err(stream_error)
    }

    async fn close(&self) -> Result<(), TransportError> {
        match self.sink.lock().await.close().await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(error) => Err(stream_error(error)),
        }
    }
}

fn stream_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::Stream(other.to_string()),
    }
}
