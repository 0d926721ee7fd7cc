//! In-memory transport pair.
//!
//! [`memory_pair`] returns the client side ([`MemoryTransport`]) and a
//! [`MemoryPeer`] that plays the remote endpoint: it injects frames or read
//! errors and observes everything the client sends.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bytes::BytesMut;
use opframe::{
    proto::{self, Message},
    transport::{Frame, Transport, TransportError},
};
use tokio::sync::{Mutex, mpsc};

#[derive(Debug, Default)]
struct LinkState {
    closed: AtomicBool,
    close_calls: AtomicUsize,
    stall_sends: AtomicBool,
    hang_up_on_close: AtomicBool,
}

/// Client side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: Mutex<mpsc::UnboundedReceiver<Result<Frame, TransportError>>>,
    outbound: mpsc::UnboundedSender<Frame>,
    hang_up: mpsc::WeakUnboundedSender<Result<Frame, TransportError>>,
    state: Arc<LinkState>,
}

/// Remote side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    inbound: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    outbound: mpsc::UnboundedReceiver<Frame>,
    state: Arc<LinkState>,
}

/// Create a connected transport and peer.
#[must_use]
pub fn memory_pair() -> (MemoryTransport, MemoryPeer) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let state = Arc::new(LinkState::default());
    (
        MemoryTransport {
            inbound: Mutex::new(in_rx),
            outbound: out_tx,
            hang_up: in_tx.downgrade(),
            state: Arc::clone(&state),
        },
        MemoryPeer {
            inbound: in_tx,
            outbound: out_rx,
            state,
        },
    )
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn recv(&self) -> Result<Frame, TransportError> {
        self.inbound
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(Err(TransportError::Closed))
    }

    async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.state.stall_sends.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let hang_up = frame == Frame::Close && self.state.hang_up_on_close.load(Ordering::SeqCst);
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::Closed)?;
        if hang_up {
            if let Some(inbound) = self.hang_up.upgrade() {
                let _ = inbound.send(Err(TransportError::Stream("peer hung up".to_owned())));
            }
            // Let the reader run before the write completes, as a socket would.
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl MemoryPeer {
    /// Deliver `frame` to the client. Ignored once the client side is gone.
    pub fn push(&self, frame: Frame) { let _ = self.inbound.send(Ok(frame)); }

    /// Deliver `messages` to the client packed into one data frame.
    ///
    /// # Panics
    ///
    /// Panics if a message cannot be encoded.
    pub fn push_messages(&self, messages: &[Message]) {
        let mut buf = BytesMut::new();
        for message in messages {
            buf.extend_from_slice(&message.to_bytes().expect("encode test message"));
        }
        self.push(Frame::Data(buf.freeze()));
    }

    /// Make every later client send hang forever, like a peer that stopped
    /// reading.
    pub fn stall_sends(&self) { self.state.stall_sends.store(true, Ordering::SeqCst); }

    /// Answer the client's close frame by failing its next read.
    pub fn hang_up_on_close(&self) { self.state.hang_up_on_close.store(true, Ordering::SeqCst); }

    /// Make the client's next read fail with `error`.
    pub fn fail(&self, error: TransportError) { let _ = self.inbound.send(Err(error)); }

    /// Wait for the next frame the client sends; `None` once the client side
    /// has been dropped.
    pub async fn next_sent(&mut self) -> Option<Frame> { self.outbound.recv().await }

    /// Next frame the client has already sent, if any.
    pub fn try_sent(&mut self) -> Option<Frame> { self.outbound.try_recv().ok() }

    /// Wait for the next data frame and decode it, skipping control frames.
    ///
    /// # Panics
    ///
    /// Panics if the frame does not decode.
    pub async fn next_message(&mut self) -> Option<Message> {
        loop {
            match self.next_sent().await? {
                Frame::Data(data) => {
                    let mut messages = proto::unpack(data).expect("decode client frame");
                    assert_eq!(messages.len(), 1, "client sends one message per frame");
                    return messages.pop();
                }
                Frame::Ping(_) | Frame::Pong(_) | Frame::Close => {}
            }
        }
    }

    /// How many times the client called [`Transport::close`].
    #[must_use]
    pub fn close_calls(&self) -> usize { self.state.close_calls.load(Ordering::SeqCst) }

    /// Whether the client released the connection.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.state.closed.load(Ordering::SeqCst) }
}
