//! Client runtime: dialing, the control surface and teardown.

use std::{
    fmt,
    sync::{
        Arc,
        PoisonError,
        RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::Bytes;
use futures::FutureExt;
use tokio::{sync::mpsc, time};
use tracing::{Instrument, Span, debug, info, warn};

use super::{
    ClientBuilder,
    ClientConfig,
    ClientError,
    DispatchTable,
    TracingConfig,
    close::{CloseHandler, CloseReason, Lifecycle, Teardown},
    event_loop,
    reader,
    tracing_helpers::{
        close_span,
        dial_span,
        emit_timing_event,
        event_loop_span,
        reader_span,
        send_span,
        start_timer,
    },
};
use crate::{
    metrics::{self, Direction, ErrorKind},
    proto::Message,
    transport::{Connector, Frame, Transport, TransportError},
};

pub(crate) struct ClientInner {
    pub(crate) dispatch: DispatchTable,
    pub(crate) config: ClientConfig,
    pub(crate) tracing: TracingConfig,
    pub(crate) span: Span,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) on_close: Option<CloseHandler>,
    pub(crate) authenticated: AtomicBool,
    pub(crate) transport: RwLock<Option<Arc<dyn Transport>>>,
    pub(crate) lifecycle: RwLock<Arc<Lifecycle>>,
}

/// A persistent, message-oriented connection to one of several candidate
/// endpoints.
///
/// `Client` is a cheap handle; clones share the same connection. The usual
/// sequence is [`dial`](Self::dial), [`run`](Self::run), send an
/// authentication request and call [`auth_success`](Self::auth_success) from
/// the handler that sees the reply. Teardown happens exactly once per
/// connection through [`close`](Self::close), whether the owner, the reader
/// loop or the event loop asks for it first. [`reset`](Self::reset) makes a
/// closed client reusable.
///
/// # Examples
///
/// ```no_run
/// use opframe::{
///     client::{Client, CloseReason, DispatchTable},
///     proto::op,
/// };
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), opframe::client::ClientError> {
/// let dispatch = DispatchTable::new().route(op::AUTH_REPLY, |_msg| Ok(()))?;
/// let client = Client::new(dispatch, tracing::info_span!("room", id = 42));
/// client.dial(&["wss://a.example/sub", "wss://b.example/sub"]).await?;
/// client.run()?;
/// client.send_auth(r#"{"key":"secret"}"#).await?;
/// client.close(CloseReason::Actively).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

/// What both loops of one connection share.
pub(crate) struct LoopContext {
    pub(crate) client: Client,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) lifecycle: Arc<Lifecycle>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("dispatch", &self.inner.dispatch)
            .field("config", &self.inner.config)
            .field("connected", &self.is_connected())
            .field("authenticated", &self.is_authed())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client with the default WebSocket connector and settings.
    ///
    /// Every span the client opens is a child of `span`.
    #[must_use]
    pub fn new(dispatch: DispatchTable, span: Span) -> Self {
        Self::builder().dispatch(dispatch).span(span).build()
    }

    /// Start building a client.
    #[must_use]
    pub fn builder() -> ClientBuilder { ClientBuilder::new() }

    /// Try each candidate address in order and bind the first connection that
    /// succeeds.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NoAddresses`] when `addrs` is empty.
    /// - [`ClientError::Closed`] when the current connection was torn down and
    ///   the client has not been reset.
    /// - [`ClientError::AlreadyConnected`] when a connection is already bound.
    /// - [`ClientError::Dial`] when every candidate failed; no connection is
    ///   bound.
    pub async fn dial<S: AsRef<str>>(&self, addrs: &[S]) -> Result<(), ClientError> {
        if addrs.is_empty() {
            return Err(ClientError::NoAddresses);
        }
        let lifecycle = self.lifecycle();
        if lifecycle.is_closed() {
            return Err(ClientError::Closed);
        }
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }

        let span = dial_span(&self.inner.tracing, &self.inner.span, addrs.len());
        let start = start_timer(self.inner.tracing.dial_timing);
        let result = self
            .dial_candidates(&lifecycle, addrs)
            .instrument(span.clone())
            .await;
        span.in_scope(|| emit_timing_event(start));
        result
    }

    async fn dial_candidates<S: AsRef<str>>(
        &self,
        lifecycle: &Lifecycle,
        addrs: &[S],
    ) -> Result<(), ClientError> {
        let mut last_error = None;
        for addr in addrs.iter().map(AsRef::as_ref) {
            match self.inner.connector.connect(addr).await {
                Ok(transport) => return self.bind(lifecycle, addr, Arc::from(transport)).await,
                Err(error) => {
                    warn!(addr, %error, "dial attempt failed");
                    last_error = Some(error);
                }
            }
        }
        let Some(source) = last_error else {
            return Err(ClientError::NoAddresses);
        };
        Err(ClientError::Dial {
            addrs: addrs.iter().map(|addr| addr.as_ref().to_owned()).collect(),
            source,
        })
    }

    async fn bind(
        &self,
        lifecycle: &Lifecycle,
        addr: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<(), ClientError> {
        let refused = {
            let mut slot = self
                .inner
                .transport
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            // Teardown marks the lifecycle closed before taking the slot, so
            // checking under the lock keeps a late dial from outliving it.
            if lifecycle.is_closed() {
                Some(ClientError::Closed)
            } else if slot.is_some() {
                Some(ClientError::AlreadyConnected)
            } else {
                *slot = Some(Arc::clone(&transport));
                None
            }
        };
        if let Some(error) = refused {
            if let Err(close_error) = transport.close().await {
                debug!(addr, error = %close_error, "closing unused connection failed");
            }
            return Err(error);
        }
        Span::current().record("peer.addr", addr);
        info!(addr, "dial succeeded");
        metrics::inc_connections();
        Ok(())
    }

    /// Spawn the reader and event loops for the bound connection on the
    /// current tokio runtime and return immediately.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConnected`] when no connection is bound.
    /// - [`ClientError::AlreadyRunning`] when the loops were already started.
    /// - [`ClientError::Closed`] when teardown has begun; reset first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn run(&self) -> Result<(), ClientError> {
        let transport = self.transport().ok_or(ClientError::NotConnected)?;
        let lifecycle = self.lifecycle();
        lifecycle.start(|tracker, _shutdown| {
            let (queue_tx, queue_rx) = mpsc::channel(self.inner.config.queue_capacity);
            let reader_ctx = LoopContext {
                client: self.clone(),
                transport: Arc::clone(&transport),
                lifecycle: Arc::clone(&lifecycle),
            };
            let event_ctx = LoopContext {
                client: self.clone(),
                transport,
                lifecycle: Arc::clone(&lifecycle),
            };
            tracker.spawn(
                reader::run(reader_ctx, queue_tx)
                    .instrument(reader_span(&self.inner.tracing, &self.inner.span)),
            );
            tracker.spawn(
                event_loop::run(event_ctx, queue_rx)
                    .instrument(event_loop_span(&self.inner.tracing, &self.inner.span)),
            );
        })
    }

    /// Tear the current connection down.
    ///
    /// The first caller signals both loops to exit, sends a best-effort close
    /// frame, waits until the loops have exited, releases the connection and
    /// finally runs the `on_close` callback with `reason`. Concurrent callers
    /// wait for that to finish; every caller, concurrent or later, gets the
    /// same outcome and the reason of later callers is ignored.
    ///
    /// The teardown runs in its own task, so it completes even when the
    /// returned future is dropped early.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Close`] if releasing the connection failed.
    pub async fn close(&self, reason: CloseReason) -> Result<(), ClientError> {
        let lifecycle = self.lifecycle();
        self.begin_teardown(&lifecycle, reason)
            .await
            .map_err(ClientError::Close)
    }

    /// Start the teardown of `lifecycle` unless it already started, and return
    /// its shared outcome.
    fn begin_teardown(&self, lifecycle: &Arc<Lifecycle>, reason: CloseReason) -> Teardown {
        lifecycle.teardown(|| {
            let client = self.clone();
            let owned = Arc::clone(lifecycle);
            let task = tokio::spawn(
                async move { client.teardown(&owned, reason).await }.in_current_span(),
            );
            async move {
                task.await.unwrap_or_else(|error| {
                    Err(TransportError::Stream(format!("teardown task failed: {error}")))
                })
            }
            .boxed()
            .shared()
        })
    }

    /// Close `lifecycle` from a loop without waiting for the teardown, which
    /// itself waits for that loop to exit.
    pub(crate) fn spawn_close(&self, lifecycle: &Arc<Lifecycle>, reason: CloseReason) {
        // The outcome is logged by the teardown.
        drop(self.begin_teardown(lifecycle, reason));
    }

    async fn teardown(
        &self,
        lifecycle: &Lifecycle,
        reason: CloseReason,
    ) -> Result<(), TransportError> {
        let span = close_span(&self.inner.tracing, &self.inner.span, reason);
        let start = start_timer(self.inner.tracing.close_timing);
        let result = self
            .release(lifecycle, reason)
            .instrument(span.clone())
            .await;
        span.record("result", if result.is_ok() { "ok" } else { "error" });
        span.in_scope(|| {
            emit_timing_event(start);
            if let Some(on_close) = &self.inner.on_close {
                on_close(self, reason);
            }
        });
        result
    }

    async fn release(
        &self,
        lifecycle: &Lifecycle,
        reason: CloseReason,
    ) -> Result<(), TransportError> {
        info!(reason = %reason, code = reason.code(), "closing connection");
        // Loops see the close before the peer can answer the close frame, so
        // its reply is not mistaken for a read failure.
        lifecycle.mark_closed();
        if let Some(transport) = self.transport() {
            match time::timeout(
                self.inner.config.close_frame_timeout,
                transport.send(Frame::Close),
            )
            .await
            {
                Ok(Ok(())) => debug!("close frame sent"),
                Ok(Err(error)) => debug!(%error, "close frame not sent"),
                Err(_) => debug!("close frame timed out"),
            }
        }

        lifecycle.wait_loops().await;
        debug!("loops exited");

        let released = self
            .inner
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let result = match released {
            Some(transport) => {
                let result = transport.close().await;
                metrics::dec_connections();
                result
            }
            None => Ok(()),
        };
        match &result {
            Ok(()) => info!(reason = %reason, "connection closed"),
            Err(error) => warn!(reason = %reason, %error, "releasing connection failed"),
        }
        metrics::inc_closes(reason);
        result
    }

    /// Make a closed client reusable.
    ///
    /// Installs a fresh lifecycle and clears the authenticated flag. The
    /// dispatch table, settings, span and callback are kept. May be called
    /// from the `on_close` callback.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Active`] while a connection is still bound.
    pub fn reset(&self) -> Result<(), ClientError> {
        let transport = self
            .inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if transport.is_some() {
            return Err(ClientError::Active);
        }
        *self
            .inner
            .lifecycle
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Lifecycle::new();
        self.inner.authenticated.store(false, Ordering::Release);
        drop(transport);
        debug!(parent: &self.inner.span, "client reset");
        Ok(())
    }

    /// Record that authentication succeeded, which disarms the auth timeout.
    pub fn auth_success(&self) {
        self.inner.authenticated.store(true, Ordering::Release);
        debug!(parent: &self.inner.span, "authenticated");
    }

    /// Whether [`auth_success`](Self::auth_success) was called since the last
    /// reset.
    #[must_use]
    pub fn is_authed(&self) -> bool { self.inner.authenticated.load(Ordering::Acquire) }

    /// Encode `message` and send it as one data frame.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConnected`] when no connection is bound.
    /// - [`ClientError::Encode`] when the message cannot be encoded.
    /// - [`ClientError::Send`] when the transport rejects the frame.
    pub async fn send_message(&self, message: &Message) -> Result<(), ClientError> {
        let transport = self.transport().ok_or(ClientError::NotConnected)?;
        self.send_on(transport.as_ref(), message).await
    }

    pub(crate) async fn send_on(
        &self,
        transport: &dyn Transport,
        message: &Message,
    ) -> Result<(), ClientError> {
        let operation = message.operation();
        let bytes = message.to_bytes().map_err(ClientError::Encode)?;
        let span = send_span(&self.inner.tracing, &self.inner.span, operation, bytes.len());
        let start = start_timer(self.inner.tracing.send_timing);
        let result = transport
            .send(Frame::Data(bytes))
            .instrument(span.clone())
            .await;
        span.in_scope(|| emit_timing_event(start));
        match result {
            Ok(()) => {
                metrics::inc_frames(Direction::Outbound);
                Ok(())
            }
            Err(source) => {
                metrics::inc_errors(ErrorKind::Send);
                Err(ClientError::Send { operation, source })
            }
        }
    }

    /// Send a heartbeat immediately, outside the regular schedule.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub async fn send_heartbeat(&self) -> Result<(), ClientError> {
        self.send_message(&Message::heartbeat()).await
    }

    /// Send an authentication request carrying `payload`.
    ///
    /// The reply arrives as an `AUTH_REPLY` message; its handler decides
    /// whether to call [`auth_success`](Self::auth_success).
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub async fn send_auth(&self, payload: impl Into<Bytes>) -> Result<(), ClientError> {
        self.send_message(&Message::auth(payload)).await
    }

    /// Resolve once teardown of the current connection has begun.
    pub async fn closed(&self) {
        let lifecycle = self.lifecycle();
        lifecycle.shutdown().cancelled().await;
    }

    /// Whether teardown of the current connection has begun.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.lifecycle().is_closed() }

    /// Whether a connection is bound.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of loops the current connection is running.
    #[must_use]
    pub fn active_loops(&self) -> usize { self.lifecycle().active_loops() }

    pub(crate) fn dispatch(&self) -> &DispatchTable { &self.inner.dispatch }

    pub(crate) fn config(&self) -> &ClientConfig { &self.inner.config }

    fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(
            &self
                .inner
                .lifecycle
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
