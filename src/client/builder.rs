//! Builder for [`Client`].

use std::{
    fmt,
    sync::{Arc, RwLock, atomic::AtomicBool},
};

use tracing::Span;

use super::{
    Client,
    ClientConfig,
    ClientError,
    CloseReason,
    DispatchTable,
    TracingConfig,
    close::{CloseHandler, Lifecycle},
    dispatch::HandlerError,
    runtime::ClientInner,
};
use crate::{
    proto::Message,
    transport::{Connector, WebSocketConnector},
};

/// Builder for [`Client`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use opframe::{
///     client::{Client, ClientConfig},
///     proto::op,
/// };
///
/// let client = Client::builder()
///     .route(op::HEARTBEAT_REPLY, |_msg| Ok(()))
///     .expect("first registration succeeds")
///     .config(ClientConfig {
///         heartbeat_interval: Duration::from_secs(30),
///         ..ClientConfig::default()
///     })
///     .on_close(|_client, reason| eprintln!("closed: {reason}"))
///     .build();
/// assert!(!client.is_connected());
/// ```
pub struct ClientBuilder {
    dispatch: DispatchTable,
    config: ClientConfig,
    tracing: TracingConfig,
    span: Option<Span>,
    connector: Arc<dyn Connector>,
    on_close: Option<CloseHandler>,
}

impl Default for ClientBuilder {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("dispatch", &self.dispatch)
            .field("config", &self.config)
            .field("tracing", &self.tracing)
            .field("on_close", &self.on_close.is_some())
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a builder with an empty dispatch table, default settings and
    /// the WebSocket connector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dispatch: DispatchTable::new(),
            config: ClientConfig::default(),
            tracing: TracingConfig::default(),
            span: None,
            connector: Arc::new(WebSocketConnector::default()),
            on_close: None,
        }
    }

    /// Replace the dispatch table.
    #[must_use]
    pub fn dispatch(mut self, dispatch: DispatchTable) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Register a handler for `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DuplicateRoute`] if a handler for `operation`
    /// was already registered.
    pub fn route<F>(mut self, operation: u32, handler: F) -> Result<Self, ClientError>
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.dispatch = self.dispatch.route(operation, handler)?;
        Ok(self)
    }

    /// Replace the timing and capacity settings. Values are normalized when
    /// the client is built.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the tracing configuration.
    #[must_use]
    pub fn tracing_config(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }

    /// Set the span every client span and event is recorded under.
    ///
    /// Defaults to an `INFO` span named `opframe.client`.
    #[must_use]
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Replace the connector used by [`Client::dial`].
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Run `handler` once per completed teardown, after the connection has
    /// been released.
    #[must_use]
    pub fn on_close<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Client, CloseReason) + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(handler));
        self
    }

    /// Build the client. No connection is made until [`Client::dial`].
    #[must_use]
    pub fn build(self) -> Client {
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("opframe.client"));
        Client {
            inner: Arc::new(ClientInner {
                dispatch: self.dispatch,
                config: self.config.normalized(),
                tracing: self.tracing,
                span,
                connector: self.connector,
                on_close: self.on_close,
                authenticated: AtomicBool::new(false),
                transport: RwLock::new(None),
                lifecycle: RwLock::new(Lifecycle::new()),
            }),
        }
    }
}
