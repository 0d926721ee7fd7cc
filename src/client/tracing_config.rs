//! Tracing configuration for client operations.
//!
//! [`TracingConfig`] controls the level of the spans each client operation
//! opens and whether per-command elapsed-time events are recorded.

use tracing::Level;

/// Controls tracing span levels and per-command timing for client operations.
///
/// By default, lifecycle operations (`dial`, `close`) and both loops emit
/// spans at `INFO` level. `send` emits spans at `DEBUG` level because it runs
/// for every heartbeat. Per-command timing is disabled for all operations by
/// default.
///
/// Every span is a child of the span passed to the client at construction,
/// so fields recorded there (a room id, a session name) appear on every
/// event the client emits. When per-command timing is enabled for an
/// operation, an additional event recording `elapsed_us` is emitted when the
/// operation completes.
///
/// # Examples
///
/// ```
/// use opframe::client::TracingConfig;
/// use tracing::Level;
///
/// // Enable timing for dial and close only.
/// let config = TracingConfig::default()
///     .with_dial_timing(true)
///     .with_close_timing(true);
/// let _ = config;
///
/// // Set all operations to TRACE level.
/// let verbose = TracingConfig::default()
///     .with_all_levels(Level::TRACE)
///     .with_all_timing(true);
/// let _ = verbose;
/// ```
#[derive(Clone, Debug)]
pub struct TracingConfig {
    pub(crate) dial_level: Level,
    pub(crate) send_level: Level,
    pub(crate) close_level: Level,
    pub(crate) loop_level: Level,
    pub(crate) dial_timing: bool,
    pub(crate) send_timing: bool,
    pub(crate) close_timing: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            dial_level: Level::INFO,
            send_level: Level::DEBUG,
            close_level: Level::INFO,
            loop_level: Level::INFO,
            dial_timing: false,
            send_timing: false,
            close_timing: false,
        }
    }
}

impl TracingConfig {
    /// Set the tracing level for the `dial` operation.
    ///
    /// # Examples
    ///
    /// ```
    /// use opframe::client::TracingConfig;
    /// use tracing::Level;
    ///
    /// let config = TracingConfig::default().with_dial_level(Level::TRACE);
    /// let _ = config;
    /// ```
    #[must_use]
    pub fn with_dial_level(mut self, level: Level) -> Self {
        self.dial_level = level;
        self
    }

    /// Enable or disable per-command timing for the `dial` operation.
    ///
    /// When enabled, an event recording `elapsed_us` is emitted at `DEBUG`
    /// level once every candidate address has been tried or one succeeded.
    #[must_use]
    pub fn with_dial_timing(mut self, enabled: bool) -> Self {
        self.dial_timing = enabled;
        self
    }

    /// Set the tracing level for outbound messages, heartbeats included.
    #[must_use]
    pub fn with_send_level(mut self, level: Level) -> Self {
        self.send_level = level;
        self
    }

    /// Enable or disable per-command timing for outbound messages.
    #[must_use]
    pub fn with_send_timing(mut self, enabled: bool) -> Self {
        self.send_timing = enabled;
        self
    }

    /// Set the tracing level for teardown.
    #[must_use]
    pub fn with_close_level(mut self, level: Level) -> Self {
        self.close_level = level;
        self
    }

    /// Enable or disable per-command timing for teardown.
    #[must_use]
    pub fn with_close_timing(mut self, enabled: bool) -> Self {
        self.close_timing = enabled;
        self
    }

    /// Set the level of the long-lived reader and event loop spans.
    #[must_use]
    pub fn with_loop_level(mut self, level: Level) -> Self {
        self.loop_level = level;
        self
    }

    /// Set the tracing level for all operations at once.
    #[must_use]
    pub fn with_all_levels(mut self, level: Level) -> Self {
        self.dial_level = level;
        self.send_level = level;
        self.close_level = level;
        self.loop_level = level;
        self
    }

    /// Enable or disable per-command timing for all operations at once.
    ///
    /// # Examples
    ///
    /// ```
    /// use opframe::client::TracingConfig;
    ///
    /// let config = TracingConfig::default().with_all_timing(true);
    /// let _ = config;
    /// ```
    #[must_use]
    pub fn with_all_timing(mut self, enabled: bool) -> Self {
        self.dial_timing = enabled;
        self.send_timing = enabled;
        self.close_timing = enabled;
        self
    }
}
