//! Close reasons and the per-connection lifecycle.
//!
//! A [`Lifecycle`] bundles everything that must happen at most once per
//! connection: the close signal both loops watch, the tracker teardown waits
//! on, and the guard that lets exactly one caller run the teardown body.
//! `Client::reset` replaces the whole bundle.

use std::{
    fmt,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use futures::future::{BoxFuture, Shared};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{Client, ClientError};
use crate::transport::TransportError;

/// Why a connection was torn down.
///
/// The numeric codes are stable and may be persisted or sent elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CloseReason {
    /// Authentication did not succeed within the configured window.
    AuthFailed = 1,
    /// The owner asked for the close.
    Actively = 2,
    /// Receiving from the connection failed.
    ReadingConnError = 3,
    /// The peer sent a close frame.
    ReceivedShutdownMessage = 4,
    /// Anything else.
    Unknown = 5,
}

impl CloseReason {
    /// Stable numeric code of this reason.
    ///
    /// # Examples
    ///
    /// ```
    /// use opframe::client::CloseReason;
    ///
    /// assert_eq!(CloseReason::Actively.code(), 2);
    /// ```
    #[must_use]
    pub fn code(self) -> u8 { self as u8 }

    /// Map a numeric code back to a reason; unknown codes become
    /// [`CloseReason::Unknown`].
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::AuthFailed,
            2 => Self::Actively,
            3 => Self::ReadingConnError,
            4 => Self::ReceivedShutdownMessage,
            _ => Self::Unknown,
        }
    }

    /// Short label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthFailed => "auth_failed",
            Self::Actively => "actively",
            Self::ReadingConnError => "reading_conn_error",
            Self::ReceivedShutdownMessage => "received_shutdown_message",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Callback run once per completed teardown.
///
/// It runs after the connection has been released, so it may call
/// `Client::reset` and start a fresh dial.
pub type CloseHandler = Arc<dyn Fn(&Client, CloseReason) + Send + Sync>;

/// Outcome of a teardown that is already running in its own task. Every
/// close caller awaits a clone.
pub(crate) type Teardown = Shared<BoxFuture<'static, Result<(), TransportError>>>;

#[derive(Default)]
struct Gate {
    started: bool,
    closed: bool,
}

/// State shared by both loops and every close caller of one connection.
#[derive(Default)]
pub(crate) struct Lifecycle {
    shutdown: CancellationToken,
    tracker: TaskTracker,
    gate: Mutex<Gate>,
    teardown: OnceLock<Teardown>,
}

impl Lifecycle {
    pub(crate) fn new() -> Arc<Self> { Arc::new(Self::default()) }

    /// Run `spawn` with the tracker unless the loops already started or
    /// teardown already began.
    ///
    /// Holding the gate while spawning means teardown either sees the loops
    /// in the tracker or refuses to let them start.
    pub(crate) fn start<F>(&self, spawn: F) -> Result<(), ClientError>
    where
        F: FnOnce(&TaskTracker, &CancellationToken),
    {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if gate.closed {
            return Err(ClientError::Closed);
        }
        if gate.started {
            return Err(ClientError::AlreadyRunning);
        }
        gate.started = true;
        spawn(&self.tracker, &self.shutdown);
        Ok(())
    }

    /// Flag teardown as begun and signal both loops to exit.
    pub(crate) fn mark_closed(&self) {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        gate.closed = true;
        self.shutdown.cancel();
        self.tracker.close();
    }

    /// The teardown of this connection. `begin` starts it and runs only for
    /// the first caller.
    pub(crate) fn teardown<F>(&self, begin: F) -> Teardown
    where
        F: FnOnce() -> Teardown,
    {
        self.teardown.get_or_init(begin).clone()
    }

    /// Whether teardown has begun.
    pub(crate) fn is_closed(&self) -> bool { self.shutdown.is_cancelled() }

    /// Wait until every tracked loop has exited. Only resolves after
    /// [`Lifecycle::mark_closed`].
    pub(crate) async fn wait_loops(&self) { self.tracker.wait().await; }

    pub(crate) fn active_loops(&self) -> usize { self.tracker.len() }

    pub(crate) fn shutdown(&self) -> &CancellationToken { &self.shutdown }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("closed", &self.is_closed())
            .field("active_loops", &self.active_loops())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(CloseReason::AuthFailed, 1)]
    #[case(CloseReason::Actively, 2)]
    #[case(CloseReason::ReadingConnError, 3)]
    #[case(CloseReason::ReceivedShutdownMessage, 4)]
    #[case(CloseReason::Unknown, 5)]
    fn codes_are_stable(#[case] reason: CloseReason, #[case] code: u8) {
        assert_eq!(reason.code(), code);
        assert_eq!(CloseReason::from_code(code), reason);
    }

    #[rstest]
    #[case(0)]
    #[case(6)]
    #[case(u8::MAX)]
    fn unknown_codes_map_to_unknown(#[case] code: u8) {
        assert_eq!(CloseReason::from_code(code), CloseReason::Unknown);
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(CloseReason::ReadingConnError.to_string(), "reading_conn_error");
    }

    #[tokio::test]
    async fn start_refuses_second_run() {
        let lifecycle = Lifecycle::new();
        lifecycle.start(|_, _| {}).expect("first start");
        let err = lifecycle.start(|_, _| {}).expect_err("second start must fail");
        assert!(matches!(err, ClientError::AlreadyRunning));
    }

    #[tokio::test]
    async fn start_refuses_after_close() {
        let lifecycle = Lifecycle::new();
        lifecycle.mark_closed();
        let err = lifecycle
            .start(|_, _| panic!("loops must not spawn after close"))
            .expect_err("start after close must fail");
        assert!(matches!(err, ClientError::Closed));
        assert!(lifecycle.is_closed());
    }

    #[tokio::test]
    async fn teardown_begins_once() {
        use futures::FutureExt;

        let lifecycle = Lifecycle::new();
        let first = lifecycle.teardown(|| async { Ok(()) }.boxed().shared());
        let second = lifecycle.teardown(|| {
            async { Err(TransportError::Closed) }.boxed().shared()
        });

        assert_eq!(first.await, Ok(()));
        assert_eq!(second.await, Ok(()));
    }

    #[tokio::test]
    async fn mark_closed_releases_tracked_tasks() {
        let lifecycle = Lifecycle::new();
        lifecycle
            .start(|tracker, shutdown| {
                let shutdown = shutdown.clone();
                tracker.spawn(async move { shutdown.cancelled().await });
            })
            .expect("start");
        assert_eq!(lifecycle.active_loops(), 1);
        lifecycle.mark_closed();
        lifecycle.wait_loops().await;
        assert_eq!(lifecycle.active_loops(), 0);
    }
}
