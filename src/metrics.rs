//! Metric helpers for `opframe`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper is a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::client::CloseReason;

/// Name of the gauge tracking bound connections.
pub const CONNECTIONS_ACTIVE: &str = "opframe_connections_active";
/// Name of the counter tracking transport frames.
pub const FRAMES_PROCESSED: &str = "opframe_frames_processed_total";
/// Name of the counter tracking messages taken off the queue.
pub const MESSAGES_DISPATCHED: &str = "opframe_messages_dispatched_total";
/// Name of the counter tracking recoverable errors.
pub const ERRORS_TOTAL: &str = "opframe_errors_total";
/// Name of the counter tracking completed teardowns.
pub const CLOSES_TOTAL: &str = "opframe_closes_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Frames received from the peer.
    Inbound,
    /// Frames sent to the peer.
    Outbound,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// What happened to a dequeued message.
#[derive(Clone, Copy, Debug)]
pub enum DispatchOutcome {
    /// A handler ran and succeeded.
    Handled,
    /// A handler ran and returned an error or panicked.
    Failed,
    /// No handler was registered for the operation.
    Unrouted,
}

impl DispatchOutcome {
    fn as_str(self) -> &'static str {
        match self {
            DispatchOutcome::Handled => "handled",
            DispatchOutcome::Failed => "failed",
            DispatchOutcome::Unrouted => "unrouted",
        }
    }
}

/// Category of a logged, non-fatal error.
#[derive(Clone, Copy, Debug)]
pub enum ErrorKind {
    /// A frame could not be decoded.
    Decode,
    /// Receiving from the transport failed.
    Read,
    /// Sending a frame failed.
    Send,
}

impl ErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Decode => "decode",
            ErrorKind::Read => "read",
            ErrorKind::Send => "send",
        }
    }
}

/// Increment the bound connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the bound connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction.as_str();
}

/// Record a dequeued message and what became of it.
pub fn inc_dispatched(outcome: DispatchOutcome) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_DISPATCHED, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome.as_str();
}

/// Record a non-fatal error.
pub fn inc_errors(kind: ErrorKind) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "kind" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind.as_str();
}

/// Record a completed teardown.
pub fn inc_closes(reason: CloseReason) {
    #[cfg(feature = "metrics")]
    counter!(CLOSES_TOTAL, "reason" => reason.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = reason.as_str();
}
