//! Tracing span and event helpers for client operations.
//!
//! These helpers centralise span creation with dynamic level selection and
//! per-command timing emission, keeping the instrumentation logic out of the
//! client methods. Every span hangs off the client's own span rather than
//! whatever span happens to be current in the caller.

use std::time::Instant;

use tracing::{Level, Span};

use super::{close::CloseReason, tracing_config::TracingConfig};

/// Create a tracing span at a dynamically selected level under `parent`.
///
/// Each branch calls the corresponding `tracing::<level>_span!` macro, which
/// keeps the span metadata statically known per branch while the branch
/// selection is dynamic.
macro_rules! dynamic_span {
    ($level:expr, $parent:expr, $name:expr $(, $($field:tt)*)?) => {
        match $level {
            Level::ERROR => tracing::error_span!(parent: $parent, $name $(, $($field)*)?),
            Level::WARN  => tracing::warn_span!(parent: $parent, $name $(, $($field)*)?),
            Level::INFO  => tracing::info_span!(parent: $parent, $name $(, $($field)*)?),
            Level::DEBUG => tracing::debug_span!(parent: $parent, $name $(, $($field)*)?),
            Level::TRACE => tracing::trace_span!(parent: $parent, $name $(, $($field)*)?),
        }
    };
}

/// Create a span for the `dial` operation.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn dial_span(config: &TracingConfig, parent: &Span, candidates: usize) -> Span {
    dynamic_span!(
        config.dial_level,
        parent,
        "client.dial",
        candidates = candidates,
        peer.addr = tracing::field::Empty
    )
}

/// Create a span for one outbound message.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn send_span(
    config: &TracingConfig,
    parent: &Span,
    operation: u32,
    frame_bytes: usize,
) -> Span {
    dynamic_span!(
        config.send_level,
        parent,
        "client.send",
        operation = operation,
        frame.bytes = frame_bytes
    )
}

/// Create a span for teardown.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn close_span(config: &TracingConfig, parent: &Span, reason: CloseReason) -> Span {
    dynamic_span!(
        config.close_level,
        parent,
        "client.close",
        reason = reason.as_str(),
        result = tracing::field::Empty
    )
}

/// Create the span the reader loop runs in.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn reader_span(config: &TracingConfig, parent: &Span) -> Span {
    dynamic_span!(config.loop_level, parent, "client.reader")
}

/// Create the span the event loop runs in.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn event_loop_span(config: &TracingConfig, parent: &Span) -> Span {
    dynamic_span!(config.loop_level, parent, "client.event_loop")
}

/// Record elapsed time if timing was enabled for this operation.
///
/// The `start` parameter is `None` when timing is disabled. When `Some`, an
/// event is emitted with the `elapsed_us` field at `DEBUG` level.
pub(crate) fn emit_timing_event(start: Option<Instant>) {
    if let Some(start) = start {
        let elapsed_us = start.elapsed().as_micros();
        tracing::debug!(elapsed_us = elapsed_us, "operation.timing");
    }
}

/// Start a timer when `enabled`.
pub(crate) fn start_timer(enabled: bool) -> Option<Instant> { enabled.then(Instant::now) }
