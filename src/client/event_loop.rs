//! Event loop: heartbeats, the authentication deadline and dispatch.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use tokio::{
    sync::mpsc,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, trace, warn};

use super::{close::CloseReason, runtime::LoopContext};
use crate::{
    metrics::{self, DispatchOutcome},
    proto::Message,
};

pub(crate) async fn run(ctx: LoopContext, mut queue: mpsc::Receiver<Message>) {
    let shutdown = ctx.lifecycle.shutdown().clone();
    let config = *ctx.client.config();

    let auth_deadline = time::sleep(config.auth_timeout);
    tokio::pin!(auth_deadline);
    let mut auth_pending = true;

    let mut heartbeat = time::interval_at(
        Instant::now() + config.heartbeat_interval,
        config.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!("event loop started");
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = &mut auth_deadline, if auth_pending => {
                auth_pending = false;
                if !ctx.client.is_authed() {
                    error!(timeout = ?config.auth_timeout, "authentication timed out");
                    ctx.client.spawn_close(&ctx.lifecycle, CloseReason::AuthFailed);
                    break;
                }
            }
            _ = heartbeat.tick() => {
                // A stalled write must not keep teardown waiting on this loop.
                let beat = Message::heartbeat();
                tokio::select! {
                    biased;

                    () = shutdown.cancelled() => break,
                    sent = ctx.client.send_on(ctx.transport.as_ref(), &beat) => match sent {
                        Ok(()) => trace!("heartbeat sent"),
                        Err(err) => warn!(error = %err, "sending heartbeat failed"),
                    },
                }
            }
            received = queue.recv() => {
                let Some(message) = received else { break };
                dispatch(&ctx, &message);
            }
        }
    }
    debug!("event loop exited");
}

fn dispatch(ctx: &LoopContext, message: &Message) {
    let operation = message.operation();
    let Some(handler) = ctx.client.dispatch().get(operation) else {
        trace!(operation, "no handler registered; dropping message");
        metrics::inc_dispatched(DispatchOutcome::Unrouted);
        return;
    };
    match panic::catch_unwind(AssertUnwindSafe(|| handler(message))) {
        Ok(Ok(())) => metrics::inc_dispatched(DispatchOutcome::Handled),
        Ok(Err(err)) => {
            warn!(operation, error = %err, "handler failed");
            metrics::inc_dispatched(DispatchOutcome::Failed);
        }
        Err(payload) => {
            error!(operation, panic = panic_message(payload.as_ref()), "handler panicked");
            metrics::inc_dispatched(DispatchOutcome::Failed);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else {
        "non-string panic payload"
    }
}
