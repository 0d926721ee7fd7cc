//! Reader loop: moves decoded messages from the transport onto the queue.
//!
//! The queue push is the only place the loop waits on anything but the
//! transport, so a slow event loop slows reading down instead of losing
//! messages.

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::{close::CloseReason, runtime::LoopContext};
use crate::{
    metrics::{self, Direction, ErrorKind},
    proto::{self, Message},
    transport::Frame,
};

pub(crate) async fn run(ctx: LoopContext, queue: mpsc::Sender<Message>) {
    let shutdown = ctx.lifecycle.shutdown().clone();
    debug!("reader loop started");

    'read: loop {
        let received = tokio::select! {
            biased;

            () = shutdown.cancelled() => break,
            received = ctx.transport.recv() => received,
        };

        match received {
            Err(err) => {
                if !ctx.lifecycle.is_closed() {
                    error!(error = %err, "reading from connection failed");
                    metrics::inc_errors(ErrorKind::Read);
                    ctx.client
                        .spawn_close(&ctx.lifecycle, CloseReason::ReadingConnError);
                }
                break;
            }
            Ok(Frame::Close) => {
                debug!("peer sent close frame");
                if !ctx.lifecycle.is_closed() {
                    ctx.client
                        .spawn_close(&ctx.lifecycle, CloseReason::ReceivedShutdownMessage);
                }
                break;
            }
            Ok(Frame::Ping(_)) => debug!("received ping"),
            Ok(Frame::Pong(_)) => debug!("received pong"),
            Ok(Frame::Data(data)) => {
                metrics::inc_frames(Direction::Inbound);
                let messages = match proto::unpack(data) {
                    Ok(messages) => messages,
                    Err(err) => {
                        warn!(error = %err, "dropping undecodable frame");
                        metrics::inc_errors(ErrorKind::Decode);
                        continue;
                    }
                };
                for message in messages {
                    tokio::select! {
                        biased;

                        () = shutdown.cancelled() => break 'read,
                        sent = queue.send(message) => {
                            if sent.is_err() {
                                debug!("event loop gone; stopping reader");
                                break 'read;
                            }
                        }
                    }
                }
            }
        }
    }

    debug!("reader loop exited");
}
