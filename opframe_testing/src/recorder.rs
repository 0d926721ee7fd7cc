//! Records `on_close` invocations.

use std::sync::{Arc, Mutex};

use opframe::client::{Client, CloseReason};
use rstest::fixture;
use tokio::sync::Notify;

/// Collects every reason passed to an `on_close` callback.
#[derive(Clone, Debug, Default)]
pub struct CloseRecorder {
    reasons: Arc<Mutex<Vec<CloseReason>>>,
    notify: Arc<Notify>,
}

impl CloseRecorder {
    /// Callback to install with `ClientBuilder::on_close`.
    #[must_use]
    pub fn handler(&self) -> impl Fn(&Client, CloseReason) + Send + Sync + 'static {
        let recorder = self.clone();
        move |_: &Client, reason: CloseReason| {
            recorder.reasons.lock().expect("recorder lock").push(reason);
            recorder.notify.notify_waiters();
        }
    }

    /// Reasons recorded so far, in order.
    #[must_use]
    pub fn reasons(&self) -> Vec<CloseReason> { self.reasons.lock().expect("recorder lock").clone() }

    /// Wait until at least `count` closes were recorded.
    pub async fn wait_for(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.reasons.lock().expect("recorder lock").len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn close_recorder() -> CloseRecorder { CloseRecorder::default() }
