use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::ActivityError;

/// One progress signal from a running activity.
///
/// The orchestrator host drains these to detect stalled activities; the
/// pipeline emits one at every stage transition and every batch-loop element.
#[derive(Debug, Clone, Serialize)]
pub struct Heartbeat {
    pub activity: &'static str,
    pub stage: String,
    pub detail: Option<String>,
}

/// Side channel between the orchestrator host and a running activity:
/// heartbeats flow out, the cancellation flag flows in.
///
/// Cancellation is cooperative. Activities call [`ActivityContext::ensure_active`]
/// at each heartbeat opportunity and unwind when the flag is set; because all
/// durable writes are keyed and overwrite-safe, an abrupt cancellation
/// followed by a fresh retry is always correct.
#[derive(Clone)]
pub struct ActivityContext {
    heartbeat: mpsc::UnboundedSender<Heartbeat>,
    cancel: watch::Receiver<bool>,
}

impl ActivityContext {
    pub fn new(
        heartbeat: mpsc::UnboundedSender<Heartbeat>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self { heartbeat, cancel }
    }

    /// Context plus the host-side ends: a heartbeat drain and a cancel switch.
    pub fn channel() -> (
        Self,
        mpsc::UnboundedReceiver<Heartbeat>,
        watch::Sender<bool>,
    ) {
        let (heartbeat_tx, heartbeat_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (Self::new(heartbeat_tx, cancel_rx), heartbeat_rx, cancel_tx)
    }

    /// Context with no host listening. Heartbeats are dropped and
    /// cancellation never fires.
    pub fn detached() -> Self {
        // A dropped watch sender leaves the flag at its last value (false),
        // so the detached context can never observe a cancellation.
        let (ctx, _heartbeat_rx, _cancel_tx) = Self::channel();
        ctx
    }

    /// Emit a progress signal. A host that has gone away is not an error;
    /// the signal is simply dropped.
    pub fn heartbeat(&self, activity: &'static str, stage: &str, detail: Option<String>) {
        debug!(activity, stage, detail = detail.as_deref(), "Activity heartbeat");
        let _ = self.heartbeat.send(Heartbeat {
            activity,
            stage: stage.to_string(),
            detail,
        });
    }

    /// Whether the host has requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Checked at each heartbeat opportunity; fails the invocation with
    /// [`ActivityError::Cancelled`] once the host flips the flag.
    pub fn ensure_active(&self) -> Result<(), ActivityError> {
        if self.is_cancelled() {
            return Err(ActivityError::Cancelled);
        }
        Ok(())
    }
}
