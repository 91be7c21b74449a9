use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;

/// Single-shot handoff between a `stop` that is overrunning and any `start`
/// that arrives meanwhile. At most one overrun is pending at a time.
///
/// Reconfiguration holds the gate too, which keeps activities out while the
/// engine session is replaced.
#[derive(Debug, Default)]
pub struct OverrunGate {
    pending: Mutex<Option<watch::Receiver<bool>>>,
}

/// Completion handle held by the overrunning `stop`. Resolving it, or
/// dropping it, clears the overrun and releases every waiter.
#[derive(Debug)]
pub struct OverrunToken<'a> {
    gate: &'a OverrunGate,
    done: watch::Sender<bool>,
}

impl OverrunGate {
    fn pending(&self) -> MutexGuard<'_, Option<watch::Receiver<bool>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a new overrun. Returns `None` if one is already pending.
    pub fn begin(&self) -> Option<OverrunToken<'_>> {
        let mut pending = self.pending();
        if pending.is_some() {
            return None;
        }

        let (done, rx) = watch::channel(false);
        *pending = Some(rx);
        Some(OverrunToken { gate: self, done })
    }

    /// Whether an overrun is in progress.
    pub fn is_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// Wait until the pending overrun, if any, has been resolved.
    pub async fn wait(&self) {
        let done = self.pending().clone();
        if let Some(mut done) = done {
            // A dropped sender also means the overrun is over.
            let _ = done.wait_for(|finished| *finished).await;
        }
    }
}

impl OverrunToken<'_> {
    /// Clear the overrun and wake every waiter.
    pub fn resolve(self) {
        drop(self);
    }
}

impl Drop for OverrunToken<'_> {
    fn drop(&mut self) {
        *self.gate.pending() = None;
        self.done.send_replace(true);
    }
}
