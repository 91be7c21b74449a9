//! Converts the engine's push-style callback channel into two wait queues.
//!
//! The engine may call back from any thread at any time. Every signal for
//! the recording subsystem updates [`EngineState`] and the status reporter
//! immediately; `Start` and `Wrote` signals are additionally queued so that
//! the buffer controller can block until the engine confirms a transition.

use crate::{
    CoreResult, RecStatus, RecorderError, SessionId, StatusReporter,
    signals::{EngineState, OutputSignal, SignalKind, SignalQueue, Subsystem},
};

use std::{
    panic::Location,
    sync::{Arc, Mutex},
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// How long to wait for the engine to confirm a start or a written file.
pub const SIGNAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Signal queues plus the engine state derived from them.
pub struct SignalSynchronizer {
    state_tx: watch::Sender<EngineState>,
    session: Mutex<Option<SessionId>>,
    start_tx: mpsc::UnboundedSender<OutputSignal>,
    start_rx: AsyncMutex<mpsc::UnboundedReceiver<OutputSignal>>,
    wrote_tx: mpsc::UnboundedSender<OutputSignal>,
    wrote_rx: AsyncMutex<mpsc::UnboundedReceiver<OutputSignal>>,
    status: Arc<dyn StatusReporter>,
}

impl SignalSynchronizer {
    /// Create a synchronizer with no active session.
    pub fn new(status: Arc<dyn StatusReporter>) -> Self {
        let (state_tx, _) = watch::channel(EngineState::Offline);
        let (start_tx, start_rx) = mpsc::unbounded_channel();
        let (wrote_tx, wrote_rx) = mpsc::unbounded_channel();

        Self {
            state_tx,
            session: Mutex::new(None),
            start_tx,
            start_rx: AsyncMutex::new(start_rx),
            wrote_tx,
            wrote_rx: AsyncMutex::new(wrote_rx),
            status,
        }
    }

    /// Accept signals from `session` from now on. Signals tagged with any
    /// other session are dropped.
    pub fn begin_session(&self, session: SessionId) {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
        self.state_tx.send_replace(EngineState::Offline);
        debug!(session_id = %session, "Signal session started");
    }

    /// Stop accepting signals and forget any queued ones.
    pub fn end_session(&self) {
        let previous = self
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.clear();
        self.state_tx.send_replace(EngineState::Offline);
        if let Some(session) = previous {
            debug!(session_id = %session, "Signal session ended");
        }
    }

    /// Build the sink handed to the engine for `session`.
    pub fn sink(self: &Arc<Self>, session: SessionId) -> SignalSink {
        SignalSink {
            session,
            synchronizer: Arc::clone(self),
        }
    }

    /// Current engine state.
    pub fn state(&self) -> EngineState {
        *self.state_tx.borrow()
    }

    /// Watch engine state transitions.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state_tx.subscribe()
    }

    /// Process one signal from the engine callback.
    pub fn handle_signal(&self, session: SessionId, signal: OutputSignal) {
        let current = *self.session.lock().unwrap_or_else(|e| e.into_inner());
        if current != Some(session) {
            warn!(
                session_id = %session,
                kind = ?signal.kind,
                "Ignoring signal from stale engine session"
            );
            return;
        }

        debug!(kind = ?signal.kind, subsystem = ?signal.subsystem, code = signal.code, "Got signal");

        if signal.subsystem != Subsystem::Recording {
            debug!("No action needed on this signal");
            return;
        }

        if let Some(next) = EngineState::on_signal(signal.kind) {
            let previous = self.state_tx.send_replace(next);
            if !previous.can_transition_to(next) {
                warn!(from = ?previous, to = ?next, "Unexpected engine state transition");
            }

            let status = match next {
                EngineState::Starting | EngineState::Recording => RecStatus::ReadyToRecord,
                EngineState::Stopping | EngineState::Offline => RecStatus::WaitingForHost,
            };
            self.status.update(status);
            info!(state = ?next, "Engine state changed");
        }

        // Send only fails once the receiver is dropped, which happens with self.
        match signal.kind {
            SignalKind::Start => {
                let _ = self.start_tx.send(signal);
            }
            SignalKind::Wrote => {
                let _ = self.wrote_tx.send(signal);
            }
            _ => {}
        }
    }

    /// Wait for the next signal on `queue`, failing after `timeout`.
    ///
    /// Anything else already queued behind the received signal is stale and
    /// is discarded.
    #[instrument(skip(self))]
    pub async fn await_signal(
        &self,
        queue: SignalQueue,
        timeout: Duration,
    ) -> CoreResult<OutputSignal> {
        let location = ErrorLocation::from(Location::caller());
        let mut rx = self.receiver(queue).lock().await;

        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(signal)) => {
                let mut stale = 0usize;
                while rx.try_recv().is_ok() {
                    stale += 1;
                }
                debug!(%queue, stale, "Signal received from queue");
                Ok(signal)
            }
            Ok(None) => Err(RecorderError::Engine {
                reason: format!("{} signal channel closed", queue),
                location,
            }),
            Err(_) => Err(RecorderError::SignalTimeout { queue, location }),
        }
    }

    /// Drop everything queued on `queue`.
    pub async fn discard(&self, queue: SignalQueue) {
        let mut rx = self.receiver(queue).lock().await;
        while rx.try_recv().is_ok() {}
    }

    /// Empty both queues without waiting. A queue that is currently being
    /// awaited is left alone.
    pub fn clear(&self) {
        for queue in [SignalQueue::Start, SignalQueue::Wrote] {
            match self.receiver(queue).try_lock() {
                Ok(mut rx) => while rx.try_recv().is_ok() {},
                Err(_) => warn!(%queue, "Queue busy, not cleared"),
            }
        }
    }

    fn receiver(&self, queue: SignalQueue) -> &AsyncMutex<mpsc::UnboundedReceiver<OutputSignal>> {
        match queue {
            SignalQueue::Start => &self.start_rx,
            SignalQueue::Wrote => &self.wrote_rx,
        }
    }
}

/// Handle the engine uses to deliver signals for one session.
///
/// Cheap to clone and callable from any thread.
#[derive(Clone)]
pub struct SignalSink {
    session: SessionId,
    synchronizer: Arc<SignalSynchronizer>,
}

impl SignalSink {
    /// Deliver a signal.
    pub fn emit(&self, signal: OutputSignal) {
        self.synchronizer.handle_signal(self.session, signal);
    }

    /// Session this sink is bound to.
    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl std::fmt::Debug for SignalSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalSink")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
