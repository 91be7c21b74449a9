//! Rolling buffer recording.
//!
//! The engine records continuously into the buffer directory. Every
//! [`RESTART_INTERVAL`] the recording is stopped and started again so no
//! single buffer file grows without bound, and older files are pruned.
//!
//! Engine start/stop pairs from the timer, the orchestrator and the app all
//! go through one async operation lock, so a stop can never follow a stop
//! without a start in between.

use crate::{
    CoreResult, RecorderError,
    buffer::prune_buffer_dir,
    engine::{EngineHandle, RecordingFormat},
    signals::{EngineState, SIGNAL_TIMEOUT, SignalQueue, SignalSynchronizer},
};

use std::{
    panic::Location,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// How long one buffer segment runs before it is restarted.
pub const RESTART_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Files kept in the buffer directory after a restart. The newest one may
/// still be referenced by an activity through its start offset.
const RETAIN_ON_RESTART: usize = 1;

#[derive(Debug, Default)]
struct BufferSession {
    started_at: Option<DateTime<Utc>>,
    restart_timer: Option<CancellationToken>,
    dir: Option<PathBuf>,
    format: RecordingFormat,
}

struct BufferInner {
    engine: EngineHandle,
    synchronizer: Arc<SignalSynchronizer>,
    op_lock: AsyncMutex<()>,
    session: Mutex<BufferSession>,
    restart_interval: Duration,
    signal_timeout: Duration,
}

/// Starts, stops and periodically restarts the buffer recording.
#[derive(Clone)]
pub struct BufferController {
    inner: Arc<BufferInner>,
}

impl BufferController {
    /// Controller using the default restart interval and signal timeout.
    pub fn new(engine: EngineHandle, synchronizer: Arc<SignalSynchronizer>) -> Self {
        Self::with_timings(engine, synchronizer, RESTART_INTERVAL, SIGNAL_TIMEOUT)
    }

    /// Controller with explicit timings.
    pub fn with_timings(
        engine: EngineHandle,
        synchronizer: Arc<SignalSynchronizer>,
        restart_interval: Duration,
        signal_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                engine,
                synchronizer,
                op_lock: AsyncMutex::new(()),
                session: Mutex::new(BufferSession::default()),
                restart_interval,
                signal_timeout,
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, BufferSession> {
        self.inner.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Directory and container the engine records the buffer into.
    pub fn set_target(&self, dir: PathBuf, format: RecordingFormat) {
        let mut session = self.session();
        session.dir = Some(dir);
        session.format = format;
    }

    /// When the current buffer segment started.
    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session().started_at
    }

    /// Whether a restart timer is currently armed.
    pub fn has_restart_timer(&self) -> bool {
        self.session().restart_timer.is_some()
    }

    /// Hold the operation lock, e.g. to inspect engine state without racing
    /// a timer-driven restart.
    pub async fn lock_operations(&self) -> AsyncMutexGuard<'_, ()> {
        self.inner.op_lock.lock().await
    }

    /// Start buffering and arm the restart timer.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::NotConfigured`] without a recording output,
    /// or [`RecorderError::SignalTimeout`] if the engine never confirms.
    #[instrument(skip(self))]
    pub async fn start_buffer(&self) -> CoreResult<()> {
        let location = ErrorLocation::from(Location::caller());
        if !self.inner.engine.lock().has_recording_output() {
            return Err(RecorderError::NotConfigured { location });
        }

        {
            let _op = self.inner.op_lock.lock().await;
            self.start_engine_locked().await?;
            self.session().started_at = Some(Utc::now());
        }

        self.arm_restart_timer();
        info!("Buffer started");
        Ok(())
    }

    /// Stop buffering and delete every buffer file.
    #[instrument(skip(self))]
    pub async fn stop_buffer(&self) -> CoreResult<()> {
        self.cancel_restart_timer();

        {
            let _op = self.inner.op_lock.lock().await;
            self.stop_engine_locked().await?;
            self.session().started_at = None;
        }

        self.prune(0)?;
        info!("Buffer stopped");
        Ok(())
    }

    /// Stop and immediately start a new buffer segment, keeping only the
    /// newest finished file.
    #[instrument(skip(self))]
    pub async fn restart_buffer(&self) -> CoreResult<()> {
        let _op = self.inner.op_lock.lock().await;
        self.restart_locked().await
    }

    async fn restart_locked(&self) -> CoreResult<()> {
        self.stop_engine_locked().await?;
        self.start_engine_locked().await?;
        self.session().started_at = Some(Utc::now());
        self.prune(RETAIN_ON_RESTART)?;
        info!("Buffer restarted");
        Ok(())
    }

    /// Disarm the restart timer, keeping the current segment running.
    pub fn cancel_restart_timer(&self) {
        if let Some(token) = self.session().restart_timer.take() {
            token.cancel();
            debug!("Restart timer cancelled");
        }
    }

    /// Stop the engine recording under the operation lock.
    pub async fn stop_engine(&self) -> CoreResult<()> {
        let _op = self.inner.op_lock.lock().await;
        self.stop_engine_locked().await
    }

    /// Start the engine recording under the operation lock.
    pub async fn start_engine(&self) -> CoreResult<()> {
        let _op = self.inner.op_lock.lock().await;
        self.start_engine_locked().await
    }

    async fn start_engine_locked(&self) -> CoreResult<()> {
        let state = self.inner.synchronizer.state();
        if state != EngineState::Offline {
            warn!(?state, "Engine start requested while not offline, skipped");
            return Ok(());
        }

        self.inner.synchronizer.discard(SignalQueue::Start).await;
        self.inner.engine.lock().start_recording()?;
        self.inner
            .synchronizer
            .await_signal(SignalQueue::Start, self.inner.signal_timeout)
            .await?;
        debug!("Engine recording confirmed");
        Ok(())
    }

    async fn stop_engine_locked(&self) -> CoreResult<()> {
        let state = self.inner.synchronizer.state();
        if state != EngineState::Recording {
            warn!(?state, "Engine stop requested while not recording, skipped");
            return Ok(());
        }

        self.inner.synchronizer.discard(SignalQueue::Wrote).await;
        self.inner.engine.lock().stop_recording()?;
        self.inner
            .synchronizer
            .await_signal(SignalQueue::Wrote, self.inner.signal_timeout)
            .await?;
        debug!("Engine file written");
        Ok(())
    }

    fn arm_restart_timer(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = self.session().restart_timer.replace(token.clone()) {
            previous.cancel();
        }

        let controller = self.clone();
        let interval = self.inner.restart_interval;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = controller.timer_restart(&token).await {
                            error!(error = %e, "Scheduled buffer restart failed");
                        }
                    }
                }
            }
            debug!("Restart timer task finished");
        });

        debug!(interval_secs = interval.as_secs(), "Restart timer armed");
    }

    async fn timer_restart(&self, token: &CancellationToken) -> CoreResult<()> {
        let _op = self.inner.op_lock.lock().await;
        // Cancelled while waiting for the lock, e.g. an activity started.
        if token.is_cancelled() {
            return Ok(());
        }
        self.restart_locked().await
    }

    #[track_caller]
    fn prune(&self, retain: usize) -> CoreResult<()> {
        let (dir, format) = {
            let session = self.session();
            (session.dir.clone(), session.format)
        };
        match dir {
            Some(dir) => prune_buffer_dir(&dir, format.extension(), retain).map(|_| ()),
            None => Ok(()),
        }
    }
}
