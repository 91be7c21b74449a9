//! Activity recording orchestrator.
//!
//! The engine is always recording into the buffer directory once the host
//! application is up. Starting an activity only keeps the current buffer
//! segment from being restarted; stopping it waits out the overrun, stops
//! the engine, hands the finished segment to post-processing and resumes
//! buffering.

use crate::{
    CoreResult, RecStatus, RecorderError, SessionId, StatusReporter,
    buffer::BufferController,
    config::RecorderConfig,
    engine::{AudioDevice, CaptureEngine, EngineHandle},
    recorder::{
        Activity, EngineLifecycle, LifecyclePhase, OverrunGate, PostProcessor, VideoJob,
    },
    signals::{EngineState, SignalSynchronizer},
};

use std::{
    panic::Location,
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Device id the engine uses for "whatever the OS default is".
const DEFAULT_DEVICE_ID: &str = "default";

struct RecorderInner {
    engine: EngineHandle,
    synchronizer: Arc<SignalSynchronizer>,
    lifecycle: Mutex<EngineLifecycle>,
    buffer: BufferController,
    overrun: OverrunGate,
    recording: AtomicBool,
    status: Arc<dyn StatusReporter>,
    post_processor: Arc<dyn PostProcessor>,
}

/// Turns the rolling buffer into activity recordings.
///
/// Cheap to clone; every clone drives the same engine.
#[derive(Clone)]
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

impl Recorder {
    /// Recorder driving `engine`. Nothing is started until
    /// [`initialize`](Self::initialize) and [`configure`](Self::configure).
    pub fn new(
        engine: impl CaptureEngine + 'static,
        status: Arc<dyn StatusReporter>,
        post_processor: Arc<dyn PostProcessor>,
    ) -> Self {
        let engine = EngineHandle::new(engine);
        let synchronizer = Arc::new(SignalSynchronizer::new(Arc::clone(&status)));
        let buffer = BufferController::new(engine.clone(), Arc::clone(&synchronizer));
        Self::from_parts(engine, synchronizer, buffer, status, post_processor)
    }

    /// Recorder assembled from existing components, e.g. a buffer controller
    /// with custom timings.
    pub fn from_parts(
        engine: EngineHandle,
        synchronizer: Arc<SignalSynchronizer>,
        buffer: BufferController,
        status: Arc<dyn StatusReporter>,
        post_processor: Arc<dyn PostProcessor>,
    ) -> Self {
        let lifecycle = EngineLifecycle::new(engine.clone(), Arc::clone(&synchronizer));
        Self {
            inner: Arc::new(RecorderInner {
                engine,
                synchronizer,
                lifecycle: Mutex::new(lifecycle),
                buffer,
                overrun: OverrunGate::default(),
                recording: AtomicBool::new(false),
                status,
                post_processor,
            }),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, EngineLifecycle> {
        self.inner.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether an activity is being captured.
    pub fn is_recording(&self) -> bool {
        self.inner.recording.load(Ordering::SeqCst)
    }

    /// Engine recording state as reported by its signals.
    pub fn engine_state(&self) -> EngineState {
        self.inner.synchronizer.state()
    }

    /// Watch engine state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<EngineState> {
        self.inner.synchronizer.subscribe()
    }

    /// Lifecycle phase of the current engine session.
    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle().phase()
    }

    /// Identity of the current engine session.
    pub fn session_id(&self) -> Option<SessionId> {
        self.lifecycle().session_id()
    }

    /// When the current buffer segment started.
    pub fn buffer_session_start(&self) -> Option<DateTime<Utc>> {
        self.inner.buffer.session_start()
    }

    /// Whether the buffer restart timer is armed.
    pub fn has_restart_timer(&self) -> bool {
        self.inner.buffer.has_restart_timer()
    }

    /// Whether a `stop` is finishing an activity or a reconfigure is
    /// replacing the session.
    pub fn is_overrunning(&self) -> bool {
        self.inner.overrun.is_pending()
    }

    /// Bring up the engine. See [`EngineLifecycle::initialize`].
    #[track_caller]
    pub fn initialize(&self) -> CoreResult<()> {
        self.lifecycle().initialize()
    }

    /// Build the recording pipeline. See [`EngineLifecycle::configure`].
    #[track_caller]
    pub fn configure(&self, config: &RecorderConfig) -> CoreResult<()> {
        self.lifecycle().configure(config)?;
        self.inner
            .buffer
            .set_target(config.storage.buffer_path.clone(), config.video.format);
        Ok(())
    }

    /// Tear the engine session down. See [`EngineLifecycle::shutdown`].
    pub fn shutdown(&self) -> CoreResult<()> {
        self.inner.buffer.cancel_restart_timer();
        self.inner.recording.store(false, Ordering::SeqCst);
        self.lifecycle().shutdown()
    }

    /// Replace the engine session with one built from `config`.
    ///
    /// Waits for a finishing `stop` to queue its recording, then holds the
    /// overrun gate so no activity starts or stops until the new session is
    /// built. The buffer is stopped and audio detached first. Buffering is
    /// not resumed; the host presence collaborator does that.
    #[instrument(skip(self, config))]
    pub async fn reconfigure(&self, config: &RecorderConfig) -> CoreResult<()> {
        let location = ErrorLocation::from(Location::caller());
        config.validate()?;

        let _exclusive = loop {
            self.inner.overrun.wait().await;
            if let Some(token) = self.inner.overrun.begin() {
                break token;
            }
        };

        if self.is_recording() {
            return Err(RecorderError::Engine {
                reason: "Cannot reconfigure while an activity is recording".into(),
                location,
            });
        }

        if self.phase() == LifecyclePhase::Configured {
            if let Err(e) = self.inner.buffer.stop_buffer().await {
                warn!(error = %e, "Buffer did not stop cleanly before reconfigure");
            }
            self.remove_audio_sources();
        }

        // A failed disconnect still leaves the lifecycle uninitialized.
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Engine shutdown failed during reconfigure");
        }
        self.initialize()?;
        self.configure(config)?;
        info!(session_id = ?self.session_id(), "Engine reconfigured");
        Ok(())
    }

    /// Attach the configured audio devices.
    #[track_caller]
    pub fn add_audio_sources(&self) -> CoreResult<()> {
        let location = ErrorLocation::from(Location::caller());
        let mut lifecycle = self.lifecycle();
        let Some(audio) = lifecycle.config().map(|config| config.audio.clone()) else {
            return Err(RecorderError::NotConfigured { location });
        };
        lifecycle.sources_mut().add_audio_sources(&audio)
    }

    /// Detach every audio device.
    pub fn remove_audio_sources(&self) {
        self.lifecycle().sources_mut().remove_audio_sources();
    }

    /// Number of attached capture and playback devices.
    pub fn attached_audio_counts(&self) -> (usize, usize) {
        let lifecycle = self.lifecycle();
        let sources = lifecycle.sources();
        (sources.attached_inputs().len(), sources.attached_outputs().len())
    }

    /// Start the rolling buffer.
    ///
    /// # Errors
    ///
    /// Fails when the engine is not initialized, or does not confirm the
    /// start in time.
    #[instrument(skip(self))]
    pub async fn start_buffer(&self) -> CoreResult<()> {
        let location = ErrorLocation::from(Location::caller());
        if self.phase() == LifecyclePhase::Uninitialized {
            return Err(RecorderError::NotInitialized { location });
        }
        self.inner.buffer.start_buffer().await
    }

    /// Stop the rolling buffer and delete its files.
    #[instrument(skip(self))]
    pub async fn stop_buffer(&self) -> CoreResult<()> {
        self.inner.buffer.stop_buffer().await
    }

    /// Begin capturing `activity` from the running buffer.
    ///
    /// Waits for an overrunning `stop` to finish first. Returns whether the
    /// activity was started: it is not when one is already recording or the
    /// buffer is not rolling, and the detector is expected to retry.
    #[instrument(skip(self, activity), fields(start = %activity.start_date()))]
    pub async fn start(&self, activity: &dyn Activity) -> bool {
        if self.inner.overrun.is_pending() {
            debug!("Waiting for overrun of previous activity");
        }
        self.inner.overrun.wait().await;

        let _op = self.inner.buffer.lock_operations().await;

        if self.is_recording() {
            info!("Already recording an activity, start ignored");
            return false;
        }

        let state = self.engine_state();
        if state != EngineState::Recording {
            info!(?state, "Buffer not rolling, start ignored");
            return false;
        }

        self.inner.buffer.cancel_restart_timer();
        self.inner.recording.store(true, Ordering::SeqCst);
        self.inner.status.update(RecStatus::Recording);
        info!("Activity recording started");
        true
    }

    /// Finish capturing `activity`.
    ///
    /// Waits `activity.overrun()`, stops the engine and, unless the host
    /// application closed, resumes buffering before any queued `start` runs.
    /// The finished file is queued for post-processing when the activity can
    /// describe itself; otherwise it is discarded.
    ///
    /// # Errors
    ///
    /// Engine failures, e.g. a signal timeout, are returned once the overrun
    /// has been released and the recording flag cleared.
    ///
    /// The queued buffer file stays on disk until the buffer is next stopped,
    /// restarted or reconfigured.
    #[instrument(skip(self, activity))]
    pub async fn stop(&self, activity: &dyn Activity, closed_app: bool) -> CoreResult<()> {
        if !self.is_recording() {
            debug!("Not recording, stop ignored");
            return Ok(());
        }
        if !self.inner.engine.lock().has_recording_output() {
            warn!("No recording output, stop ignored");
            return Ok(());
        }
        let overrun = loop {
            if let Some(token) = self.inner.overrun.begin() {
                break token;
            }
            debug!("Waiting for pending overrun");
            self.inner.overrun.wait().await;
        };
        // A stop that finished while this one waited owns the activity.
        if !self.is_recording() {
            debug!("Activity already stopped, stop ignored");
            return Ok(());
        }

        let delay = activity.overrun();
        info!(overrun_secs = delay.as_secs_f64(), "Stopping activity after overrun");
        tokio::time::sleep(delay).await;

        if !self.inner.recording.swap(false, Ordering::SeqCst) {
            info!("Activity was force stopped during overrun");
            overrun.resolve();
            return Ok(());
        }

        // The overrun stays open until the job is queued so a reconfigure
        // cannot clear the buffer directory under it.
        let (file, start_offset_secs) = self.finish_segment(activity, closed_app).await?;

        let metadata = match activity.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(error = %e, "No metadata for activity, discarding recording");
                return Ok(());
            }
        };

        let Some(buffer_file) = file else {
            let e = RecorderError::MissingOutputFile {
                location: ErrorLocation::from(Location::caller()),
            };
            error!(error = %e, "Activity has metadata but no recording");
            return Ok(());
        };

        let job = VideoJob {
            buffer_file,
            metadata,
            file_name: activity.file_name(),
            start_offset_secs,
        };
        info!(
            file = %job.buffer_file.display(),
            offset_secs = job.start_offset_secs,
            category = %job.metadata.category,
            "Queueing recording for post-processing"
        );
        self.inner.post_processor.queue_video(job);
        overrun.resolve();
        Ok(())
    }

    async fn finish_segment(
        &self,
        activity: &dyn Activity,
        closed_app: bool,
    ) -> CoreResult<(Option<PathBuf>, f64)> {
        self.inner.buffer.stop_engine().await?;

        let file = self.inner.engine.lock().last_output_file();
        let start_offset_secs = self
            .buffer_session_start()
            .map(|buffer_start| {
                (activity.start_date() - buffer_start).num_milliseconds() as f64 / 1000.0
            })
            .unwrap_or(0.0);

        if !closed_app {
            self.inner.buffer.start_buffer().await?;
        }

        Ok((file, start_offset_secs))
    }

    /// Abandon the current activity: stop the engine, throw the segment
    /// away and resume buffering.
    #[instrument(skip(self))]
    pub async fn force_stop(&self) -> CoreResult<()> {
        if !self.inner.recording.swap(false, Ordering::SeqCst) {
            debug!("Not recording, force stop ignored");
            return Ok(());
        }

        info!("Force stopping activity");
        self.inner.buffer.stop_engine().await?;
        self.inner.buffer.start_buffer().await
    }

    /// Video encoders the engine offers.
    #[track_caller]
    pub fn available_encoders(&self) -> CoreResult<Vec<String>> {
        self.require_initialized()?;
        self.inner.engine.lock().encoder_types()
    }

    /// Capture devices, without the OS default placeholder.
    #[track_caller]
    pub fn input_audio_devices(&self) -> CoreResult<Vec<AudioDevice>> {
        self.require_initialized()?;
        let devices = self.inner.engine.lock().input_audio_devices()?;
        Ok(without_default(devices))
    }

    /// Playback devices, without the OS default placeholder.
    #[track_caller]
    pub fn output_audio_devices(&self) -> CoreResult<Vec<AudioDevice>> {
        self.require_initialized()?;
        let devices = self.inner.engine.lock().output_audio_devices()?;
        Ok(without_default(devices))
    }

    #[track_caller]
    fn require_initialized(&self) -> CoreResult<()> {
        if self.phase() == LifecyclePhase::Uninitialized {
            return Err(RecorderError::NotInitialized {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }
}

fn without_default(devices: Vec<AudioDevice>) -> Vec<AudioDevice> {
    devices
        .into_iter()
        .filter(|device| device.id != DEFAULT_DEVICE_ID)
        .collect()
}
