//! Engine session lifecycle: bring-up, pipeline construction and teardown.

use crate::{
    CoreResult, RecorderError, SessionId,
    buffer::prune_buffer_dir,
    config::RecorderConfig,
    engine::{
        EncoderSettings, EngineHandle, RateControl, RecordingSettings, VideoContext, VideoFormat,
    },
    signals::SignalSynchronizer,
    sources::SourceManager,
};

use std::{fs, panic::Location, path::Path, sync::Arc};

use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Encoder family that additionally needs a peak bitrate.
pub const AMF_ENCODER_ID: &str = "amd_amf_h264";

const SCENE_NAME: &str = "Replay Scene";

/// Where an engine session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// No engine process.
    Uninitialized,
    /// Engine process is up, no pipeline yet.
    Initialized,
    /// Recording output, scene and sources exist.
    Configured,
}

/// One engine session at a time, identified by a fresh [`SessionId`].
pub struct EngineLifecycle {
    engine: EngineHandle,
    synchronizer: Arc<SignalSynchronizer>,
    sources: SourceManager,
    phase: LifecyclePhase,
    session: Option<SessionId>,
    config: Option<RecorderConfig>,
}

impl EngineLifecycle {
    /// Lifecycle over `engine`, not yet initialized.
    pub fn new(engine: EngineHandle, synchronizer: Arc<SignalSynchronizer>) -> Self {
        Self {
            sources: SourceManager::new(engine.clone()),
            engine,
            synchronizer,
            phase: LifecyclePhase::Uninitialized,
            session: None,
            config: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Identity of the current session.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session
    }

    /// Configuration the pipeline was built from.
    pub fn config(&self) -> Option<&RecorderConfig> {
        self.config.as_ref()
    }

    /// Sources of the current session.
    pub fn sources(&self) -> &SourceManager {
        &self.sources
    }

    /// Mutable access to the sources of the current session.
    pub fn sources_mut(&mut self) -> &mut SourceManager {
        &mut self.sources
    }

    /// Bring up the engine process under a new session id. A no-op when
    /// already initialized.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::EngineInitFailed`] if the engine cannot start.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn initialize(&mut self) -> CoreResult<()> {
        if self.phase != LifecyclePhase::Uninitialized {
            warn!(phase = ?self.phase, "Engine already initialized");
            return Ok(());
        }

        let session = Uuid::new_v4();
        self.synchronizer.begin_session(session);

        if let Err(e) = self.engine.lock().initialize(session) {
            self.synchronizer.end_session();
            return Err(e);
        }

        self.session = Some(session);
        self.phase = LifecyclePhase::Initialized;
        info!(session_id = %session, "Engine initialized");
        Ok(())
    }

    /// Build the recording pipeline from `config`.
    ///
    /// Nothing is built unless the engine is initialized and `config`
    /// validates. A failure part way through tears the partial pipeline down
    /// again and leaves the session initialized.
    #[track_caller]
    #[instrument(skip(self, config))]
    pub fn configure(&mut self, config: &RecorderConfig) -> CoreResult<()> {
        let location = ErrorLocation::from(Location::caller());
        let session = match (self.phase, self.session) {
            (LifecyclePhase::Initialized, Some(session)) => session,
            (LifecyclePhase::Configured, _) => {
                return Err(RecorderError::Engine {
                    reason: "Engine already configured, shut down before reconfiguring".into(),
                    location,
                });
            }
            _ => return Err(RecorderError::NotInitialized { location }),
        };

        config.validate()?;
        prepare_buffer_dir(&config.storage.buffer_path, config.video.format.extension())?;

        if let Err(e) = self.build_pipeline(session, config) {
            error!(error = %e, "Pipeline construction failed, tearing down");
            self.teardown_pipeline();
            return Err(e);
        }

        self.config = Some(config.clone());
        self.phase = LifecyclePhase::Configured;
        info!(
            session_id = %session,
            resolution = %config.video.resolution,
            fps = config.video.fps,
            encoder = %config.video.encoder,
            "Engine configured"
        );
        Ok(())
    }

    #[track_caller]
    fn build_pipeline(&mut self, session: SessionId, config: &RecorderConfig) -> CoreResult<()> {
        let context = video_context(config)?;
        let settings = recording_settings(config);

        let scene = {
            let mut engine = self.engine.lock();
            engine.set_video_context(&context)?;
            engine.create_recording_output(&settings, self.synchronizer.sink(session))?;
            engine.create_scene(SCENE_NAME)?
        };

        self.sources.attach_scene(scene, context.output_width)?;
        self.sources.add_video_source(&config.video)?;
        self.sources.create_overlay_image_source(&config.overlay)?;
        self.sources.add_overlay_source(&config.overlay)?;
        Ok(())
    }

    fn teardown_pipeline(&mut self) {
        self.sources.release_all();
        self.engine.lock().destroy_recording_output();
    }

    /// Release everything and disconnect from the engine process.
    ///
    /// Safe in any phase. The lifecycle is always back to
    /// [`LifecyclePhase::Uninitialized`] afterwards; a disconnect failure is
    /// still returned.
    #[instrument(skip(self))]
    pub fn shutdown(&mut self) -> CoreResult<()> {
        if self.phase == LifecyclePhase::Uninitialized {
            debug!("Engine not initialized, nothing to shut down");
            return Ok(());
        }

        let session = self.session.take();
        self.teardown_pipeline();
        self.synchronizer.end_session();
        let disconnected = self.engine.lock().disconnect();

        self.phase = LifecyclePhase::Uninitialized;
        self.config = None;

        match &disconnected {
            Ok(()) => info!(session_id = ?session, "Engine shut down"),
            Err(e) => error!(session_id = ?session, error = %e, "Engine disconnect failed"),
        }
        disconnected
    }
}

/// Video pipeline parameters for `config`.
#[track_caller]
pub fn video_context(config: &RecorderConfig) -> CoreResult<VideoContext> {
    let resolution = config.resolution()?;
    Ok(VideoContext {
        fps_num: config.video.fps,
        fps_den: 1,
        base_width: resolution.width,
        base_height: resolution.height,
        output_width: resolution.width,
        output_height: resolution.height,
        output_format: VideoFormat::Nv12,
    })
}

/// Recording output parameters for `config`. Bitrates are configured in
/// Mbps and handed to the engine in kbps.
pub fn recording_settings(config: &RecorderConfig) -> RecordingSettings {
    let kbps = config.video.bitrate_mbps.saturating_mul(1000);
    let encoder_id = config.video.encoder.clone();
    let peak_bitrate = (encoder_id == AMF_ENCODER_ID).then_some(kbps);

    RecordingSettings {
        path: config.storage.buffer_path.clone(),
        format: config.video.format,
        overwrite: false,
        no_space: false,
        encoder: EncoderSettings {
            encoder_id,
            rate_control: RateControl::Vbr,
            bitrate: kbps,
            max_bitrate: kbps,
            peak_bitrate,
        },
    }
}

#[track_caller]
fn prepare_buffer_dir(dir: &Path, extension: &str) -> CoreResult<()> {
    if dir.exists() {
        let deleted = prune_buffer_dir(dir, extension, 0)?;
        debug!(dir = %dir.display(), deleted, "Buffer directory cleaned");
    } else {
        fs::create_dir_all(dir).map_err(|e| RecorderError::io(dir, e))?;
        debug!(dir = %dir.display(), "Buffer directory created");
    }
    Ok(())
}
