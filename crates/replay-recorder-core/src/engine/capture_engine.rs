use crate::{
    CoreResult,
    engine::{
        AudioDevice, FaderId, InputId, InputSettings, OutputSource, RecordingSettings, SceneId,
        SceneItemId, SceneItemInfo, SessionId, VideoContext,
    },
    signals::SignalSink,
};

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

/// The capture/encoding engine the recorder drives.
///
/// Calls are synchronous and return once the engine has accepted the
/// request. State changes of the recording output are reported afterwards,
/// possibly from another thread, through the [`SignalSink`] handed to
/// [`create_recording_output`](CaptureEngine::create_recording_output).
pub trait CaptureEngine: Send {
    /// Bring up the engine process for `session`. Slow and blocking.
    fn initialize(&mut self, session: SessionId) -> CoreResult<()>;

    /// Remove the signal callback and disconnect from the engine process.
    fn disconnect(&mut self) -> CoreResult<()>;

    /// Set resolution, frame rate and pixel format.
    fn set_video_context(&mut self, context: &VideoContext) -> CoreResult<()>;

    /// Create the recording output and register `sink` for its signals.
    fn create_recording_output(
        &mut self,
        settings: &RecordingSettings,
        sink: SignalSink,
    ) -> CoreResult<()>;

    /// Destroy the recording output, if any.
    fn destroy_recording_output(&mut self);

    /// Whether a recording output currently exists.
    fn has_recording_output(&self) -> bool;

    /// Ask the recording output to start writing a new file.
    fn start_recording(&mut self) -> CoreResult<()>;

    /// Ask the recording output to finish the current file.
    fn stop_recording(&mut self) -> CoreResult<()>;

    /// Path of the most recently finished file.
    fn last_output_file(&self) -> Option<PathBuf>;

    /// Create an input source.
    fn create_input(&mut self, name: &str, settings: &InputSettings) -> CoreResult<InputId>;

    /// Release and remove an input source.
    fn release_input(&mut self, input: InputId);

    /// Current native width of an input, 0 while the engine has no frames.
    fn input_width(&self, input: InputId) -> u32;

    /// Downmix an audio input to mono.
    fn set_force_mono(&mut self, input: InputId, mono: bool) -> CoreResult<()>;

    /// Create an empty scene.
    fn create_scene(&mut self, name: &str) -> CoreResult<SceneId>;

    /// Place `input` in `scene`, optionally with explicit placement.
    fn add_scene_item(
        &mut self,
        scene: SceneId,
        input: InputId,
        info: Option<&SceneItemInfo>,
    ) -> CoreResult<SceneItemId>;

    /// Remove an item from its scene.
    fn remove_scene_item(&mut self, item: SceneItemId);

    /// Uniformly scale a scene item.
    fn set_scene_item_scale(&mut self, item: SceneItemId, scale: f64) -> CoreResult<()>;

    /// Bind (or clear, with `None`) an output channel.
    fn set_output_source(&mut self, channel: u32, source: Option<OutputSource>) -> CoreResult<()>;

    /// Create a gain control attached to `input` with multiplier `mul`.
    fn create_fader(&mut self, input: InputId, mul: f64) -> CoreResult<FaderId>;

    /// Detach and destroy a fader.
    fn destroy_fader(&mut self, fader: FaderId);

    /// Video encoder type ids available on this machine.
    fn encoder_types(&self) -> CoreResult<Vec<String>>;

    /// Capture devices known to the engine.
    fn input_audio_devices(&self) -> CoreResult<Vec<AudioDevice>>;

    /// Playback devices known to the engine.
    fn output_audio_devices(&self) -> CoreResult<Vec<AudioDevice>>;
}

/// Shared, lockable engine handle.
///
/// The lock is only ever held for the duration of synchronous engine calls,
/// never across an `.await`.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Mutex<Box<dyn CaptureEngine>>>,
}

impl EngineHandle {
    /// Wrap an engine implementation.
    pub fn new(engine: impl CaptureEngine + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(engine))),
        }
    }

    /// Lock the engine. A poisoned lock is recovered: engine state lives on
    /// the engine side, not in the guard.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn CaptureEngine>> {
        self.inner.lock().unwrap_or_else(|e| {
            tracing::error!("Engine lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }
}
