//! In-process engine that behaves like the real one from the recorder's
//! point of view: it emits the same signal sequences, asynchronously, and
//! writes (empty) container files into the buffer directory.

use crate::{
    CoreResult, RecorderError,
    engine::{
        AudioDevice, CaptureEngine, FaderId, InputId, InputSettings, OutputSource,
        RecordingSettings, SceneId, SceneItemId, SceneItemInfo, SessionId, VideoContext,
    },
    signals::{OutputSignal, SignalKind, SignalSink},
};

use std::{
    collections::HashMap,
    panic::Location,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use error_location::ErrorLocation;
use tracing::{debug, info};

/// Default delay between a start/stop request and its confirmation.
pub const DEFAULT_SIMULATED_LATENCY: Duration = Duration::from_millis(250);

struct SimulatedOutput {
    settings: RecordingSettings,
    sink: SignalSink,
    recording: bool,
}

/// Engine stand-in used when no real capture backend is linked.
pub struct SimulatedEngine {
    latency: Duration,
    window_width: Arc<AtomicU32>,
    encoders: Vec<String>,
    input_devices: Vec<AudioDevice>,
    output_devices: Vec<AudioDevice>,
    session: Option<SessionId>,
    video: Option<VideoContext>,
    output: Option<SimulatedOutput>,
    last_file: Option<PathBuf>,
    inputs: HashMap<InputId, InputSettings>,
    next_id: u64,
}

impl SimulatedEngine {
    /// Engine confirming transitions after [`DEFAULT_SIMULATED_LATENCY`].
    pub fn new() -> Self {
        Self {
            latency: DEFAULT_SIMULATED_LATENCY,
            window_width: Arc::new(AtomicU32::new(0)),
            encoders: vec![
                "obs_x264".to_string(),
                "jim_nvenc".to_string(),
                "amd_amf_h264".to_string(),
            ],
            input_devices: vec![
                AudioDevice {
                    id: "default".to_string(),
                    description: "Default".to_string(),
                },
                AudioDevice {
                    id: "sim-mic-0".to_string(),
                    description: "Simulated Microphone".to_string(),
                },
            ],
            output_devices: vec![
                AudioDevice {
                    id: "default".to_string(),
                    description: "Default".to_string(),
                },
                AudioDevice {
                    id: "sim-speakers-0".to_string(),
                    description: "Simulated Speakers".to_string(),
                },
            ],
            session: None,
            video: None,
            output: None,
            last_file: None,
            inputs: HashMap::new(),
            next_id: 1,
        }
    }

    /// Change the confirmation delay. Zero delivers signals synchronously.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Shared width reported by window-capture inputs, for driving resizes.
    pub fn window_width(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.window_width)
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[track_caller]
    fn output_mut(&mut self) -> CoreResult<&mut SimulatedOutput> {
        self.output.as_mut().ok_or_else(|| RecorderError::Engine {
            reason: "No recording output".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn deliver(&self, sink: SignalSink, kinds: Vec<SignalKind>) {
        let latency = self.latency;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) if !latency.is_zero() => {
                handle.spawn(async move {
                    tokio::time::sleep(latency).await;
                    for kind in kinds {
                        sink.emit(OutputSignal::recording(kind));
                    }
                });
            }
            _ => {
                for kind in kinds {
                    sink.emit(OutputSignal::recording(kind));
                }
            }
        }
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureEngine for SimulatedEngine {
    #[track_caller]
    fn initialize(&mut self, session: SessionId) -> CoreResult<()> {
        if self.session.is_some() {
            return Err(RecorderError::EngineInitFailed {
                reason: "Engine process already hosted".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.session = Some(session);
        info!(session_id = %session, "Simulated engine hosted");
        Ok(())
    }

    fn disconnect(&mut self) -> CoreResult<()> {
        self.output = None;
        self.inputs.clear();
        self.video = None;
        if let Some(session) = self.session.take() {
            info!(session_id = %session, "Simulated engine disconnected");
        }
        Ok(())
    }

    fn set_video_context(&mut self, context: &VideoContext) -> CoreResult<()> {
        self.video = Some(context.clone());
        Ok(())
    }

    fn create_recording_output(
        &mut self,
        settings: &RecordingSettings,
        sink: SignalSink,
    ) -> CoreResult<()> {
        debug!(path = ?settings.path, encoder = %settings.encoder.encoder_id, "Recording output created");
        self.output = Some(SimulatedOutput {
            settings: settings.clone(),
            sink,
            recording: false,
        });
        Ok(())
    }

    fn destroy_recording_output(&mut self) {
        self.output = None;
    }

    fn has_recording_output(&self) -> bool {
        self.output.is_some()
    }

    #[track_caller]
    fn start_recording(&mut self) -> CoreResult<()> {
        let output = self.output_mut()?;
        if output.recording {
            return Err(RecorderError::engine("Output already recording"));
        }
        output.recording = true;
        let sink = output.sink.clone();

        sink.emit(OutputSignal::recording(SignalKind::Starting));
        self.deliver(sink, vec![SignalKind::Start]);
        Ok(())
    }

    #[track_caller]
    fn stop_recording(&mut self) -> CoreResult<()> {
        let output = self.output_mut()?;
        if !output.recording {
            return Err(RecorderError::engine("Output not recording"));
        }
        output.recording = false;

        let stamp = Utc::now().format("%Y-%m-%d %H-%M-%S%.3f").to_string();
        let stem = if output.settings.no_space {
            stamp.replace(' ', "_")
        } else {
            stamp
        };
        let extension = output.settings.format.extension();
        let mut path = output.settings.path.join(format!("{stem}.{extension}"));
        let mut n = 1;
        while !output.settings.overwrite && path.exists() {
            path = output
                .settings
                .path
                .join(format!("{stem} ({n}).{extension}"));
            n += 1;
        }

        std::fs::write(&path, b"").map_err(|e| RecorderError::io(&path, e))?;
        let sink = output.sink.clone();
        self.last_file = Some(path);

        sink.emit(OutputSignal::recording(SignalKind::Stopping));
        self.deliver(sink, vec![SignalKind::Stop, SignalKind::Wrote]);
        Ok(())
    }

    fn last_output_file(&self) -> Option<PathBuf> {
        self.last_file.clone()
    }

    fn create_input(&mut self, name: &str, settings: &InputSettings) -> CoreResult<InputId> {
        let id = InputId(self.next_id());
        debug!(name, kind = settings.kind(), ?id, "Input created");
        self.inputs.insert(id, settings.clone());
        Ok(id)
    }

    fn release_input(&mut self, input: InputId) {
        self.inputs.remove(&input);
    }

    fn input_width(&self, input: InputId) -> u32 {
        match self.inputs.get(&input) {
            Some(InputSettings::Window { .. }) => self.window_width.load(Ordering::Acquire),
            Some(InputSettings::Monitor { .. }) => {
                self.video.as_ref().map_or(0, |v| v.base_width)
            }
            _ => 0,
        }
    }

    fn set_force_mono(&mut self, _input: InputId, _mono: bool) -> CoreResult<()> {
        Ok(())
    }

    fn create_scene(&mut self, _name: &str) -> CoreResult<SceneId> {
        Ok(SceneId(self.next_id()))
    }

    fn add_scene_item(
        &mut self,
        _scene: SceneId,
        _input: InputId,
        _info: Option<&SceneItemInfo>,
    ) -> CoreResult<SceneItemId> {
        Ok(SceneItemId(self.next_id()))
    }

    fn remove_scene_item(&mut self, _item: SceneItemId) {}

    fn set_scene_item_scale(&mut self, item: SceneItemId, scale: f64) -> CoreResult<()> {
        debug!(?item, scale, "Scene item scaled");
        Ok(())
    }

    fn set_output_source(
        &mut self,
        _channel: u32,
        _source: Option<OutputSource>,
    ) -> CoreResult<()> {
        Ok(())
    }

    fn create_fader(&mut self, _input: InputId, _mul: f64) -> CoreResult<FaderId> {
        Ok(FaderId(self.next_id()))
    }

    fn destroy_fader(&mut self, _fader: FaderId) {}

    fn encoder_types(&self) -> CoreResult<Vec<String>> {
        Ok(self.encoders.clone())
    }

    fn input_audio_devices(&self) -> CoreResult<Vec<AudioDevice>> {
        Ok(self.input_devices.clone())
    }

    fn output_audio_devices(&self) -> CoreResult<Vec<AudioDevice>> {
        Ok(self.output_devices.clone())
    }
}
