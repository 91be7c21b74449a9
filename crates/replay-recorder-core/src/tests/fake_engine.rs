//! Scripted engine for tests: records every call and emits signals either
//! immediately (auto-confirm) or when a test asks for them.

use crate::{
    CoreResult, RecStatus, RecorderError, StatusReporter,
    engine::{
        AudioDevice, CaptureEngine, FaderId, InputId, InputSettings, OutputSource,
        RecordingSettings, SceneId, SceneItemId, SceneItemInfo, SessionId, VideoContext,
    },
    recorder::{Activity, Metadata, MetadataError, PostProcessor, VideoJob},
    signals::{OutputSignal, SignalKind, SignalSink},
};

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Initialize,
    Disconnect,
    SetVideoContext(VideoContext),
    CreateOutput(RecordingSettings),
    DestroyOutput,
    StartRecording,
    StopRecording,
    CreateInput(InputSettings),
    ReleaseInput(InputId),
    SetForceMono(InputId),
    CreateScene,
    AddSceneItem(InputId, Option<SceneItemInfo>),
    RemoveSceneItem(SceneItemId),
    SetScale(SceneItemId, f64),
    SetOutputSource(u32, Option<OutputSource>),
    CreateFader(InputId, f64),
    DestroyFader(FaderId),
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<EngineCall>,
    sink: Option<SignalSink>,
    output: Option<RecordingSettings>,
    auto_confirm: bool,
    fail_initialize: bool,
    widths: HashMap<InputId, u32>,
    inputs: Vec<(InputId, InputSettings)>,
    last_file: Option<PathBuf>,
    segments: u32,
    next_id: u64,
}

/// Test-side view of a [`FakeEngine`].
#[derive(Clone, Default)]
pub struct FakeProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl FakeProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| pred(call)).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn set_auto_confirm(&self, auto_confirm: bool) {
        self.lock().auto_confirm = auto_confirm;
    }

    pub fn fail_initialize(&self) {
        self.lock().fail_initialize = true;
    }

    pub fn set_width(&self, input: InputId, width: u32) {
        self.lock().widths.insert(input, width);
    }

    /// Inputs created with settings matching `pred`, in creation order.
    pub fn inputs_where(&self, pred: impl Fn(&InputSettings) -> bool) -> Vec<InputId> {
        self.lock()
            .inputs
            .iter()
            .filter(|(_, settings)| pred(settings))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn sink(&self) -> Option<SignalSink> {
        self.lock().sink.clone()
    }

    /// Deliver signals through the registered sink.
    pub fn emit(&self, kinds: &[SignalKind]) {
        if let Some(sink) = self.sink() {
            for kind in kinds {
                sink.emit(OutputSignal::recording(*kind));
            }
        }
    }
}

/// Engine whose calls go to a [`FakeProbe`].
pub struct FakeEngine {
    probe: FakeProbe,
}

impl FakeEngine {
    /// Engine that confirms every start and stop immediately.
    pub fn new() -> (Self, FakeProbe) {
        let probe = FakeProbe::default();
        probe.set_auto_confirm(true);
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }

    fn record(&self, call: EngineCall) {
        self.probe.lock().calls.push(call);
    }

    fn next_id(&self) -> u64 {
        let mut state = self.probe.lock();
        state.next_id += 1;
        state.next_id
    }
}

impl CaptureEngine for FakeEngine {
    fn initialize(&mut self, _session: SessionId) -> CoreResult<()> {
        self.record(EngineCall::Initialize);
        if self.probe.lock().fail_initialize {
            return Err(RecorderError::EngineInitFailed {
                reason: "scripted failure".to_string(),
                location: error_location::ErrorLocation::from(std::panic::Location::caller()),
            });
        }
        Ok(())
    }

    fn disconnect(&mut self) -> CoreResult<()> {
        self.record(EngineCall::Disconnect);
        let mut state = self.probe.lock();
        state.sink = None;
        state.output = None;
        Ok(())
    }

    fn set_video_context(&mut self, context: &VideoContext) -> CoreResult<()> {
        self.record(EngineCall::SetVideoContext(context.clone()));
        Ok(())
    }

    fn create_recording_output(
        &mut self,
        settings: &RecordingSettings,
        sink: SignalSink,
    ) -> CoreResult<()> {
        self.record(EngineCall::CreateOutput(settings.clone()));
        let mut state = self.probe.lock();
        state.output = Some(settings.clone());
        state.sink = Some(sink);
        Ok(())
    }

    fn destroy_recording_output(&mut self) {
        self.record(EngineCall::DestroyOutput);
        self.probe.lock().output = None;
    }

    fn has_recording_output(&self) -> bool {
        self.probe.lock().output.is_some()
    }

    fn start_recording(&mut self) -> CoreResult<()> {
        self.record(EngineCall::StartRecording);
        if self.probe.lock().auto_confirm {
            self.probe.emit(&[SignalKind::Starting, SignalKind::Start]);
        }
        Ok(())
    }

    fn stop_recording(&mut self) -> CoreResult<()> {
        self.record(EngineCall::StopRecording);

        let auto_confirm = {
            let mut state = self.probe.lock();
            state.segments += 1;
            let segment = state.segments;
            let file = state.output.as_ref().map(|settings| {
                settings.path.join(format!(
                    "segment-{:04}.{}",
                    segment,
                    settings.format.extension()
                ))
            });
            if let Some(file) = &file {
                // Directory may be absent in tests that never configured one.
                let _ = std::fs::write(file, b"");
            }
            state.last_file = file;
            state.auto_confirm
        };

        if auto_confirm {
            self.probe
                .emit(&[SignalKind::Stopping, SignalKind::Stop, SignalKind::Wrote]);
        }
        Ok(())
    }

    fn last_output_file(&self) -> Option<PathBuf> {
        self.probe.lock().last_file.clone()
    }

    fn create_input(&mut self, _name: &str, settings: &InputSettings) -> CoreResult<InputId> {
        self.record(EngineCall::CreateInput(settings.clone()));
        let id = InputId(self.next_id());
        self.probe.lock().inputs.push((id, settings.clone()));
        Ok(id)
    }

    fn release_input(&mut self, input: InputId) {
        self.record(EngineCall::ReleaseInput(input));
    }

    fn input_width(&self, input: InputId) -> u32 {
        self.probe.lock().widths.get(&input).copied().unwrap_or(0)
    }

    fn set_force_mono(&mut self, input: InputId, _mono: bool) -> CoreResult<()> {
        self.record(EngineCall::SetForceMono(input));
        Ok(())
    }

    fn create_scene(&mut self, _name: &str) -> CoreResult<SceneId> {
        self.record(EngineCall::CreateScene);
        Ok(SceneId(self.next_id()))
    }

    fn add_scene_item(
        &mut self,
        _scene: SceneId,
        input: InputId,
        info: Option<&SceneItemInfo>,
    ) -> CoreResult<SceneItemId> {
        self.record(EngineCall::AddSceneItem(input, info.cloned()));
        Ok(SceneItemId(self.next_id()))
    }

    fn remove_scene_item(&mut self, item: SceneItemId) {
        self.record(EngineCall::RemoveSceneItem(item));
    }

    fn set_scene_item_scale(&mut self, item: SceneItemId, scale: f64) -> CoreResult<()> {
        self.record(EngineCall::SetScale(item, scale));
        Ok(())
    }

    fn set_output_source(&mut self, channel: u32, source: Option<OutputSource>) -> CoreResult<()> {
        self.record(EngineCall::SetOutputSource(channel, source));
        Ok(())
    }

    fn create_fader(&mut self, input: InputId, mul: f64) -> CoreResult<FaderId> {
        self.record(EngineCall::CreateFader(input, mul));
        Ok(FaderId(self.next_id()))
    }

    fn destroy_fader(&mut self, fader: FaderId) {
        self.record(EngineCall::DestroyFader(fader));
    }

    fn encoder_types(&self) -> CoreResult<Vec<String>> {
        Ok(vec!["obs_x264".to_string(), "amd_amf_h264".to_string()])
    }

    fn input_audio_devices(&self) -> CoreResult<Vec<AudioDevice>> {
        Ok(vec![
            AudioDevice {
                id: "default".to_string(),
                description: "Default".to_string(),
            },
            AudioDevice {
                id: "mic-1".to_string(),
                description: "USB Microphone".to_string(),
            },
        ])
    }

    fn output_audio_devices(&self) -> CoreResult<Vec<AudioDevice>> {
        Ok(vec![AudioDevice {
            id: "speakers-1".to_string(),
            description: "Speakers".to_string(),
        }])
    }
}

/// Status reporter remembering every update.
#[derive(Default)]
pub struct RecordedStatus {
    updates: Mutex<Vec<RecStatus>>,
}

impl RecordedStatus {
    pub fn updates(&self) -> Vec<RecStatus> {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<RecStatus> {
        self.updates().last().copied()
    }
}

impl StatusReporter for RecordedStatus {
    fn update(&self, status: RecStatus) {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(status);
    }
}

/// Post-processor collecting queued jobs.
#[derive(Default)]
pub struct CollectedJobs {
    jobs: Mutex<Vec<(VideoJob, bool)>>,
}

impl CollectedJobs {
    pub fn jobs(&self) -> Vec<VideoJob> {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(job, _)| job.clone())
            .collect()
    }

    /// Whether each job's buffer file was on disk when it was queued.
    pub fn files_present_when_queued(&self) -> Vec<bool> {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, present)| *present)
            .collect()
    }
}

impl PostProcessor for CollectedJobs {
    fn queue_video(&self, job: VideoJob) {
        let present = job.buffer_file.exists();
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((job, present));
    }
}

/// Activity with fixed answers.
pub struct TestActivity {
    pub start: DateTime<Utc>,
    pub overrun: Duration,
    pub metadata: Option<Metadata>,
}

impl TestActivity {
    pub fn new(start: DateTime<Utc>, overrun_secs: u64) -> Self {
        Self {
            start,
            overrun: Duration::from_secs(overrun_secs),
            metadata: Some(Metadata::new("Raids", 312.5, true)),
        }
    }

    pub fn without_metadata(mut self) -> Self {
        self.metadata = None;
        self
    }
}

impl Activity for TestActivity {
    fn start_date(&self) -> DateTime<Utc> {
        self.start
    }

    fn overrun(&self) -> Duration {
        self.overrun
    }

    fn metadata(&self) -> Result<Metadata, MetadataError> {
        self.metadata
            .clone()
            .ok_or_else(|| "encounter reset before identification".into())
    }

    fn file_name(&self) -> String {
        "Test Encounter".to_string()
    }
}
