use crate::{
    CoreResult, RecorderError,
    config::{
        AudioConfig, CaptureMode, MAX_OVERLAY_HEIGHT, MAX_OVERLAY_WIDTH, OverlayConfig,
        VideoConfig,
    },
    engine::{
        CaptureEngine, Crop, EngineHandle, FaderId, InputId, InputSettings, OutputSource, SceneId,
        SceneItemId, SceneItemInfo,
    },
    sources::{
        AUDIO_INPUT_CHANNELS, AUDIO_OUTPUT_CHANNELS, AttachedAudio, ChannelSlots, VIDEO_CHANNEL,
        validate_audio_channel,
    },
};

use std::{
    panic::Location,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use error_location::ErrorLocation;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// How often game capture is checked for a resized window.
pub const SIZE_CHECK_INTERVAL: Duration = Duration::from_secs(5);

const MONITOR_SOURCE_NAME: &str = "Monitor Capture";
const GAME_SOURCE_NAME: &str = "Game Capture";
const OVERLAY_SOURCE_NAME: &str = "Chat Overlay";

/// Video source state shared with the size watcher task.
#[derive(Debug)]
struct VideoSlot {
    input: Option<InputId>,
    item: Option<SceneItemId>,
    output_width: u32,
    scale: f64,
}

/// Which side of the audio routing a device list feeds.
#[derive(Debug, Clone, Copy)]
enum AudioDirection {
    Input,
    Output,
}

impl AudioDirection {
    fn settings(self, device_id: &str) -> InputSettings {
        let device_id = device_id.to_string();
        match self {
            AudioDirection::Input => InputSettings::AudioInput { device_id },
            AudioDirection::Output => InputSettings::AudioOutput { device_id },
        }
    }

    fn label(self) -> &'static str {
        match self {
            AudioDirection::Input => "input",
            AudioDirection::Output => "output",
        }
    }
}

/// Owns every engine input the recorder creates.
///
/// Lock order is video slot first, then engine. The engine lock is never
/// held across an `.await`.
pub struct SourceManager {
    engine: EngineHandle,
    scene: Option<SceneId>,
    video: Arc<Mutex<VideoSlot>>,
    watcher: Option<CancellationToken>,
    audio_inputs: ChannelSlots,
    audio_outputs: ChannelSlots,
    overlay_input: Option<InputId>,
    overlay_item: Option<SceneItemId>,
}

impl SourceManager {
    /// Manager with nothing attached.
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            scene: None,
            video: Arc::new(Mutex::new(VideoSlot {
                input: None,
                item: None,
                output_width: 0,
                scale: 1.0,
            })),
            watcher: None,
            audio_inputs: ChannelSlots::new(AUDIO_INPUT_CHANNELS),
            audio_outputs: ChannelSlots::new(AUDIO_OUTPUT_CHANNELS),
            overlay_input: None,
            overlay_item: None,
        }
    }

    fn video_slot(&self) -> MutexGuard<'_, VideoSlot> {
        self.video.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Use `scene` for video and overlay items and bind it to the video
    /// channel. `output_width` is the encoded width sources are scaled to.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn attach_scene(&mut self, scene: SceneId, output_width: u32) -> CoreResult<()> {
        self.video_slot().output_width = output_width;
        self.engine
            .lock()
            .set_output_source(VIDEO_CHANNEL, Some(OutputSource::Scene(scene)))?;
        self.scene = Some(scene);
        Ok(())
    }

    /// Replace the video source with one matching `video.capture_mode`.
    ///
    /// Game capture additionally starts a background task that rescales the
    /// source whenever the captured window changes width.
    #[track_caller]
    #[instrument(skip(self, video), fields(mode = ?video.capture_mode))]
    pub fn add_video_source(&mut self, video: &VideoConfig) -> CoreResult<()> {
        let Some(scene) = self.scene else {
            return Err(RecorderError::SourceMissing {
                name: "scene",
                location: ErrorLocation::from(Location::caller()),
            });
        };

        self.stop_size_watcher();

        let (name, settings) = match video.capture_mode {
            CaptureMode::MonitorCapture => (
                MONITOR_SOURCE_NAME,
                InputSettings::Monitor {
                    monitor_index: video.monitor_index,
                    capture_cursor: video.capture_cursor,
                },
            ),
            CaptureMode::GameCapture => (
                GAME_SOURCE_NAME,
                InputSettings::Window {
                    window: video.window_match.clone(),
                    capture_cursor: video.capture_cursor,
                    allow_transparency: true,
                    priority: 1,
                },
            ),
        };

        {
            let mut slot = self.video.lock().unwrap_or_else(|e| e.into_inner());
            let mut engine = self.engine.lock();

            release_video(&mut **engine, &mut slot);

            let input = engine.create_input(name, &settings)?;
            let item = match engine.add_scene_item(scene, input, None) {
                Ok(item) => item,
                Err(e) => {
                    engine.release_input(input);
                    return Err(e);
                }
            };

            slot.input = Some(input);
            slot.item = Some(item);
            slot.scale = 1.0;
        }

        info!(source = name, "Video source added");

        if video.capture_mode == CaptureMode::GameCapture {
            self.start_size_watcher();
        }

        Ok(())
    }

    /// Scale the video source so its width matches the output width.
    ///
    /// Returns the new scale when one was applied. A source reporting width 0
    /// (no frames yet) is left alone, as is one whose scale is unchanged.
    #[track_caller]
    pub fn rescale_video_source(&self) -> CoreResult<Option<f64>> {
        rescale_video(&self.engine, &self.video)
    }

    /// Scale currently applied to the video source.
    pub fn video_scale(&self) -> f64 {
        self.video_slot().scale
    }

    /// Whether a size watcher task is running.
    pub fn is_watching_size(&self) -> bool {
        self.watcher.is_some()
    }

    fn start_size_watcher(&mut self) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime, video size watcher not started");
                return;
            }
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let engine = self.engine.clone();
        let video = Arc::clone(&self.video);

        handle.spawn(async move {
            let mut interval = tokio::time::interval_at(
                tokio::time::Instant::now() + SIZE_CHECK_INTERVAL,
                SIZE_CHECK_INTERVAL,
            );
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = rescale_video(&engine, &video) {
                            warn!(error = %e, "Video rescale failed");
                        }
                    }
                }
            }
            debug!("Video size watcher stopped");
        });

        self.watcher = Some(token);
        debug!(interval_secs = SIZE_CHECK_INTERVAL.as_secs(), "Video size watcher started");
    }

    fn stop_size_watcher(&mut self) {
        if let Some(token) = self.watcher.take() {
            token.cancel();
        }
    }

    /// Attach the configured capture and playback devices, each with its own
    /// fader. Previously attached devices are removed first, so calling this
    /// twice never duplicates sources.
    #[track_caller]
    #[instrument(skip(self, audio))]
    pub fn add_audio_sources(&mut self, audio: &AudioConfig) -> CoreResult<()> {
        self.remove_audio_sources();

        let mut engine = self.engine.lock();
        attach_devices(
            &mut **engine,
            &mut self.audio_inputs,
            &audio.input_device_ids(),
            audio.mic_volume,
            audio.force_mono,
            AudioDirection::Input,
        )?;
        attach_devices(
            &mut **engine,
            &mut self.audio_outputs,
            &audio.output_device_ids(),
            audio.speaker_volume,
            false,
            AudioDirection::Output,
        )?;

        info!(
            inputs = self.audio_inputs.attached().len(),
            outputs = self.audio_outputs.attached().len(),
            "Audio sources added"
        );

        Ok(())
    }

    /// Detach every audio device. Safe to call with nothing attached.
    #[instrument(skip(self))]
    pub fn remove_audio_sources(&mut self) {
        let attached: Vec<AttachedAudio> = self
            .audio_inputs
            .drain()
            .into_iter()
            .chain(self.audio_outputs.drain())
            .collect();
        if attached.is_empty() {
            return;
        }

        let mut engine = self.engine.lock();
        for audio in &attached {
            engine.destroy_fader(audio.fader);
            if let Err(e) = engine.set_output_source(audio.channel, None) {
                error!(channel = audio.channel, error = %e, "Failed to clear audio channel");
            }
            engine.release_input(audio.input);
        }

        debug!(count = attached.len(), "Audio sources removed");
    }

    /// Capture devices currently bound to channels.
    pub fn attached_inputs(&self) -> &[AttachedAudio] {
        self.audio_inputs.attached()
    }

    /// Playback devices currently bound to channels.
    pub fn attached_outputs(&self) -> &[AttachedAudio] {
        self.audio_outputs.attached()
    }

    /// Create (or recreate) the overlay image input.
    #[track_caller]
    #[instrument(skip(self, overlay))]
    pub fn create_overlay_image_source(&mut self, overlay: &OverlayConfig) -> CoreResult<()> {
        self.remove_overlay();

        let input = self.engine.lock().create_input(
            OVERLAY_SOURCE_NAME,
            &InputSettings::Image {
                file: overlay.image_path.clone(),
            },
        )?;
        self.overlay_input = Some(input);

        debug!(image = %overlay.image_path.display(), "Overlay image source created");
        Ok(())
    }

    /// Place the overlay image in the scene with the configured crop and
    /// position. Any previous overlay item is removed first; a disabled
    /// overlay stops there, leaving the image source unattached.
    #[track_caller]
    #[instrument(skip(self, overlay), fields(enabled = overlay.enabled))]
    pub fn add_overlay_source(&mut self, overlay: &OverlayConfig) -> CoreResult<()> {
        if let Some(item) = self.overlay_item.take() {
            self.engine.lock().remove_scene_item(item);
        }

        if !overlay.enabled {
            debug!("Overlay disabled");
            return Ok(());
        }

        let (Some(scene), Some(input)) = (self.scene, self.overlay_input) else {
            error!("Overlay needs a scene and an image source");
            return Ok(());
        };

        let info = overlay_item_info(overlay);
        self.overlay_item = Some(self.engine.lock().add_scene_item(scene, input, Some(&info))?);

        info!(
            width = overlay.width,
            height = overlay.height,
            x = overlay.x,
            y = overlay.y,
            "Overlay added"
        );
        Ok(())
    }

    /// Whether the overlay item is currently in the scene.
    pub fn has_overlay_item(&self) -> bool {
        self.overlay_item.is_some()
    }

    /// Whether the overlay image source exists.
    pub fn has_overlay_source(&self) -> bool {
        self.overlay_input.is_some()
    }

    fn remove_overlay(&mut self) {
        let item = self.overlay_item.take();
        let input = self.overlay_input.take();
        if item.is_none() && input.is_none() {
            return;
        }

        let mut engine = self.engine.lock();
        if let Some(item) = item {
            engine.remove_scene_item(item);
        }
        if let Some(input) = input {
            engine.release_input(input);
        }
    }

    /// Release every source and unbind the video channel.
    #[instrument(skip(self))]
    pub fn release_all(&mut self) {
        self.stop_size_watcher();
        self.remove_audio_sources();
        self.remove_overlay();

        {
            let mut slot = self.video.lock().unwrap_or_else(|e| e.into_inner());
            let mut engine = self.engine.lock();
            release_video(&mut **engine, &mut slot);
            if self.scene.take().is_some() {
                if let Err(e) = engine.set_output_source(VIDEO_CHANNEL, None) {
                    error!(error = %e, "Failed to clear video channel");
                }
            }
        }

        debug!("All sources released");
    }
}

impl Drop for SourceManager {
    fn drop(&mut self) {
        self.stop_size_watcher();
    }
}

fn release_video(engine: &mut dyn CaptureEngine, slot: &mut VideoSlot) {
    if let Some(item) = slot.item.take() {
        engine.remove_scene_item(item);
    }
    if let Some(input) = slot.input.take() {
        engine.release_input(input);
    }
    slot.scale = 1.0;
}

#[track_caller]
fn rescale_video(engine: &EngineHandle, video: &Mutex<VideoSlot>) -> CoreResult<Option<f64>> {
    let mut slot = video.lock().unwrap_or_else(|e| e.into_inner());
    let (Some(input), Some(item)) = (slot.input, slot.item) else {
        return Ok(None);
    };

    let mut engine = engine.lock();
    let source_width = engine.input_width(input);
    if source_width == 0 {
        return Ok(None);
    }

    let scale = fit_scale(slot.output_width, source_width);
    if (scale - slot.scale).abs() <= f64::EPSILON {
        return Ok(None);
    }

    engine.set_scene_item_scale(item, scale)?;
    debug!(
        source_width,
        output_width = slot.output_width,
        scale,
        "Video source rescaled"
    );
    slot.scale = scale;
    Ok(Some(scale))
}

/// Output-to-source width ratio rounded to two decimals.
pub fn fit_scale(output_width: u32, source_width: u32) -> f64 {
    let ratio = f64::from(output_width) / f64::from(source_width);
    (ratio * 100.0).round() / 100.0
}

/// Placement of the overlay item: the visible area is cut from the centre of
/// the overlay canvas.
pub fn overlay_item_info(overlay: &OverlayConfig) -> SceneItemInfo {
    let horizontal = MAX_OVERLAY_WIDTH.saturating_sub(overlay.width) / 2;
    let vertical = MAX_OVERLAY_HEIGHT.saturating_sub(overlay.height) / 2;

    SceneItemInfo {
        name: OVERLAY_SOURCE_NAME.to_string(),
        crop: Crop {
            left: horizontal,
            right: horizontal,
            top: vertical,
            bottom: vertical,
        },
        scale_x: 1.0,
        scale_y: 1.0,
        x: overlay.x,
        y: overlay.y,
        visible: true,
    }
}

#[track_caller]
fn attach_devices(
    engine: &mut dyn CaptureEngine,
    slots: &mut ChannelSlots,
    device_ids: &[&str],
    volume: f64,
    force_mono: bool,
    direction: AudioDirection,
) -> CoreResult<()> {
    let (assigned, dropped) = slots.assign(device_ids);
    if dropped > 0 {
        warn!(
            direction = direction.label(),
            configured = device_ids.len(),
            channels = slots.capacity(),
            dropped,
            "More audio devices configured than channels, extra devices ignored"
        );
    }

    for (index, (channel, device_id)) in assigned.into_iter().enumerate() {
        validate_audio_channel(channel)?;

        let name = format!("audio-{}-{}", direction.label(), index);
        let input = engine.create_input(&name, &direction.settings(device_id))?;

        let bound = bind_audio_input(engine, input, channel, volume, force_mono);

        match bound {
            Ok(fader) => {
                debug!(device_id, channel, volume, "Audio device attached");
                slots.push(AttachedAudio {
                    device_id: device_id.to_string(),
                    input,
                    fader,
                    channel,
                });
            }
            Err(e) => {
                engine.release_input(input);
                return Err(e);
            }
        }
    }

    Ok(())
}

#[track_caller]
fn bind_audio_input(
    engine: &mut dyn CaptureEngine,
    input: InputId,
    channel: u32,
    volume: f64,
    force_mono: bool,
) -> CoreResult<FaderId> {
    let fader = engine.create_fader(input, volume)?;

    let routed = if force_mono {
        engine.set_force_mono(input, true)
    } else {
        Ok(())
    }
    .and_then(|()| engine.set_output_source(channel, Some(OutputSource::Input(input))));

    if let Err(e) = routed {
        engine.destroy_fader(fader);
        return Err(e);
    }
    Ok(fader)
}
