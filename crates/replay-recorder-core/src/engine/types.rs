use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of one engine session (initialize → configure → shutdown).
pub type SessionId = uuid::Uuid;

/// Engine-side handle to an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputId(pub u64);

/// Engine-side handle to a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(pub u64);

/// Engine-side handle to a source placed in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneItemId(pub u64);

/// Engine-side handle to a gain control attached to an audio input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaderId(pub u64);

/// Something that can be bound to an engine output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    /// A whole scene (used for the video channel).
    Scene(SceneId),
    /// A single input (used for audio channels).
    Input(InputId),
}

/// Raw pixel format of the video pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoFormat {
    /// Planar 4:2:0, the engine default for hardware encoders.
    Nv12,
    /// Planar 4:2:0 with separate chroma planes.
    I420,
}

/// Video pipeline parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoContext {
    /// Frame rate numerator.
    pub fps_num: u32,
    /// Frame rate denominator.
    pub fps_den: u32,
    /// Canvas width.
    pub base_width: u32,
    /// Canvas height.
    pub base_height: u32,
    /// Encoded width.
    pub output_width: u32,
    /// Encoded height.
    pub output_height: u32,
    /// Pixel format.
    pub output_format: VideoFormat,
}

/// Container written by the recording output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingFormat {
    /// MPEG-4 part 14.
    #[default]
    Mp4,
    /// Matroska.
    Mkv,
}

impl RecordingFormat {
    /// File extension the engine writes, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            RecordingFormat::Mp4 => "mp4",
            RecordingFormat::Mkv => "mkv",
        }
    }
}

/// Encoder rate control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    /// Variable bitrate.
    Vbr,
    /// Constant bitrate.
    Cbr,
}

/// Settings applied to the video encoder after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Engine encoder type id.
    pub encoder_id: String,
    /// Rate control mode.
    pub rate_control: RateControl,
    /// Target bitrate in kbps.
    pub bitrate: u32,
    /// Maximum bitrate in kbps.
    pub max_bitrate: u32,
    /// Peak bitrate, only understood by some vendor encoders.
    pub peak_bitrate: Option<u32>,
}

/// Parameters of the recording output object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSettings {
    /// Directory the output writes files into.
    pub path: PathBuf,
    /// Container format.
    pub format: RecordingFormat,
    /// Overwrite existing files with the same name.
    pub overwrite: bool,
    /// Write file names without spaces.
    pub no_space: bool,
    /// Encoder to record with.
    pub encoder: EncoderSettings,
}

/// What an input captures and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSettings {
    /// Whole-display capture.
    Monitor {
        /// Display index.
        monitor_index: u32,
        /// Draw the cursor.
        capture_cursor: bool,
    },
    /// Single-window capture, matched by window class.
    Window {
        /// `title:class:executable` match string.
        window: String,
        /// Draw the cursor.
        capture_cursor: bool,
        /// Keep the window's alpha channel.
        allow_transparency: bool,
        /// Match priority (1 = same class).
        priority: u32,
    },
    /// Static image.
    Image {
        /// Image file.
        file: PathBuf,
    },
    /// Microphone or other capture device.
    AudioInput {
        /// Engine device id.
        device_id: String,
    },
    /// Loopback capture of a playback device.
    AudioOutput {
        /// Engine device id.
        device_id: String,
    },
}

impl InputSettings {
    /// Engine input type id.
    pub fn kind(&self) -> &'static str {
        match self {
            InputSettings::Monitor { .. } => "monitor_capture",
            InputSettings::Window { .. } => "game_capture",
            InputSettings::Image { .. } => "image_source",
            InputSettings::AudioInput { .. } => "wasapi_input_capture",
            InputSettings::AudioOutput { .. } => "wasapi_output_capture",
        }
    }
}

/// Pixels trimmed from each edge of a scene item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crop {
    /// Left edge.
    pub left: u32,
    /// Right edge.
    pub right: u32,
    /// Top edge.
    pub top: u32,
    /// Bottom edge.
    pub bottom: u32,
}

/// Placement of a source inside a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItemInfo {
    /// Item name.
    pub name: String,
    /// Edge crop.
    pub crop: Crop,
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// Horizontal offset in canvas pixels.
    pub x: i32,
    /// Vertical offset in canvas pixels.
    pub y: i32,
    /// Whether the item is drawn.
    pub visible: bool,
}

/// Audio device as enumerated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Engine device id.
    pub id: String,
    /// Human readable name.
    pub description: String,
}
