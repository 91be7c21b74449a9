use crate::{
    config::{
        default_bitrate_mbps, default_capture_cursor, default_encoder, default_fps,
        default_resolution, default_window_match,
    },
    engine::RecordingFormat,
};

use serde::{Deserialize, Serialize};

/// How the video source captures the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Capture a whole display.
    #[default]
    MonitorCapture,
    /// Hook the host application's window.
    GameCapture,
}

/// Video pipeline and encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Output resolution as `WIDTHxHEIGHT`.
    #[serde(default = "default_resolution")]
    pub resolution: String,

    /// Output frame rate.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Target bitrate in Mbps.
    #[serde(default = "default_bitrate_mbps")]
    pub bitrate_mbps: u32,

    /// Engine encoder type id.
    #[serde(default = "default_encoder")]
    pub encoder: String,

    /// Video capture mode.
    #[serde(default)]
    pub capture_mode: CaptureMode,

    /// Display captured in monitor mode.
    #[serde(default)]
    pub monitor_index: u32,

    /// Draw the cursor into the recording.
    #[serde(default = "default_capture_cursor")]
    pub capture_cursor: bool,

    /// Window match string used in game capture mode.
    #[serde(default = "default_window_match")]
    pub window_match: String,

    /// Container written to the buffer directory.
    #[serde(default)]
    pub format: RecordingFormat,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            fps: default_fps(),
            bitrate_mbps: default_bitrate_mbps(),
            encoder: default_encoder(),
            capture_mode: CaptureMode::default(),
            monitor_index: 0,
            capture_cursor: default_capture_cursor(),
            window_match: default_window_match(),
            format: RecordingFormat::default(),
        }
    }
}
