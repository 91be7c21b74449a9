//! Recorder settings, split per concern, with serde defaults.

mod audio_config;
mod overlay_config;
mod recorder_config;
mod resolution;
mod storage_config;
mod video_config;

pub use {
    audio_config::AudioConfig,
    overlay_config::OverlayConfig,
    recorder_config::RecorderConfig,
    resolution::{Resolution, SUPPORTED_RESOLUTIONS},
    storage_config::StorageConfig,
    video_config::{CaptureMode, VideoConfig},
};

use std::path::PathBuf;

/// Frame rates the encoder pipeline is offered.
pub const SUPPORTED_FPS: &[u32] = &[10, 20, 30, 60];

/// Size of the overlay image canvas the visible area is cropped from.
pub const MAX_OVERLAY_WIDTH: u32 = 5000;
/// See [`MAX_OVERLAY_WIDTH`].
pub const MAX_OVERLAY_HEIGHT: u32 = 2000;

pub(crate) const DEFAULT_RESOLUTION: &str = "1920x1080";
pub(crate) const DEFAULT_FPS: u32 = 60;
pub(crate) const DEFAULT_BITRATE_MBPS: u32 = 15;
pub(crate) const DEFAULT_ENCODER: &str = "obs_x264";
pub(crate) const DEFAULT_WINDOW_MATCH: &str = "World of Warcraft:GxWindowClass:Wow.exe";
pub(crate) const DEFAULT_VOLUME: f64 = 1.0;

pub(crate) fn default_resolution() -> String {
    DEFAULT_RESOLUTION.to_string()
}

pub(crate) fn default_fps() -> u32 {
    DEFAULT_FPS
}

pub(crate) fn default_bitrate_mbps() -> u32 {
    DEFAULT_BITRATE_MBPS
}

pub(crate) fn default_encoder() -> String {
    DEFAULT_ENCODER.to_string()
}

pub(crate) fn default_capture_cursor() -> bool {
    true
}

pub(crate) fn default_window_match() -> String {
    DEFAULT_WINDOW_MATCH.to_string()
}

pub(crate) fn default_volume() -> f64 {
    DEFAULT_VOLUME
}

pub(crate) fn default_overlay_width() -> u32 {
    700
}

pub(crate) fn default_overlay_height() -> u32 {
    230
}

pub(crate) fn default_overlay_y() -> i32 {
    870
}

pub(crate) fn default_overlay_image() -> PathBuf {
    PathBuf::from("assets/poster/chat-cover.png")
}
