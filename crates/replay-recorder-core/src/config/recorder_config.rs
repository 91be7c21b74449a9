//! Typed recorder configuration and its validation.
//!
//! A config with an empty device list or a stale encoder id still loads.
//! [`RecorderConfig::validate`] must pass before the engine is configured
//! with it.

use crate::{
    CoreResult, RecorderError,
    config::{
        AudioConfig, MAX_OVERLAY_HEIGHT, MAX_OVERLAY_WIDTH, OverlayConfig, Resolution,
        StorageConfig, SUPPORTED_FPS, VideoConfig,
    },
};

use std::panic::Location;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Everything the recorder reads from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Video pipeline settings.
    #[serde(default)]
    pub video: VideoConfig,
    /// Audio devices and gain.
    #[serde(default)]
    pub audio: AudioConfig,
    /// Chat overlay.
    #[serde(default)]
    pub overlay: OverlayConfig,
    /// Buffer and storage directories.
    pub storage: StorageConfig,
}

impl RecorderConfig {
    /// Config with defaults everywhere except the directories.
    pub fn with_storage(storage: StorageConfig) -> Self {
        Self {
            video: VideoConfig::default(),
            audio: AudioConfig::default(),
            overlay: OverlayConfig::default(),
            storage,
        }
    }

    /// Parsed output resolution.
    #[track_caller]
    pub fn resolution(&self) -> CoreResult<Resolution> {
        self.video.resolution.parse()
    }

    /// Check every setting the engine depends on.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: String| RecorderError::InvalidConfig {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        let storage = &self.storage;
        if storage.buffer_path.as_os_str().is_empty() {
            return Err(invalid("Buffer path is not set".to_string()));
        }
        if storage.storage_path.as_os_str().is_empty() {
            return Err(invalid("Storage path is not set".to_string()));
        }
        if storage.buffer_path == storage.storage_path {
            return Err(invalid(
                "Buffer path must differ from storage path, the buffer is pruned".to_string(),
            ));
        }

        let resolution = self.resolution()?;
        if !resolution.is_supported() {
            return Err(invalid(format!("Unsupported resolution {}", resolution)));
        }

        let video = &self.video;
        if !SUPPORTED_FPS.contains(&video.fps) {
            return Err(invalid(format!("Unsupported frame rate {}", video.fps)));
        }
        if video.bitrate_mbps == 0 || video.bitrate_mbps > 300 {
            return Err(invalid(format!(
                "Bitrate {} Mbps outside 1..=300",
                video.bitrate_mbps
            )));
        }
        if video.encoder.trim().is_empty() {
            return Err(invalid("Encoder is not set".to_string()));
        }

        let audio = &self.audio;
        for (name, volume) in [("Mic", audio.mic_volume), ("Speaker", audio.speaker_volume)] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(invalid(format!("{} volume {} outside 0..=1", name, volume)));
            }
        }

        let overlay = &self.overlay;
        if overlay.enabled
            && (overlay.width > MAX_OVERLAY_WIDTH || overlay.height > MAX_OVERLAY_HEIGHT)
        {
            return Err(invalid(format!(
                "Overlay {}x{} larger than {}x{} canvas",
                overlay.width, overlay.height, MAX_OVERLAY_WIDTH, MAX_OVERLAY_HEIGHT
            )));
        }

        Ok(())
    }
}
