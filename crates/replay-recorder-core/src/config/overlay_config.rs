use crate::config::{
    default_overlay_height, default_overlay_image, default_overlay_width, default_overlay_y,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Static image overlay drawn over the recording (e.g. to hide chat).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Whether the overlay is attached to the scene.
    #[serde(default)]
    pub enabled: bool,

    /// Visible width, cropped out of the overlay canvas.
    #[serde(default = "default_overlay_width")]
    pub width: u32,

    /// Visible height, cropped out of the overlay canvas.
    #[serde(default = "default_overlay_height")]
    pub height: u32,

    /// Horizontal position in output pixels.
    #[serde(default)]
    pub x: i32,

    /// Vertical position in output pixels.
    #[serde(default = "default_overlay_y")]
    pub y: i32,

    /// Overlay image file.
    #[serde(default = "default_overlay_image")]
    pub image_path: PathBuf,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            width: default_overlay_width(),
            height: default_overlay_height(),
            x: 0,
            y: default_overlay_y(),
            image_path: default_overlay_image(),
        }
    }
}
