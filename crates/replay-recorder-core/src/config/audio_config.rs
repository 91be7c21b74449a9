use crate::config::default_volume;

use serde::{Deserialize, Serialize};

/// Audio device selection and gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Comma separated capture device ids.
    #[serde(default)]
    pub input_devices: String,

    /// Comma separated playback device ids, recorded via loopback.
    #[serde(default)]
    pub output_devices: String,

    /// Gain multiplier applied to every input device.
    #[serde(default = "default_volume")]
    pub mic_volume: f64,

    /// Gain multiplier applied to every output device.
    #[serde(default = "default_volume")]
    pub speaker_volume: f64,

    /// Downmix input devices to mono.
    #[serde(default)]
    pub force_mono: bool,
}

impl AudioConfig {
    /// Configured input device ids, in order, empty entries skipped.
    pub fn input_device_ids(&self) -> Vec<&str> {
        split_ids(&self.input_devices)
    }

    /// Configured output device ids, in order, empty entries skipped.
    pub fn output_device_ids(&self) -> Vec<&str> {
        split_ids(&self.output_devices)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_devices: String::new(),
            output_devices: String::new(),
            mic_volume: default_volume(),
            speaker_volume: default_volume(),
            force_mono: false,
        }
    }
}

fn split_ids(ids: &str) -> Vec<&str> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect()
}
