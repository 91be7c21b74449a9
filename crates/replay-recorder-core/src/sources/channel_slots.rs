use crate::{
    CoreResult, RecorderError,
    engine::{FaderId, InputId},
};

use std::panic::Location;

use error_location::ErrorLocation;

/// Output channel carrying the scene (and so the video source).
pub const VIDEO_CHANNEL: u32 = 1;

/// Output channels reserved for capture devices.
pub const AUDIO_INPUT_CHANNELS: &[u32] = &[2, 3, 4];

/// Output channels reserved for loopback of playback devices.
pub const AUDIO_OUTPUT_CHANNELS: &[u32] = &[5, 6, 7, 8, 9];

/// Engine output channels are numbered below this.
pub const MAX_OUTPUT_CHANNELS: u32 = 64;

/// Audio channels must lie strictly between the video channel and
/// [`MAX_OUTPUT_CHANNELS`].
#[track_caller]
pub fn validate_audio_channel(channel: u32) -> CoreResult<()> {
    if channel <= VIDEO_CHANNEL || channel >= MAX_OUTPUT_CHANNELS {
        return Err(RecorderError::InvalidChannel {
            channel,
            location: ErrorLocation::from(Location::caller()),
        });
    }
    Ok(())
}

/// An audio device bound to an output channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedAudio {
    /// Configured device id.
    pub device_id: String,
    /// Engine input created for the device.
    pub input: InputId,
    /// Gain control attached to the input.
    pub fader: FaderId,
    /// Output channel the input is bound to.
    pub channel: u32,
}

/// Fixed set of output channels, filled in device order.
#[derive(Debug)]
pub struct ChannelSlots {
    channels: &'static [u32],
    attached: Vec<AttachedAudio>,
}

impl ChannelSlots {
    /// Slots over `channels`.
    pub fn new(channels: &'static [u32]) -> Self {
        Self {
            channels,
            attached: Vec::with_capacity(channels.len()),
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.channels.len()
    }

    /// Pair device ids with channels in order. Ids beyond the slot count are
    /// not assigned; the second value is how many were left out.
    pub fn assign<'a>(&self, device_ids: &[&'a str]) -> (Vec<(u32, &'a str)>, usize) {
        let assigned: Vec<(u32, &'a str)> = self
            .channels
            .iter()
            .copied()
            .zip(device_ids.iter().copied())
            .collect();
        let dropped = device_ids.len() - assigned.len();
        (assigned, dropped)
    }

    /// Record a device as attached.
    pub fn push(&mut self, audio: AttachedAudio) {
        self.attached.push(audio);
    }

    /// Currently attached devices, in channel order.
    pub fn attached(&self) -> &[AttachedAudio] {
        &self.attached
    }

    /// Remove and return every attached device.
    pub fn drain(&mut self) -> Vec<AttachedAudio> {
        std::mem::take(&mut self.attached)
    }
}
