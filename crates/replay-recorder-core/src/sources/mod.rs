//! Engine inputs: the video capture source, audio devices and the overlay.

mod channel_slots;
mod manager;

pub use {
    channel_slots::{
        AUDIO_INPUT_CHANNELS, AUDIO_OUTPUT_CHANNELS, AttachedAudio, ChannelSlots,
        MAX_OUTPUT_CHANNELS, VIDEO_CHANNEL, validate_audio_channel,
    },
    manager::{SIZE_CHECK_INTERVAL, SourceManager, fit_scale, overlay_item_info},
};
