//! Activity recording: engine session lifecycle and the start/stop state
//! machine on top of the rolling buffer.

mod activity;
mod lifecycle;
mod orchestrator;
mod overrun;
mod post_process;

pub use {
    activity::{Activity, Metadata, MetadataError},
    lifecycle::{
        AMF_ENCODER_ID, EngineLifecycle, LifecyclePhase, recording_settings, video_context,
    },
    orchestrator::Recorder,
    overrun::{OverrunGate, OverrunToken},
    post_process::{PostProcessor, VideoJob},
};
