//! The capture engine seam: the trait every backend implements, the shared
//! handle the recorder locks it through, and an in-process simulation.

mod capture_engine;
mod simulated;
mod types;

pub use {
    capture_engine::{CaptureEngine, EngineHandle},
    simulated::{DEFAULT_SIMULATED_LATENCY, SimulatedEngine},
    types::{
        AudioDevice, Crop, EncoderSettings, FaderId, InputId, InputSettings, OutputSource,
        RateControl, RecordingFormat, RecordingSettings, SceneId, SceneItemId, SceneItemInfo,
        SessionId, VideoContext, VideoFormat,
    },
};
