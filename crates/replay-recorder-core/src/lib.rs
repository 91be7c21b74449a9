//! Replay Recorder Core Library
//!
//! Keeps a rolling video buffer of a running application and promotes the
//! slices that cover detected activities into recordings.
//!
//! # Example
//!
//! ```no_run
//! use replay_recorder_core::{
//!     Activity, CoreResult, Metadata, MetadataError, PostProcessor, RecStatus, Recorder,
//!     RecorderConfig, SimulatedEngine, StatusReporter, StorageConfig, VideoJob,
//! };
//!
//! use std::{sync::Arc, time::Duration};
//!
//! use chrono::{DateTime, Utc};
//!
//! struct LogStatus;
//! impl StatusReporter for LogStatus {
//!     fn update(&self, status: RecStatus) {
//!         println!("status: {:?}", status);
//!     }
//! }
//!
//! struct PrintJobs;
//! impl PostProcessor for PrintJobs {
//!     fn queue_video(&self, job: VideoJob) {
//!         println!("recorded {} at +{}s", job.buffer_file.display(), job.start_offset_secs);
//!     }
//! }
//!
//! struct Encounter(DateTime<Utc>);
//! impl Activity for Encounter {
//!     fn start_date(&self) -> DateTime<Utc> {
//!         self.0
//!     }
//!     fn overrun(&self) -> Duration {
//!         Duration::from_secs(3)
//!     }
//!     fn metadata(&self) -> Result<Metadata, MetadataError> {
//!         Ok(Metadata::new("Raids", 42.0, true))
//!     }
//!     fn file_name(&self) -> String {
//!         "Raid Boss".to_string()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let recorder = Recorder::new(SimulatedEngine::new(), Arc::new(LogStatus), Arc::new(PrintJobs));
//!     let config = RecorderConfig::with_storage(StorageConfig {
//!         buffer_path: "buffer".into(),
//!         storage_path: "videos".into(),
//!     });
//!
//!     recorder.initialize()?;
//!     recorder.configure(&config)?;
//!     recorder.start_buffer().await?;
//!
//!     let encounter = Encounter(Utc::now());
//!     recorder.start(&encounter).await;
//!     tokio::time::sleep(Duration::from_secs(10)).await;
//!     recorder.stop(&encounter, false).await?;
//!
//!     recorder.stop_buffer().await?;
//!     recorder.shutdown()
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod engine;
mod error;
pub mod recorder;
pub mod signals;
pub mod sources;
mod status;

pub use {
    buffer::BufferController,
    config::{
        AudioConfig, CaptureMode, OverlayConfig, RecorderConfig, Resolution, StorageConfig,
        VideoConfig,
    },
    engine::{
        AudioDevice, CaptureEngine, EngineHandle, RecordingFormat, SessionId, SimulatedEngine,
    },
    error::{RecorderError, Result as CoreResult},
    recorder::{
        Activity, EngineLifecycle, LifecyclePhase, Metadata, MetadataError, PostProcessor,
        Recorder, VideoJob,
    },
    signals::{EngineState, SignalSynchronizer},
    sources::SourceManager,
    status::{RecStatus, StatusReporter},
};

#[cfg(test)]
mod tests;
