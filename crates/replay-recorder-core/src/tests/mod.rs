#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod fake_engine;
mod signals;
mod sources;

use crate::{Recorder, RecorderConfig, StorageConfig};

use fake_engine::{CollectedJobs, FakeEngine, FakeProbe, RecordedStatus};

use std::{path::Path, sync::Arc};

use tempfile::TempDir;

pub(crate) fn test_config(root: &Path) -> RecorderConfig {
    RecorderConfig::with_storage(StorageConfig {
        buffer_path: root.join("buffer"),
        storage_path: root.join("videos"),
    })
}

pub(crate) struct Harness {
    pub recorder: Recorder,
    pub probe: FakeProbe,
    pub status: Arc<RecordedStatus>,
    pub jobs: Arc<CollectedJobs>,
    pub config: RecorderConfig,
    pub dir: TempDir,
}

/// Recorder over a fake engine, initialized and configured, buffer not
/// started.
pub(crate) fn configured_harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let (engine, probe) = FakeEngine::new();
    let status = Arc::new(RecordedStatus::default());
    let jobs = Arc::new(CollectedJobs::default());
    let recorder = Recorder::new(engine, status.clone(), jobs.clone());

    recorder.initialize().unwrap();
    recorder.configure(&config).unwrap();
    probe.clear_calls();

    Harness {
        recorder,
        probe,
        status,
        jobs,
        config,
        dir,
    }
}
