//! Files finished recordings into the storage directory.
//!
//! Jobs are handed over on an unbounded channel and processed one at a time
//! by a worker task. Each recording is copied out of the buffer directory
//! under the activity's name, next to a JSON sidecar holding its metadata
//! and the offset at which the activity starts.

use crate::{AppError, AppResult};

use std::{
    fs,
    panic::Location,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use error_location::ErrorLocation;
use replay_recorder_core::{PostProcessor, VideoJob};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{error, info, instrument, warn};

const SIDECAR_EXTENSION: &str = "json";

/// Post-processor queueing jobs for the filing worker.
pub struct VideoQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<VideoJob>>>,
    storage_tx: watch::Sender<PathBuf>,
    pending: Arc<watch::Sender<usize>>,
}

impl VideoQueue {
    /// Spawn the filing worker writing into `storage_dir`.
    ///
    /// The worker exits once the queue is [closed](Self::close) and every
    /// queued job has been filed.
    pub fn spawn(storage_dir: PathBuf) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (storage_tx, storage_rx) = watch::channel(storage_dir);
        let pending = Arc::new(watch::Sender::new(0));

        let handle = tokio::spawn(run_worker(rx, storage_rx, Arc::clone(&pending)));

        let queue = Self {
            tx: Mutex::new(Some(tx)),
            storage_tx,
            pending,
        };
        (queue, handle)
    }

    /// Directory used for jobs filed from now on.
    pub fn set_storage_dir(&self, storage_dir: PathBuf) {
        self.storage_tx.send_replace(storage_dir);
    }

    /// Wait until every queued job has been filed.
    ///
    /// Buffer files are deleted when buffering stops, so this must complete
    /// before the buffer is stopped.
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }

    /// Stop accepting jobs. Already queued jobs are still filed.
    pub fn close(&self) {
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

impl PostProcessor for VideoQueue {
    fn queue_video(&self, job: VideoJob) {
        let tx = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = tx.as_ref() else {
            warn!(file_name = %job.file_name, "Video queue closed, recording dropped");
            return;
        };

        info!(
            file_name = %job.file_name,
            buffer_file = ?job.buffer_file,
            start_offset_secs = job.start_offset_secs,
            "Recording queued"
        );

        self.pending.send_modify(|pending| *pending += 1);
        if let Err(e) = tx.send(job) {
            self.pending.send_modify(|pending| *pending -= 1);
            error!(file_name = %e.0.file_name, "Filing worker gone, recording dropped");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<VideoJob>,
    storage_rx: watch::Receiver<PathBuf>,
    pending: Arc<watch::Sender<usize>>,
) {
    while let Some(job) = rx.recv().await {
        let storage_dir = storage_rx.borrow().clone();
        let file_name = job.file_name.clone();

        match tokio::task::spawn_blocking(move || file_job(&storage_dir, &job)).await {
            Ok(Ok(video)) => info!(video = ?video, "Recording filed"),
            Ok(Err(e)) => error!(file_name = %file_name, error = ?e, "Failed to file recording"),
            Err(e) => error!(file_name = %file_name, error = ?e, "Filing task panicked"),
        }
        pending.send_modify(|pending| *pending = pending.saturating_sub(1));
    }

    info!("Filing worker stopped");
}

/// Copy the job's buffer file into `storage_dir` and write its sidecar.
///
/// Returns the path of the filed video. An existing video or sidecar of the
/// same name is never overwritten; a numbered suffix is added instead.
#[track_caller]
#[instrument(skip(job), fields(file_name = %job.file_name))]
pub fn file_job(storage_dir: &Path, job: &VideoJob) -> AppResult<PathBuf> {
    let extension = job
        .buffer_file
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| AppError::FilingFailed {
            file_name: job.file_name.clone(),
            reason: format!("Buffer file {:?} has no extension", job.buffer_file),
            location: ErrorLocation::from(Location::caller()),
        })?;

    fs::create_dir_all(storage_dir)?;

    let stem = sanitize_file_name(&job.file_name);
    let video = unique_path(storage_dir, &stem, extension);

    fs::copy(&job.buffer_file, &video).map_err(|e| AppError::FilingFailed {
        file_name: job.file_name.clone(),
        reason: format!("Failed to copy {:?}: {}", job.buffer_file, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let sidecar = serde_json::to_string_pretty(job).map_err(|e| AppError::FilingFailed {
        file_name: job.file_name.clone(),
        reason: format!("Failed to serialize metadata: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;
    fs::write(video.with_extension(SIDECAR_EXTENSION), sidecar)?;

    Ok(video)
}

/// Replace characters that are not valid in file names on any platform.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        "recording".to_string()
    } else {
        cleaned
    }
}

/// First `stem.extension` in `dir` whose video and sidecar names are both
/// free.
fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let taken = |video: &Path| video.exists() || video.with_extension(SIDECAR_EXTENSION).exists();

    let mut candidate = dir.join(format!("{}.{}", stem, extension));
    let mut n = 1;
    while taken(&candidate) {
        n += 1;
        candidate = dir.join(format!("{} ({}).{}", stem, n, extension));
    }
    candidate
}
