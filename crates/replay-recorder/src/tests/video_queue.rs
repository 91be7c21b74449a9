use crate::{
    AppError, VideoQueue,
    video_queue::{file_job, sanitize_file_name},
};

use std::{fs, path::Path, time::Duration};

use replay_recorder_core::{Metadata, PostProcessor, VideoJob};
use tempfile::TempDir;

fn job(buffer_file: &Path, file_name: &str) -> VideoJob {
    VideoJob {
        buffer_file: buffer_file.to_path_buf(),
        metadata: Metadata::new("Raids", 61.0, true),
        file_name: file_name.to_string(),
        start_offset_secs: 12.0,
    }
}

/// WHAT: Filing copies the segment and writes a metadata sidecar
/// WHY: The trimmer needs both the video and the offset the activity starts at
#[test]
fn given_buffer_file_when_filing_then_video_and_sidecar_written() {
    // Given: A buffer segment with content
    let dir = TempDir::new().unwrap();
    let segment = dir.path().join("segment.mp4");
    fs::write(&segment, b"frames").unwrap();
    let storage = dir.path().join("videos");

    // When: Filing it
    let video = file_job(&storage, &job(&segment, "Boss Kill")).unwrap();

    // Then: Copy next to a camelCase JSON sidecar, segment untouched
    assert_eq!(video, storage.join("Boss Kill.mp4"));
    assert_eq!(fs::read(&video).unwrap(), b"frames");
    assert!(segment.exists());

    let sidecar: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(storage.join("Boss Kill.json")).unwrap())
            .unwrap();
    assert_eq!(sidecar["startOffsetSecs"], 12.0);
    assert_eq!(sidecar["fileName"], "Boss Kill");
    assert_eq!(sidecar["metadata"]["category"], "Raids");
    assert_eq!(sidecar["metadata"]["durationSecs"], 61.0);
}

/// WHAT: A second recording with the same name gets a numbered suffix
/// WHY: Repeated attempts at the same activity must not overwrite each other
#[test]
fn given_existing_video_when_filing_same_name_then_suffixed() {
    // Given: A video already filed under the name
    let dir = TempDir::new().unwrap();
    let segment = dir.path().join("segment.mkv");
    fs::write(&segment, b"").unwrap();
    let storage = dir.path().join("videos");
    file_job(&storage, &job(&segment, "Arena")).unwrap();

    // When: Filing again
    let second = file_job(&storage, &job(&segment, "Arena")).unwrap();

    // Then: Suffixed, both sidecars present
    assert_eq!(second, storage.join("Arena (2).mkv"));
    assert!(storage.join("Arena.json").exists());
    assert!(storage.join("Arena (2).json").exists());
}

/// WHAT: An unrelated sidecar with the target name pushes the video to a suffix
/// WHY: Filing must never overwrite a JSON file it did not write
#[test]
fn given_existing_sidecar_only_when_filing_then_suffixed_and_sidecar_kept() {
    // Given: Only "Arena.json" exists in storage
    let dir = TempDir::new().unwrap();
    let segment = dir.path().join("segment.mp4");
    fs::write(&segment, b"").unwrap();
    let storage = dir.path().join("videos");
    fs::create_dir_all(&storage).unwrap();
    fs::write(storage.join("Arena.json"), b"notes").unwrap();

    // When: Filing a recording named "Arena"
    let video = file_job(&storage, &job(&segment, "Arena")).unwrap();

    // Then: Suffixed, the existing sidecar is untouched
    assert_eq!(video, storage.join("Arena (2).mp4"));
    assert_eq!(fs::read(storage.join("Arena.json")).unwrap(), b"notes");
    assert!(storage.join("Arena (2).json").exists());
}

/// WHAT: A missing buffer file fails filing
/// WHY: The error is logged by the worker instead of filing an empty sidecar
#[test]
fn given_missing_buffer_file_when_filing_then_filing_failed() {
    // Given
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("gone.mp4");

    // When
    let result = file_job(&dir.path().join("videos"), &job(&missing, "Lost"));

    // Then
    assert!(matches!(result, Err(AppError::FilingFailed { .. })));
    assert!(!dir.path().join("videos").join("Lost.json").exists());
}

/// WHAT: Characters invalid in file names are replaced
/// WHY: Activity names come from game data and may contain anything
#[test]
fn given_unsafe_name_when_sanitizing_then_replaced() {
    // Given/When/Then
    assert_eq!(sanitize_file_name("Mythic: Boss/Phase 2?"), "Mythic_ Boss_Phase 2_");
    assert_eq!(sanitize_file_name("   "), "recording");
}

/// WHAT: Queued jobs are filed before the worker exits on close
/// WHY: Shutdown must not lose a recording that was already queued
#[tokio::test]
async fn given_queued_job_when_closing_then_filed_and_worker_stops() {
    // Given: A queue with one job
    let dir = TempDir::new().unwrap();
    let segment = dir.path().join("segment.mp4");
    fs::write(&segment, b"").unwrap();
    let storage = dir.path().join("videos");
    let (queue, worker) = VideoQueue::spawn(storage.clone());
    queue.queue_video(job(&segment, "Queued"));

    // When: Waiting for it and closing
    queue.wait_idle().await;
    queue.close();
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();

    // Then: Filed
    assert!(storage.join("Queued.mp4").exists());
}

/// WHAT: Jobs queued after close are dropped
/// WHY: The worker is gone once the application shuts down
#[tokio::test]
async fn given_closed_queue_when_queueing_then_dropped() {
    // Given: A closed queue
    let dir = TempDir::new().unwrap();
    let segment = dir.path().join("segment.mp4");
    fs::write(&segment, b"").unwrap();
    let storage = dir.path().join("videos");
    let (queue, worker) = VideoQueue::spawn(storage.clone());
    queue.close();

    // When: Queueing
    queue.queue_video(job(&segment, "Late"));
    worker.await.unwrap();

    // Then: Nothing filed, nothing pending
    queue.wait_idle().await;
    assert!(!storage.join("Late.mp4").exists());
}
