use crate::recorder::Metadata;

use std::path::PathBuf;

use serde::Serialize;

/// A finished buffer file ready to be trimmed and filed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJob {
    /// Buffer file containing the activity.
    pub buffer_file: PathBuf,
    /// Activity description.
    pub metadata: Metadata,
    /// Output file name chosen by the activity.
    pub file_name: String,
    /// Where the activity starts inside `buffer_file`, in seconds.
    pub start_offset_secs: f64,
}

/// Receives finished recordings.
///
/// Implementations queue the job and return promptly; failures are theirs to
/// report.
pub trait PostProcessor: Send + Sync {
    /// Hand over a finished recording.
    fn queue_video(&self, job: VideoJob);
}
