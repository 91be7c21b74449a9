use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error returned when an activity cannot describe itself.
pub type MetadataError = Box<dyn std::error::Error + Send + Sync>;

/// A logically bounded event worth keeping, supplied by the detector.
pub trait Activity: Send + Sync {
    /// Wall-clock time the activity began.
    fn start_date(&self) -> DateTime<Utc>;

    /// Extra recording time after the activity ends.
    fn overrun(&self) -> Duration;

    /// Describe the activity. Fails when the detector never saw enough of it
    /// to identify it.
    fn metadata(&self) -> Result<Metadata, MetadataError>;

    /// File name, without extension, for the finished recording.
    fn file_name(&self) -> String;
}

/// Description of a finished activity, stored next to its recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Kind of activity, e.g. "Raids" or "Arena".
    pub category: String,
    /// Length of the activity in seconds.
    pub duration_secs: f64,
    /// Whether the activity succeeded.
    pub result: bool,
    /// Detector specific fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Metadata {
    /// Metadata with no extra fields.
    pub fn new(category: impl Into<String>, duration_secs: f64, result: bool) -> Self {
        Self {
            category: category.into(),
            duration_secs,
            result,
            extra: serde_json::Map::new(),
        }
    }
}
