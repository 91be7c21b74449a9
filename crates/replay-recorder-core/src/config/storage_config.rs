use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where recordings live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Scratch directory for the rolling buffer. Pruned aggressively.
    pub buffer_path: PathBuf,

    /// Final location of processed recordings.
    pub storage_path: PathBuf,
}
