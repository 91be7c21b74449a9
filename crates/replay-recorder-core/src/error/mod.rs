use crate::signals::SignalQueue;

use std::{panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use thiserror::Error;

/// Recorder errors with source location tracking.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Capture engine process bring-up failed.
    #[error("Engine initialization failed: {reason} {location}")]
    EngineInitFailed {
        /// Description of the bring-up failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Operation requires an initialized engine session.
    #[error("Engine not initialized {location}")]
    NotInitialized {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Operation requires a configured engine session.
    #[error("Engine not configured {location}")]
    NotConfigured {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Configuration is missing or inconsistent.
    #[error("Invalid configuration: {reason} {location}")]
    InvalidConfig {
        /// Description of the invalid setting.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The engine did not confirm a state change in time.
    #[error("Timed out waiting for {queue} signal {location}")]
    SignalTimeout {
        /// Queue that was being awaited.
        queue: SignalQueue,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An engine call failed.
    #[error("Engine error: {reason} {location}")]
    Engine {
        /// Description of the engine failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Output channel outside the range the engine accepts.
    #[error("Invalid output channel {channel} {location}")]
    InvalidChannel {
        /// Rejected channel number.
        channel: u32,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A scene source required by the operation does not exist.
    #[error("Source missing: {name} {location}")]
    SourceMissing {
        /// Name of the missing source.
        name: &'static str,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The engine produced no output file for a finished recording.
    #[error("No output file available from engine {location}")]
    MissingOutputFile {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Filesystem operation on the buffer directory failed.
    #[error("IO error on {path:?}: {source} {location}")]
    Io {
        /// Path being operated on.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl RecorderError {
    /// Wrap an engine failure message.
    #[track_caller]
    pub fn engine(reason: impl Into<String>) -> Self {
        RecorderError::Engine {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Wrap an IO failure on `path`.
    #[track_caller]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecorderError::Io {
            path: path.into(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`RecorderError`].
pub type Result<T> = std::result::Result<T, RecorderError>;
