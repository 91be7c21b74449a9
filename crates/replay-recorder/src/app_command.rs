use std::time::Duration;

/// Commands sent from the command reader to the main application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// The host application started: attach audio and start the buffer.
    HostOpen,
    /// The host application exited: finish any activity and stop buffering.
    HostClose,
    /// An activity began.
    Start {
        /// Category recorded in the activity metadata.
        category: String,
        /// Extra recording time after the activity ends. Falls back to the
        /// configured default when absent.
        overrun: Option<Duration>,
    },
    /// The current activity ended.
    Stop {
        /// Drop the recording instead of filing it.
        discard: bool,
    },
    /// Abandon the current activity immediately.
    ForceStop,
    /// Reload the config file and rebuild the engine pipeline.
    Reload,
    /// Log the encoders the engine offers.
    Encoders,
    /// Log the audio devices the engine offers.
    Devices,
    /// Log recorder status.
    Status,
    /// Request application shutdown.
    Shutdown,
}
