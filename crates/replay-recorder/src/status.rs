use replay_recorder_core::{RecStatus, StatusReporter};

use tokio::sync::watch;
use tracing::info;

/// Logs recorder status changes and republishes them on a watch channel.
pub struct StatusLog {
    tx: watch::Sender<RecStatus>,
}

impl StatusLog {
    /// Reporter starting in [`RecStatus::WaitingForHost`].
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RecStatus::WaitingForHost);
        Self { tx }
    }

    /// Receiver observing every published status.
    pub fn subscribe(&self) -> watch::Receiver<RecStatus> {
        self.tx.subscribe()
    }
}

impl StatusReporter for StatusLog {
    fn update(&self, status: RecStatus) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });

        if changed {
            info!(status = ?status, "Recorder status changed");
        }
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new()
    }
}
