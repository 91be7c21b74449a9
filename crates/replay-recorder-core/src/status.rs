use serde::{Deserialize, Serialize};

/// Recorder status pushed to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecStatus {
    /// Buffer is rolling, an activity can be captured.
    ReadyToRecord,
    /// An activity is being captured.
    Recording,
    /// Engine is idle until the host application appears.
    WaitingForHost,
}

/// Receives status updates on every engine state transition.
///
/// Called from the engine's callback thread, so implementations must not
/// block.
pub trait StatusReporter: Send + Sync {
    /// Publish a new status.
    fn update(&self, status: RecStatus);
}
