use crate::signals::SignalKind;

use serde::{Deserialize, Serialize};

/// State of the engine's recording output, as reported by its signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Not recording.
    #[default]
    Offline,
    /// Start requested, waiting for the output to come up.
    Starting,
    /// Output is writing a file.
    Recording,
    /// Stop requested, waiting for the output to close.
    Stopping,
}

impl EngineState {
    /// State the engine enters on `kind`, or `None` if the signal does not
    /// change state.
    pub fn on_signal(kind: SignalKind) -> Option<Self> {
        match kind {
            SignalKind::Starting => Some(Self::Starting),
            SignalKind::Start => Some(Self::Recording),
            SignalKind::Stopping => Some(Self::Stopping),
            SignalKind::Stop => Some(Self::Offline),
            SignalKind::Wrote | SignalKind::Other => None,
        }
    }

    /// Whether `next` is the single legal successor of `self`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Offline, Self::Starting)
                | (Self::Starting, Self::Recording)
                | (Self::Recording, Self::Stopping)
                | (Self::Stopping, Self::Offline)
        )
    }
}
