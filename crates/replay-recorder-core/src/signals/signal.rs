use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine subsystem a signal originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    /// File recording output. The only subsystem the recorder acts on.
    Recording,
    /// Live streaming output.
    Streaming,
    /// Engine-side replay buffer output.
    ReplayBuffer,
}

/// Kind of state change reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Output is starting up.
    Starting,
    /// Output has started writing.
    Start,
    /// Output is shutting down.
    Stopping,
    /// Output has stopped.
    Stop,
    /// Output file has been written and closed.
    Wrote,
    /// Any signal the recorder has no use for (reconnects, activations).
    Other,
}

/// A signal delivered through the engine's callback channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSignal {
    /// Subsystem tag.
    pub subsystem: Subsystem,
    /// What happened.
    pub kind: SignalKind,
    /// Engine status code, zero on success.
    pub code: i32,
    /// Engine-provided error text, if any.
    pub error: Option<String>,
}

impl OutputSignal {
    /// Successful recording-subsystem signal of the given kind.
    pub fn recording(kind: SignalKind) -> Self {
        Self {
            subsystem: Subsystem::Recording,
            kind,
            code: 0,
            error: None,
        }
    }
}

/// The two wait queues the synchronizer maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalQueue {
    /// Receives [`SignalKind::Start`].
    Start,
    /// Receives [`SignalKind::Wrote`].
    Wrote,
}

impl fmt::Display for SignalQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalQueue::Start => f.write_str("start"),
            SignalQueue::Wrote => f.write_str("wrote"),
        }
    }
}
