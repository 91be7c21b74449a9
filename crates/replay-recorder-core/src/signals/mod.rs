//! Engine output signals and the per-kind queues callers wait on.

mod engine_state;
mod signal;
mod synchronizer;

pub use {
    engine_state::EngineState,
    signal::{OutputSignal, SignalKind, SignalQueue, Subsystem},
    synchronizer::{SIGNAL_TIMEOUT, SignalSink, SignalSynchronizer},
};
