//! Rolling buffer: periodic segment restarts and directory pruning.

mod controller;
mod pruning;

pub use {
    controller::{BufferController, RESTART_INTERVAL},
    pruning::prune_buffer_dir,
};
