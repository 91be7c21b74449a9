//! Replay-Recorder: keeps a rolling capture buffer and files the activities
//! announced on standard input.

mod activity;
mod app;
mod app_command;
mod command_reader;
mod config;
mod error;
mod status;
#[cfg(test)]
mod tests;
mod video_queue;

pub(crate) use {
    activity::ManualActivity,
    app::App,
    app_command::AppCommand,
    command_reader::CommandReader,
    error::{AppError, Result as AppResult},
    status::StatusLog,
    video_queue::VideoQueue,
};

use crate::config::Config;

use replay_recorder_core::SimulatedEngine;
use tokio::{
    io::BufReader,
    sync::{mpsc, watch},
};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "replay_recorder=debug,replay_recorder_core=debug";

/// Application entry point.
#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let (command_tx, command_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = match App::new(config, SimulatedEngine::new(), command_rx, shutdown_tx) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start recorder: {:?}", e);
            std::process::exit(1);
        }
    };

    let reader = CommandReader::new(BufReader::new(tokio::io::stdin()), command_tx);

    tokio::join!(
        async {
            if let Err(e) = reader.run(shutdown_rx).await {
                error!(error = ?e, "Command reader error");
            }
        },
        async {
            if let Err(e) = app.run().await {
                error!(error = ?e, "App error");
            }
        }
    );
}
