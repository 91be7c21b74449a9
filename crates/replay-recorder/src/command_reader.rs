//! Line-oriented command input.
//!
//! Stands in for the activity detector, the host process poller and the
//! settings UI. Each line is one command:
//!
//! ```text
//! host-open | host-close
//! start <category> [overrun_secs]
//! stop [discard] | force-stop
//! reload | encoders | devices | status | quit
//! ```

use crate::{AppCommand, AppError, AppResult};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::{mpsc, watch},
};
use tracing::{debug, info, instrument, warn};

/// Reads commands from a line source and forwards them to the app.
pub struct CommandReader<R> {
    reader: R,
    command_tx: mpsc::Sender<AppCommand>,
}

impl<R: AsyncBufRead + Unpin> CommandReader<R> {
    /// Reader forwarding parsed commands to `command_tx`.
    pub fn new(reader: R, command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { reader, command_tx }
    }

    /// Run until shutdown or end of input.
    ///
    /// End of input is treated as a shutdown request. Lines that fail to
    /// parse are logged and skipped.
    #[instrument(skip_all)]
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        let mut lines = self.reader.lines();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Command reader shutting down");
                    break;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("Command input closed");
                        Self::send(&self.command_tx, AppCommand::Shutdown).await?;
                        break;
                    };

                    match parse_command(&line) {
                        Ok(Some(command)) => {
                            debug!(command = ?command, "Command received");
                            let quit = command == AppCommand::Shutdown;
                            Self::send(&self.command_tx, command).await?;
                            if quit {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "Ignoring command"),
                    }
                }
            }
        }

        Ok(())
    }

    async fn send(command_tx: &mpsc::Sender<AppCommand>, command: AppCommand) -> AppResult<()> {
        command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
#[track_caller]
pub fn parse_command(line: &str) -> AppResult<Option<AppCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let invalid = |reason: &str| AppError::CommandParse {
        input: line.to_string(),
        reason: reason.to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match (verb.as_str(), args.as_slice()) {
        ("host-open", []) => AppCommand::HostOpen,
        ("host-close", []) => AppCommand::HostClose,
        ("start", [category]) => AppCommand::Start {
            category: category.to_string(),
            overrun: None,
        },
        ("start", [category, overrun]) => {
            let secs: u64 = overrun
                .parse()
                .map_err(|_| invalid("overrun must be whole seconds"))?;
            AppCommand::Start {
                category: category.to_string(),
                overrun: Some(Duration::from_secs(secs)),
            }
        }
        ("start", _) => return Err(invalid("usage: start <category> [overrun_secs]")),
        ("stop", []) => AppCommand::Stop { discard: false },
        ("stop", ["discard"]) => AppCommand::Stop { discard: true },
        ("force-stop", []) => AppCommand::ForceStop,
        ("reload", []) => AppCommand::Reload,
        ("encoders", []) => AppCommand::Encoders,
        ("devices", []) => AppCommand::Devices,
        ("status", []) => AppCommand::Status,
        ("quit" | "exit", []) => AppCommand::Shutdown,
        (
            "host-open" | "host-close" | "stop" | "force-stop" | "reload" | "encoders"
            | "devices" | "status" | "quit" | "exit",
            _,
        ) => return Err(invalid("unexpected arguments")),
        _ => return Err(invalid("unknown command")),
    };

    Ok(Some(command))
}
