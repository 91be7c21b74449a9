use crate::{AppCommand, AppResult, ManualActivity, StatusLog, VideoQueue, config::Config};

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use replay_recorder_core::{CaptureEngine, PostProcessor, RecStatus, Recorder};
use tokio::{
    sync::{mpsc, watch},
    task::{JoinHandle, JoinSet},
};
use tracing::{error, info, instrument, warn};

const FILING_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Main application state.
///
/// Owns the recorder and maps commands onto it. Stops run on their own
/// tasks so the overrun does not hold up the command loop; the recorder
/// serializes them against the next start.
pub struct App {
    pub(crate) recorder: Recorder,
    pub(crate) config: Config,
    pub(crate) video_queue: Arc<VideoQueue>,
    pub(crate) filing_worker: Option<JoinHandle<()>>,
    pub(crate) status_rx: watch::Receiver<RecStatus>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) activity: Option<ManualActivity>,
    pub(crate) pending_stops: JoinSet<()>,
    pub(crate) host_running: bool,
}

impl App {
    /// Build the recorder around `engine` and bring it up with `config`.
    ///
    /// Engine bring-up failures are fatal. An invalid configuration is only
    /// logged so it can be fixed and reloaded.
    #[instrument(skip_all)]
    pub(crate) fn new(
        config: Config,
        engine: impl CaptureEngine + 'static,
        command_rx: mpsc::Receiver<AppCommand>,
        shutdown_tx: watch::Sender<bool>,
    ) -> AppResult<Self> {
        let status = Arc::new(StatusLog::new());
        let status_rx = status.subscribe();
        let (video_queue, filing_worker) =
            VideoQueue::spawn(config.recorder.storage.storage_path.clone());
        let video_queue = Arc::new(video_queue);

        let post_processor: Arc<dyn PostProcessor> = video_queue.clone();
        let recorder = Recorder::new(engine, status, post_processor);
        recorder.initialize()?;

        if let Err(e) = recorder.configure(&config.recorder) {
            error!(error = ?e, "Recorder not configured, fix the config and reload");
        }

        Ok(Self {
            recorder,
            config,
            video_queue,
            filing_worker: Some(filing_worker),
            status_rx,
            command_rx,
            shutdown_tx,
            activity: None,
            pending_stops: JoinSet::new(),
            host_running: false,
        })
    }

    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Replay-Recorder starting");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                AppCommand::HostOpen => {
                    if let Err(e) = self.host_open().await {
                        error!(error = ?e, "Failed to start buffering");
                    }
                }
                AppCommand::HostClose => {
                    if let Err(e) = self.host_close().await {
                        error!(error = ?e, "Failed to stop buffering");
                    }
                }
                AppCommand::Start { category, overrun } => {
                    self.start_activity(category, overrun).await;
                }
                AppCommand::Stop { discard } => {
                    if let Err(e) = self.stop_activity(discard).await {
                        error!(error = ?e, "Failed to stop activity");
                    }
                }
                AppCommand::ForceStop => {
                    self.activity = None;
                    if let Err(e) = self.recorder.force_stop().await {
                        error!(error = ?e, "Failed to force stop");
                    }
                }
                AppCommand::Reload => {
                    if let Err(e) = self.reload().await {
                        error!(error = ?e, "Failed to reload configuration");
                    }
                }
                AppCommand::Encoders => self.log_encoders(),
                AppCommand::Devices => self.log_devices(),
                AppCommand::Status => self.log_status(),
                AppCommand::Shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        let _ = self.shutdown_tx.send(true);
        self.shutdown().await;
        info!("Replay-Recorder shut down successfully");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn host_open(&mut self) -> AppResult<()> {
        if self.host_running {
            warn!("Host already running");
            return Ok(());
        }

        self.recorder.add_audio_sources()?;
        self.recorder.start_buffer().await?;
        self.host_running = true;

        info!("Host opened, buffer rolling");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn host_close(&mut self) -> AppResult<()> {
        if !self.host_running {
            return Ok(());
        }
        self.host_running = false;

        if let Some(mut activity) = self.activity.take() {
            activity.finish(Utc::now());
            if let Err(e) = self.recorder.stop(&activity, true).await {
                error!(error = ?e, "Failed to finish activity on host close");
            }
        }
        self.drain_stops().await;
        self.video_queue.wait_idle().await;

        self.recorder.stop_buffer().await?;
        self.recorder.remove_audio_sources();

        info!("Host closed, buffer stopped");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn start_activity(&mut self, category: String, overrun: Option<Duration>) {
        let overrun = overrun.unwrap_or(Duration::from_secs(
            self.config.behaviour.default_overrun_secs,
        ));
        let activity = ManualActivity::new(category, Utc::now(), overrun);

        if self.recorder.start(&activity).await {
            info!(category = %activity.category(), "Activity recording");
            self.activity = Some(activity);
        } else {
            warn!(category = %activity.category(), "Activity not recorded, buffer not rolling");
        }
    }

    #[instrument(skip(self))]
    async fn stop_activity(&mut self, discard: bool) -> AppResult<()> {
        let Some(mut activity) = self.activity.take() else {
            warn!("No activity in progress");
            return Ok(());
        };

        if discard {
            info!(category = %activity.category(), "Discarding activity");
            self.recorder.force_stop().await?;
            return Ok(());
        }

        activity.finish(Utc::now());
        let recorder = self.recorder.clone();
        while self.pending_stops.try_join_next().is_some() {}
        self.pending_stops.spawn(async move {
            if let Err(e) = recorder.stop(&activity, false).await {
                error!(category = %activity.category(), error = ?e, "Failed to stop activity");
            }
        });

        Ok(())
    }

    #[instrument(skip(self))]
    async fn reload(&mut self) -> AppResult<()> {
        if self.activity.is_some() {
            warn!("Finish the current activity before reloading");
            return Ok(());
        }

        let config = Config::load()?;
        self.drain_stops().await;
        self.video_queue.wait_idle().await;
        self.recorder.reconfigure(&config.recorder).await?;
        self.video_queue
            .set_storage_dir(config.recorder.storage.storage_path.clone());
        self.config = config;

        if self.host_running {
            self.host_running = false;
            self.host_open().await?;
        }

        info!("Configuration reloaded");
        Ok(())
    }

    fn log_encoders(&self) {
        match self.recorder.available_encoders() {
            Ok(encoders) => info!(encoders = ?encoders, "Available encoders"),
            Err(e) => error!(error = ?e, "Failed to list encoders"),
        }
    }

    fn log_devices(&self) {
        match self.recorder.input_audio_devices() {
            Ok(devices) => {
                for device in devices {
                    info!(id = %device.id, description = %device.description, "Input device");
                }
            }
            Err(e) => error!(error = ?e, "Failed to list input devices"),
        }
        match self.recorder.output_audio_devices() {
            Ok(devices) => {
                for device in devices {
                    info!(id = %device.id, description = %device.description, "Output device");
                }
            }
            Err(e) => error!(error = ?e, "Failed to list output devices"),
        }
    }

    fn log_status(&self) {
        info!(
            status = ?*self.status_rx.borrow(),
            engine_state = ?self.recorder.engine_state(),
            recording = self.recorder.is_recording(),
            host_running = self.host_running,
            "Status"
        );
    }

    async fn drain_stops(&mut self) {
        while let Some(result) = self.pending_stops.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Stop task panicked");
            }
        }
    }

    #[instrument(skip(self))]
    async fn shutdown(&mut self) {
        if let Err(e) = self.host_close().await {
            error!(error = ?e, "Failed to stop buffering on shutdown");
        }
        self.drain_stops().await;

        if let Err(e) = self.recorder.shutdown() {
            error!(error = ?e, "Engine shutdown failed");
        }

        self.video_queue.close();
        if let Some(worker) = self.filing_worker.take() {
            match tokio::time::timeout(FILING_DRAIN_TIMEOUT, worker).await {
                Ok(Ok(())) => info!("Filing worker stopped cleanly"),
                Ok(Err(e)) => error!(error = ?e, "Filing worker panicked"),
                Err(_) => warn!("Filing worker did not finish within timeout"),
            }
        }
    }
}
