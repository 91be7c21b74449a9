//! Configuration management for replay-recorder.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, lazy validation, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{BehaviourConfig, CONFIG_FILE_NAME},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::Path,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use replay_recorder_core::{RecorderConfig, StorageConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Driver behaviour.
    #[serde(default)]
    pub behaviour: BehaviourConfig,
    /// Everything handed to the recorder.
    pub recorder: RecorderConfig,
}

impl Config {
    /// Load configuration from the platform config directory, creating a
    /// default if not found.
    ///
    /// Note: This does NOT validate the recorder settings. The recorder
    /// validates them in `configure`, so the app can start with device lists
    /// or encoders that still need fixing.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let dirs = Self::project_dirs()?;
        let config_dir = dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config found, creating default");
            let config = Self::with_data_dir(dirs.data_dir());
            config.save_to(&config_path)?;

            warn!(
                buffer_path = ?config.recorder.storage.buffer_path,
                "Default config created. Audio devices must be set before they are recorded."
            );

            Ok(config)
        }
    }

    /// Read and parse a config file.
    #[track_caller]
    #[instrument]
    pub fn load_from(config_path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration loaded");

        Ok(config)
    }

    /// Save configuration using the atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Default configuration keeping buffer and recordings under `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            behaviour: BehaviourConfig::default(),
            recorder: RecorderConfig::with_storage(StorageConfig {
                buffer_path: data_dir.join("buffer"),
                storage_path: data_dir.join("videos"),
            }),
        }
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "replay-recorder", "Replay-Recorder").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get project directories".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }
}
