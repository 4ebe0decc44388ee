//! Configuration management for SimpleEQ
//!
//! This module provides:
//! - `EqConfig`: audio settings plus initial EQ settings, stored as TOML
//! - `ConfigManager`: loads the user config, creating or recovering it
//! - `ConfigWatcher`: hot-reload notifications via a file system watcher

use crate::domain::audio::{ChannelCount, SampleRate, StreamConfig};
use crate::domain::params::{ChainSettings, ParamId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Sample rates a config may request
pub const SUPPORTED_SAMPLE_RATES: [u32; 5] = [44100, 48000, 88200, 96000, 192000];

/// Largest block size a config may request
pub const MAX_BLOCK_SIZE: u32 = 8192;

/// Audio stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Block size in frames
    pub block_size: u32,

    /// Output device name (None = use default output)
    pub output_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            output_device: None,
        }
    }
}

impl AudioConfig {
    /// Stereo stream configuration matching these settings
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            sample_rate: SampleRate::from_hz(self.sample_rate),
            channels: ChannelCount::Stereo,
            buffer_size: self.block_size,
        }
    }
}

/// Complete SimpleEQ configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EqConfig {
    #[serde(default)]
    pub audio: AudioConfig,

    /// Initial EQ settings written into the parameter store on startup
    #[serde(default)]
    pub eq: ChainSettings,
}

impl EqConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values a parameter store would otherwise silently clamp
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.audio.sample_rate) {
            return Err(ConfigError::Invalid(format!(
                "unsupported sample rate {} Hz (expected one of {:?})",
                self.audio.sample_rate, SUPPORTED_SAMPLE_RATES
            )));
        }

        if self.audio.block_size == 0 || self.audio.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "block size must be in 1..={} (got {})",
                MAX_BLOCK_SIZE, self.audio.block_size
            )));
        }

        let eq = &self.eq;
        let floats = [
            (ParamId::LowCutFreq, eq.low_cut_freq),
            (ParamId::HighCutFreq, eq.high_cut_freq),
            (ParamId::PeakFreq, eq.peak_freq),
            (ParamId::PeakGain, eq.peak_gain_db),
            (ParamId::PeakQuality, eq.peak_quality),
        ];
        for (id, value) in floats {
            let in_range = id.range().map(|r| r.contains(value)).unwrap_or(true);
            if !in_range {
                return Err(ConfigError::Invalid(format!(
                    "{} = {} is outside its range",
                    id.id(),
                    value
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&contents)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }
}

/// File system watcher for hot-reload
///
/// Broadcasts the path of every created or modified `.toml` file under the
/// watched directory.
pub struct ConfigWatcher {
    _watcher: notify::RecommendedWatcher,
    config_tx: broadcast::Sender<PathBuf>,
}

impl ConfigWatcher {
    pub async fn new(config_dir: PathBuf) -> Result<Self> {
        use notify::Watcher;

        let (config_tx, _config_rx) = broadcast::channel(32);

        fs::create_dir_all(&config_dir).await?;

        let tx_clone = config_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    notify::EventKind::Create(_) | notify::EventKind::Modify(_)
                ) {
                    for path in event.paths {
                        if path.extension().and_then(|e| e.to_str()) == Some("toml") {
                            // No subscribers yet is not an error
                            if tx_clone.receiver_count() > 0 {
                                if let Err(e) = tx_clone.send(path) {
                                    error!("Failed to send config change event: {}", e);
                                }
                            }
                        }
                    }
                }
            }
        })?;

        watcher.watch(&config_dir, notify::RecursiveMode::NonRecursive)?;

        info!(path = %config_dir.display(), "Config watcher started");

        Ok(Self {
            _watcher: watcher,
            config_tx,
        })
    }

    /// Subscribe to config change events
    pub fn subscribe(&self) -> broadcast::Receiver<PathBuf> {
        self.config_tx.subscribe()
    }
}

/// Manager for the user config at `<config dir>/simpleeq/config.toml`
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.toml");
        Self {
            config_dir,
            config_path,
        }
    }

    /// Get the default config directory path
    ///
    /// `~/.config/simpleeq` on Linux, the platform equivalent elsewhere.
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("simpleeq"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file
    ///
    /// A missing file is created with the factory default. A corrupt or
    /// invalid file is copied to `config.toml.corrupt` and the factory
    /// default is returned.
    #[instrument(skip(self))]
    pub async fn load(&self) -> EqConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, creating factory default"
            );

            let config = EqConfig::default();
            if let Err(e) = self.save(&config).await {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to save factory default config"
                );
            }
            return config;
        }

        match EqConfig::load_from_file(&self.config_path).await {
            Ok(config) => {
                info!(path = %self.config_path.display(), "Configuration loaded");
                config
            }
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using factory default"
                );

                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                EqConfig::default()
            }
        }
    }

    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &EqConfig) -> Result<()> {
        config.validate()?;
        fs::create_dir_all(&self.config_dir).await?;
        config.save_to_file(&self.config_path).await
    }

    /// Delete the config file if present
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if self.config_path.exists() {
            fs::remove_file(&self.config_path).await?;
            info!(path = %self.config_path.display(), "Configuration cleared");
        }
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}
