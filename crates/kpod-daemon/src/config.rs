//! Daemon configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use kpod_core::EncoderScale;
use kpod_rig::{DEFAULT_PORT, DEFAULT_SERVER};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::controller::DeviceSettings;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// rigctld connection settings
    #[serde(default)]
    pub rig: RigConfig,
    /// Device settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Frequency announcement settings
    #[serde(default)]
    pub announce: AnnounceConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
    /// Delay between device polls in milliseconds
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            update_interval_ms: default_update_interval_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_update_interval_ms() -> u64 {
    5
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// rigctld connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// Host running rigctld
    #[serde(default = "default_server")]
    pub server: String,
    /// rigctld TCP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in milliseconds (no timeout if unset)
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self { server: default_server(), port: default_port(), read_timeout_ms: None }
    }
}

impl RigConfig {
    /// The configured request timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// hidraw node of the KPod
    pub path: Option<PathBuf>,
    /// Encoder counts per revolution (100 or 200)
    #[serde(default)]
    pub scale: EncoderScale,
    /// Silence the encoder clicks
    #[serde(default = "default_true")]
    pub mute: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { path: None, scale: EncoderScale::default(), mute: true }
    }
}

impl From<&DeviceConfig> for DeviceSettings {
    fn from(config: &DeviceConfig) -> Self {
        Self { scale: config.scale, mute: config.mute }
    }
}

fn default_true() -> bool {
    true
}

/// Frequency announcement settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnnounceConfig {
    /// Program and arguments; the frequency text is appended as the last
    /// argument. Announcements are only logged when empty.
    #[serde(default)]
    pub command: Vec<String>,
}

impl Config {
    /// Delay between device polls.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.daemon.update_interval_ms)
    }

    /// Check values serde cannot.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.daemon.update_interval_ms == 0 {
            bail!("update_interval_ms must be at least 1");
        }
        if self.rig.read_timeout_ms == Some(0) {
            bail!("read_timeout_ms must be at least 1");
        }
        Ok(())
    }
}

/// Load configuration from `explicit`, or from the default location.
///
/// An explicitly named file must exist. A missing default file yields the
/// default configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_path()?;
            if !path.exists() {
                info!(?path, "Config file not found, using defaults");
                return Ok(Config::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {config_path:?}"))?;
    info!(?config_path, "Configuration loaded");
    Ok(config)
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("org", "kpod", "kpod")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
