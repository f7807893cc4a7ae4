use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::xdp_config::CompileSettings;
use crate::utils::get_data_dir;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Process-wide settings for compiling and sweeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interface written to the compiled document header
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Engine config reload interval in seconds
    #[serde(default = "default_update_time")]
    pub update_time: u32,
    /// Expiration sweep period, written as a duration string (default: "2s")
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Rule store location; the XDG data directory when unset
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            update_time: default_update_time(),
            sweep_interval: default_sweep_interval(),
            store_path: None,
        }
    }
}

fn default_interface() -> String {
    "eth0".to_string()
}

fn default_update_time() -> u32 {
    15
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_PERIOD
}

pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(2);

impl AppConfig {
    pub fn compile_settings(&self) -> CompileSettings {
        CompileSettings {
            interface: self.interface.clone(),
            update_time: self.update_time,
        }
    }

    /// Sweep period for the expiration sweeper.
    ///
    /// `tokio::time::interval` rejects a zero period, so zero falls back to
    /// the default.
    pub fn sweep_period(&self) -> Duration {
        if self.sweep_interval.is_zero() {
            tracing::warn!("sweep_interval must be positive, using default");
            DEFAULT_SWEEP_PERIOD
        } else {
            self.sweep_interval
        }
    }
}

/// Default config file location in the data directory
pub fn default_config_path() -> Option<PathBuf> {
    get_data_dir().map(|mut path| {
        path.push(CONFIG_FILE_NAME);
        path
    })
}

/// Loads the app config from `path` (or the default location), falling back
/// to defaults if the file is missing or unreadable.
pub async fn load_config(path: Option<&Path>) -> AppConfig {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return AppConfig::default(),
        },
    };

    let json = match tokio::fs::read_to_string(&path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AppConfig::default(),
        Err(e) => {
            tracing::warn!("Cannot read config {}: {e}, using defaults", path.display());
            return AppConfig::default();
        }
    };

    match serde_json::from_str::<AppConfig>(&json) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Invalid config {}: {e}, using defaults", path.display());
            AppConfig::default()
        }
    }
}
