//! Application settings and paths.
//!
//! Settings live in a JSON file under the XDG config directory and supply
//! defaults that command-line flags override.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{RateLimit, ScanConfig};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portsweep)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the XDG directories. Nothing is created.
    pub fn new() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "portsweep", "portsweep")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default number of workers.
    pub concurrency: usize,
    /// Default per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Default attempts per port.
    pub retries: u32,
    /// Connection attempts per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Token bucket capacity, 0 to match the rate.
    pub burst: u32,
    /// Capacity of the work and result queues.
    pub queue_capacity: usize,
    /// Only report hosts with open ports.
    pub quiet: bool,
    /// Append open ports to this file.
    pub log_file: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            concurrency: ScanConfig::DEFAULT_CONCURRENCY,
            timeout_ms: ScanConfig::DEFAULT_TIMEOUT.as_millis() as u64,
            retries: 1,
            rate_limit: 0,
            burst: 0,
            queue_capacity: ScanConfig::DEFAULT_QUEUE_CAPACITY,
            quiet: false,
            log_file: None,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::new()?.settings_file();

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured rate limit, if any.
    pub fn rate_limit(&self) -> Option<RateLimit> {
        let rate = NonZeroU32::new(self.rate_limit)?;
        let burst = NonZeroU32::new(self.burst).unwrap_or(rate);
        Some(RateLimit::per_second(rate).with_burst(burst))
    }
}
