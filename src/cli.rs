//! Command-line interface definitions for portsweep.
//!
//! Uses `clap` derive macros for declarative argument parsing. Flags left
//! unset fall back to the settings file.

use crate::config::AppSettings;
use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{RateLimit, ScanConfig};
use crate::types::{HostList, PortRange};
use clap::{Parser, ValueEnum};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

/// A concurrent TCP connect port scanner.
#[derive(Parser, Debug)]
#[command(name = "portsweep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Concurrent TCP connect port scanner", long_about = None)]
pub struct Args {
    /// Targets to scan (IP, hostname, or CIDR notation)
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Read targets from a file, one per line
    #[arg(short = 'i', long = "input-file", value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Port range to scan (e.g., "80" or "1-1024")
    #[arg(short, long, default_value = "1-1024")]
    pub ports: String,

    /// Per-attempt connection timeout in seconds (fractions allowed)
    #[arg(short = 't', long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub timeout: Option<Duration>,

    /// Connection attempts per port
    #[arg(short = 'r', long)]
    pub retries: Option<u32>,

    /// Number of concurrent workers
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Global limit on connection attempts per second
    #[arg(long = "rate", value_name = "PER_SECOND")]
    pub rate_limit: Option<u32>,

    /// Burst size for the rate limit (defaults to the rate)
    #[arg(long, requires = "rate_limit")]
    pub burst: Option<u32>,

    /// Cancel the scan after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub deadline: Option<Duration>,

    /// Only display hosts with open ports
    #[arg(short, long)]
    pub quiet: bool,

    /// Append open ports per host to this file
    #[arg(short = 'l', long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Include closed ports and failure reasons in results
    #[arg(long)]
    pub show_closed: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Load settings from `--config` or the default location.
    pub fn settings(&self) -> ConfigResult<AppSettings> {
        match &self.config {
            Some(path) => AppSettings::load_from(path),
            None => AppSettings::load(),
        }
    }

    /// Collect hosts from positional targets, then the input file.
    pub fn hosts(&self) -> ConfigResult<HostList> {
        let mut hosts = HostList::from_targets(&self.targets)?;
        if let Some(path) = &self.input_file {
            let from_file = HostList::from_file(path)?;
            hosts.extend(from_file.iter().cloned());
        }
        Ok(hosts)
    }

    /// Combine flags with settings into a validated scan configuration.
    pub fn scan_config(&self, settings: &AppSettings) -> ConfigResult<ScanConfig> {
        let hosts = self.hosts()?;
        let ports: PortRange = self.ports.parse()?;

        let rate_limit = match self.rate_limit {
            Some(rate) => {
                let rate = NonZeroU32::new(rate).ok_or_else(|| ConfigError::InvalidValue {
                    field: "rate",
                    reason: "must be at least 1".to_string(),
                })?;
                let burst = match self.burst {
                    Some(burst) => NonZeroU32::new(burst).ok_or_else(|| ConfigError::InvalidValue {
                        field: "burst",
                        reason: "must be at least 1".to_string(),
                    })?,
                    None => rate,
                };
                Some(RateLimit::per_second(rate).with_burst(burst))
            }
            None => settings.rate_limit(),
        };

        let mut config = ScanConfig::new(hosts, ports)
            .with_timeout(self.timeout.unwrap_or_else(|| settings.timeout()))
            .with_retries(self.retries.unwrap_or(settings.retries))
            .with_concurrency(self.concurrency.unwrap_or(settings.concurrency))
            .with_rate_limit(rate_limit)
            .with_queue_capacity(settings.queue_capacity);

        if self.show_closed {
            config = config.with_closed();
        }
        if self.quiet || settings.quiet {
            config = config.with_quiet();
        }

        config.validate()?;
        Ok(config)
    }

    /// Whether to draw the progress bar. Quiet mode only filters hosts.
    pub fn show_progress(&self) -> bool {
        self.output == OutputFormat::Plain && !self.no_progress
    }

    /// The log file from the flag, else from settings.
    pub fn log_file(&self, settings: &AppSettings) -> Option<PathBuf> {
        self.log_file.clone().or_else(|| settings.log_file.clone())
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// One JSON object per host
    Json,
    /// CSV format for data analysis
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a positive number of seconds, e.g. `1` or `0.25`.
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid number of seconds: {}", s))?;
    if secs <= 0.0 {
        return Err("must be greater than zero".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}
