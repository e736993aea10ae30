//! Error types for portsweep.
//!
//! Uses `thiserror` for ergonomic error definitions.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building a scan configuration.
///
/// All of these surface before any worker starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid port range: start ({start}) > end ({end})")]
    InvalidRange { start: u32, end: u32 },

    #[error("port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u32),

    #[error("no scan targets specified")]
    NoTargets,

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single connection attempt.
///
/// Never escapes the probe: the last one becomes the reason on a closed outcome.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection refused")]
    Refused,

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("connection failed: {0}")]
    Failed(String),
}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match e.kind() {
            ErrorKind::ConnectionRefused => Self::Refused,
            ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
                Self::Unreachable(e.to_string())
            }
            _ => Self::Failed(e.to_string()),
        }
    }
}

/// The run was cancelled while waiting.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("scan cancelled")]
pub struct Cancelled;

/// Appending to the results log failed.
#[derive(Error, Debug)]
#[error("failed to write log file {path}: {source}")]
pub struct LogWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_refused_maps_to_refused() {
        let err: ProbeError = Error::from(ErrorKind::ConnectionRefused).into();
        assert!(matches!(err, ProbeError::Refused));
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn test_unreachable_kinds_map_to_unreachable() {
        for kind in [ErrorKind::HostUnreachable, ErrorKind::NetworkUnreachable] {
            let err: ProbeError = Error::new(kind, "no route to host").into();
            assert!(matches!(err, ProbeError::Unreachable(_)));
        }

        let err: ProbeError = Error::new(ErrorKind::Other, "host unreachable").into();
        assert!(matches!(err, ProbeError::Failed(_)));
    }

    #[test]
    fn test_other_io_error_keeps_message() {
        let err: ProbeError = Error::new(ErrorKind::Other, "no route").into();
        assert_eq!(err.to_string(), "connection failed: no route");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidRange { start: 10, end: 5 };
        assert_eq!(err.to_string(), "invalid port range: start (10) > end (5)");
        assert_eq!(ConfigError::NoTargets.to_string(), "no scan targets specified");
    }
}
