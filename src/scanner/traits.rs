//! Scan outcome types and the connector abstraction.
//!
//! `Connector` is the seam between the probe logic and the network, so the
//! retry and timeout rules can be exercised without real sockets.

use crate::error::ProbeError;
use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Classification of a probed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    /// A connection was established.
    Open,
    /// Every attempt failed: refused, timed out or unreachable alike.
    Closed,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Result of probing a single port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// The port that was probed.
    pub port: Port,
    /// State determined by the probe.
    pub state: PortState,
    /// Last failure description when closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ScanOutcome {
    pub fn open(port: Port) -> Self {
        Self {
            port,
            state: PortState::Open,
            reason: None,
        }
    }

    pub fn closed(port: Port, reason: impl Into<String>) -> Self {
        Self {
            port,
            state: PortState::Closed,
            reason: Some(reason.into()),
        }
    }

    /// Check if the port is open.
    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}

/// A single connection attempt against `host:port`.
///
/// Implementations report success once a connection is established and
/// release it before returning. The caller bounds each attempt with its own
/// timeout, so implementations need not.
///
/// # Example
///
/// ```ignore
/// use portsweep::scanner::{Connector, TcpConnector};
///
/// let connector = TcpConnector;
/// connector.connect("127.0.0.1", port).await?;
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &str, port: Port) -> Result<(), ProbeError>;
}

/// A shared connector for dynamic dispatch across workers.
pub type SharedConnector = Arc<dyn Connector>;
