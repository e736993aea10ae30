//! # portsweep - Concurrent TCP Connect Port Scanner
//!
//! portsweep probes every port of a range on a list of hosts with plain TCP
//! connects and reports, per host, which ports accepted a connection.
//!
//! ## Features
//!
//! - **Bounded concurrency**: a fixed pool of workers fed by a bounded queue
//! - **Retries**: up to N sequential attempts per port, each with its own timeout
//! - **Rate limiting**: optional global token bucket shared by all workers
//! - **Cancellation**: Ctrl-C or a deadline stops every worker promptly
//! - **Deterministic reports**: ports sorted per host, hosts in input order
//! - **Flexible targeting**: IPs, hostnames, CIDR ranges and host files
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portsweep::scanner::{ScanConfig, Scanner};
//! use portsweep::types::{HostList, PortRange};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hosts = HostList::from_targets(["192.168.1.1"])?;
//!     let config = ScanConfig::new(hosts, PortRange::new(1, 1024)?)
//!         .with_timeout(Duration::from_millis(500))
//!         .with_retries(2);
//!
//!     for summary in Scanner::new(config).run(CancellationToken::new()).await? {
//!         println!("{}: {:?}", summary.host, summary.open_ports);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, port ranges and target lists
//! - [`scanner`] - Enumerator, rate limiter, probe, worker pool and collector
//! - [`config`] - Settings file handling
//! - [`error`] - Error types
//! - [`output`] - Output formatting and the results log

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::{Cancelled, ConfigError, LogWriteError, ProbeError};
pub use scanner::{
    CancelController, PortState, RunSummary, ScanConfig, ScanHandle, ScanOutcome, Scanner,
};
pub use types::{HostList, Port, PortRange, TargetSpec};
