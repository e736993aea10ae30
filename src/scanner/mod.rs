//! Scanner module - the concurrent scanning engine.
//!
//! A run wires the pieces together:
//!
//! ```text
//! Enumerator -> work queue -> WorkerPool (limit -> probe) -> result channel -> Collector -> summaries
//! ```
//!
//! Every stage observes one `CancellationToken`. Both channels are bounded, so
//! enumeration of very large ranges is throttled by the workers.

pub mod cancel;
mod collector;
pub mod enumerator;
mod pool;
pub mod rate_limiter;
pub mod tcp;
pub mod traits;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{HostList, PortRange};
use futures::stream::{self, Stream};
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use cancel::{CancelController, CancelReason};
pub use collector::RunSummary;
pub use enumerator::{Enumerator, ScanUnit};
pub use rate_limiter::{RateLimit, RateLimiter};
pub use tcp::{Prober, TcpConnector};
pub use traits::{Connector, PortState, ScanOutcome, SharedConnector};

use collector::{Collector, CollectorOptions};
use pool::WorkerPool;

/// Configuration for one scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Hosts in reporting order.
    pub hosts: HostList,
    /// Ports swept on every host.
    pub ports: PortRange,
    /// Budget for each connection attempt.
    pub timeout: Duration,
    /// Maximum attempts per unit.
    pub retries: u32,
    /// Number of workers.
    pub concurrency: usize,
    /// Global attempt rate, unlimited when `None`.
    pub rate_limit: Option<RateLimit>,
    /// Capacity of the work and result channels.
    pub queue_capacity: usize,
    /// Keep closed outcomes on summaries.
    pub show_closed: bool,
    /// Only report hosts with open ports.
    pub quiet: bool,
}

impl ScanConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
    pub const DEFAULT_CONCURRENCY: usize = 50;
    pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

    /// Create a configuration with default tuning.
    pub fn new(hosts: HostList, ports: PortRange) -> Self {
        Self {
            hosts,
            ports,
            timeout: Self::DEFAULT_TIMEOUT,
            retries: 1,
            concurrency: Self::DEFAULT_CONCURRENCY,
            rate_limit: None,
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            show_closed: false,
            quiet: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimit>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Keep every outcome, closed ones included, on the summaries.
    pub fn with_closed(mut self) -> Self {
        self.show_closed = true;
        self
    }

    /// Only report hosts with at least one open port.
    pub fn with_quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Check every setting. Runs before any task is spawned.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.hosts.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout", "must be greater than zero"));
        }
        if self.retries == 0 {
            return Err(invalid("retries", "must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// Units a complete run probes.
    pub fn total_units(&self) -> usize {
        self.hosts.len() * self.ports.len()
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

/// Progress counters shared by every stage of a run.
#[derive(Debug, Default)]
pub struct ScanStats {
    queued: AtomicU64,
    dispatched: AtomicU64,
    completed: AtomicU64,
}

/// A point-in-time copy of [`ScanStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Units placed on the work queue.
    pub queued: u64,
    /// Units taken off the queue by a worker.
    pub dispatched: u64,
    /// Outcomes received by the collector.
    pub completed: u64,
}

impl ScanStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Builds and starts scan runs.
///
/// # Example
///
/// ```ignore
/// use portsweep::scanner::{ScanConfig, Scanner};
/// use portsweep::types::{HostList, PortRange};
/// use tokio_util::sync::CancellationToken;
///
/// let hosts = HostList::from_targets(["127.0.0.1"])?;
/// let config = ScanConfig::new(hosts, "1-1024".parse()?);
/// let summaries = Scanner::new(config).run(CancellationToken::new()).await?;
/// ```
pub struct Scanner {
    config: ScanConfig,
    connector: SharedConnector,
    progress: Option<ProgressBar>,
}

impl Scanner {
    /// A scanner using real TCP connects.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            connector: Arc::new(TcpConnector),
            progress: None,
        }
    }

    /// Replace how connection attempts are made.
    pub fn with_connector(mut self, connector: SharedConnector) -> Self {
        self.connector = connector;
        self
    }

    /// Advance `progress` once per finished unit.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Validate the configuration and start the run.
    ///
    /// Nothing is spawned if validation fails. Must be called from within a
    /// tokio runtime.
    pub fn start(self, cancel: CancellationToken) -> ConfigResult<ScanHandle> {
        self.config.validate()?;
        let cancel = cancel.child_token();
        let enumerator = Enumerator::new(&self.config.hosts, self.config.ports)?;
        let retries = std::num::NonZeroU32::new(self.config.retries)
            .ok_or_else(|| invalid("retries", "must be at least 1"))?;

        let config = self.config;
        let total = enumerator.total();
        let stats = Arc::new(ScanStats::default());
        let prober = Prober::new(self.connector, config.timeout, retries);
        let limiter = config.rate_limit.map(RateLimiter::new);

        info!(
            hosts = config.hosts.len(),
            ports = %config.ports,
            workers = config.concurrency,
            timeout_ms = config.timeout.as_millis() as u64,
            retries = config.retries,
            rate_limit = ?config.rate_limit.map(|l| (l.per_second, l.burst)),
            "starting scan"
        );

        let (work_tx, work_rx) = mpsc::channel(config.queue_capacity);
        let (result_tx, result_rx) = mpsc::channel(config.queue_capacity);
        let (summary_tx, summary_rx) = mpsc::channel(config.hosts.len().clamp(1, 1024));

        let collector = Collector::new(
            &config.hosts,
            config.ports.len(),
            CollectorOptions {
                show_closed: config.show_closed,
                quiet: config.quiet,
            },
            summary_tx,
            Arc::clone(&stats),
            cancel.clone(),
        )
        .with_progress(self.progress);

        let pool = WorkerPool::new(
            config.concurrency,
            prober,
            limiter,
            cancel.clone(),
            Arc::clone(&stats),
        );

        let collector_task = tokio::spawn(collector.run(result_rx));
        let supervisor = pool.spawn(work_rx, result_tx);
        let feeder = tokio::spawn(pool::feed(
            enumerator,
            work_tx,
            cancel.clone(),
            Arc::clone(&stats),
        ));

        Ok(ScanHandle {
            summaries: summary_rx,
            cancel,
            stats,
            total,
            tasks: vec![feeder, supervisor, collector_task],
        })
    }

    /// Run to completion (or cancellation) and return every summary.
    pub async fn run(self, cancel: CancellationToken) -> ConfigResult<Vec<RunSummary>> {
        Ok(self.start(cancel)?.collect().await)
    }
}

/// A running scan.
///
/// Summaries arrive in host order. The stream ends once every worker has
/// exited and the collector has flushed. Dropping the handle cancels the run.
pub struct ScanHandle {
    summaries: mpsc::Receiver<RunSummary>,
    cancel: CancellationToken,
    stats: Arc<ScanStats>,
    total: usize,
    tasks: Vec<JoinHandle<()>>,
}

impl ScanHandle {
    /// The next host summary, or `None` when the run is over.
    pub async fn next(&mut self) -> Option<RunSummary> {
        self.summaries.recv().await
    }

    /// Shared progress counters.
    pub fn stats(&self) -> Arc<ScanStats> {
        Arc::clone(&self.stats)
    }

    /// Units a complete run probes.
    pub fn total_units(&self) -> usize {
        self.total
    }

    /// Consume the handle as a stream of summaries.
    pub fn into_stream(self) -> impl Stream<Item = RunSummary> {
        stream::unfold(self, |mut handle| async move {
            handle.next().await.map(|summary| (summary, handle))
        })
    }

    /// Wait for every summary and for the run's tasks to finish.
    pub async fn collect(mut self) -> Vec<RunSummary> {
        let mut summaries = Vec::new();
        while let Some(summary) = self.next().await {
            summaries.push(summary);
        }
        self.join().await;
        summaries
    }

    /// Stop the run and wait for its tasks, discarding unread summaries.
    pub async fn join(mut self) {
        self.cancel.cancel();
        self.summaries.close();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "scan task failed");
            }
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandle")
            .field("total", &self.total)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
