//! Fixed-size worker pool.
//!
//! Workers share one bounded work queue and one result channel. Each worker
//! loops: take a unit, wait for a rate-limiter token, probe, publish. The
//! result channel is closed by a supervisor only after every worker task has
//! been joined.

use crate::scanner::enumerator::{Enumerator, ScanUnit};
use crate::scanner::rate_limiter::{admit, RateLimiter};
use crate::scanner::tcp::Prober;
use crate::scanner::traits::ScanOutcome;
use crate::scanner::ScanStats;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// A finished probe on its way to the collector.
#[derive(Debug, Clone)]
pub(crate) struct ProbeReport {
    pub unit: ScanUnit,
    pub outcome: ScanOutcome,
    /// When a worker took the unit off the queue.
    pub dispatched_at: Instant,
}

/// Shared state every worker reads.
struct WorkerContext {
    work: Mutex<mpsc::Receiver<ScanUnit>>,
    prober: Prober,
    limiter: Option<RateLimiter>,
    cancel: CancellationToken,
    stats: Arc<ScanStats>,
}

pub(crate) struct WorkerPool {
    size: usize,
    prober: Prober,
    limiter: Option<RateLimiter>,
    cancel: CancellationToken,
    stats: Arc<ScanStats>,
}

impl WorkerPool {
    pub(crate) fn new(
        size: usize,
        prober: Prober,
        limiter: Option<RateLimiter>,
        cancel: CancellationToken,
        stats: Arc<ScanStats>,
    ) -> Self {
        Self {
            size,
            prober,
            limiter,
            cancel,
            stats,
        }
    }

    /// Spawn the workers and their supervisor.
    ///
    /// The returned handle completes once every worker has exited and the
    /// result channel has been closed.
    pub(crate) fn spawn(
        self,
        work: mpsc::Receiver<ScanUnit>,
        results: mpsc::Sender<ProbeReport>,
    ) -> JoinHandle<()> {
        let ctx = Arc::new(WorkerContext {
            work: Mutex::new(work),
            prober: self.prober,
            limiter: self.limiter,
            cancel: self.cancel,
            stats: self.stats,
        });

        let mut workers = JoinSet::new();
        for id in 0..self.size {
            workers.spawn(run_worker(id, Arc::clone(&ctx), results.clone()));
        }
        debug!(workers = self.size, "worker pool started");

        tokio::spawn(async move {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "worker task failed");
                }
            }
            // Every worker has exited; dropping the last sender closes the channel.
            drop(results);
            debug!("worker pool drained");
        })
    }
}

async fn run_worker(id: usize, ctx: Arc<WorkerContext>, results: mpsc::Sender<ProbeReport>) {
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let unit = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            unit = next_unit(&ctx.work) => match unit {
                Some(unit) => unit,
                None => break,
            },
        };
        let dispatched_at = Instant::now();
        ctx.stats.record_dispatched();

        if admit(ctx.limiter.as_ref(), &ctx.cancel).await.is_err() {
            trace!(worker = id, %unit, "cancelled while rate limited");
            break;
        }

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                trace!(worker = id, %unit, "cancelled while probing");
                break;
            }
            outcome = ctx.prober.probe(&unit) => outcome,
        };

        let report = ProbeReport {
            unit,
            outcome,
            dispatched_at,
        };
        if results.send(report).await.is_err() {
            break;
        }
    }

    trace!(worker = id, "worker exiting");
}

async fn next_unit(work: &Mutex<mpsc::Receiver<ScanUnit>>) -> Option<ScanUnit> {
    work.lock().await.recv().await
}

/// Push units into the work queue until exhausted or cancelled.
///
/// Blocks whenever the queue is full. Units not yet queued when the signal
/// fires are dropped.
pub(crate) async fn feed(
    enumerator: Enumerator,
    work: mpsc::Sender<ScanUnit>,
    cancel: CancellationToken,
    stats: Arc<ScanStats>,
) {
    for unit in enumerator {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = work.send(unit) => {
                if sent.is_err() {
                    break;
                }
                stats.record_queued();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::scanner::traits::Connector;
    use crate::types::{HostList, Port, PortRange};
    use async_trait::async_trait;
    use nonzero_ext::nonzero;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Opens even ports, refuses odd ones, and tracks peak concurrency.
    #[derive(Default)]
    struct EvenConnector {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Connector for EvenConnector {
        async fn connect(&self, _host: &str, port: Port) -> Result<(), ProbeError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if port.as_u16() % 2 == 0 {
                Ok(())
            } else {
                Err(ProbeError::Refused)
            }
        }
    }

    async fn run_pool(
        size: usize,
        connector: Arc<EvenConnector>,
        hosts: &[&str],
        range: PortRange,
    ) -> Vec<ProbeReport> {
        let hosts: HostList = hosts.iter().copied().collect();
        let enumerator = Enumerator::new(&hosts, range).unwrap();
        let cancel = CancellationToken::new();
        let stats = Arc::new(ScanStats::default());
        let prober = Prober::new(connector, Duration::from_secs(1), nonzero!(1u32));

        let (work_tx, work_rx) = mpsc::channel(4);
        let (result_tx, mut result_rx) = mpsc::channel(4);
        let pool = WorkerPool::new(size, prober, None, cancel.clone(), Arc::clone(&stats));
        let supervisor = pool.spawn(work_rx, result_tx);
        tokio::spawn(feed(enumerator, work_tx, cancel, stats));

        let mut reports = Vec::new();
        while let Some(report) = result_rx.recv().await {
            reports.push(report);
        }
        supervisor.await.unwrap();
        reports
    }

    #[tokio::test]
    async fn test_every_unit_yields_one_report() {
        let connector = Arc::new(EvenConnector::default());
        let reports = run_pool(
            8,
            connector,
            &["10.0.0.1", "10.0.0.2"],
            PortRange::new(1, 50).unwrap(),
        )
        .await;

        assert_eq!(reports.len(), 100);
        let unique: HashSet<_> = reports.iter().map(|r| r.unit.clone()).collect();
        assert_eq!(unique.len(), 100);
        for report in &reports {
            assert_eq!(report.outcome.is_open(), report.unit.port.as_u16() % 2 == 0);
        }
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_pool_size() {
        let connector = Arc::new(EvenConnector::default());
        run_pool(3, Arc::clone(&connector), &["h"], PortRange::new(1, 40).unwrap()).await;
        let peak = connector.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {}", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_pool_larger_than_work() {
        let connector = Arc::new(EvenConnector::default());
        let reports = run_pool(64, connector, &["h"], PortRange::new(10, 12).unwrap()).await;
        assert_eq!(reports.len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_pool_exits_without_work() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = Arc::new(ScanStats::default());
        let prober = Prober::new(Arc::new(EvenConnector::default()), Duration::from_secs(1), nonzero!(1u32));

        let (work_tx, work_rx) = mpsc::channel(4);
        let (result_tx, mut result_rx) = mpsc::channel(4);
        work_tx
            .send(ScanUnit::new("h", Port::new(2).unwrap()))
            .await
            .unwrap();

        let supervisor = WorkerPool::new(2, prober, None, cancel, Arc::clone(&stats)).spawn(work_rx, result_tx);

        assert!(result_rx.recv().await.is_none());
        supervisor.await.unwrap();
        assert_eq!(stats.snapshot().dispatched, 0);
    }
}
