//! Result collation.
//!
//! The collector is the only reader of the result channel. It buffers
//! outcomes per host, sorts them and emits one `RunSummary` per host in the
//! order hosts were configured, as soon as a host and all hosts before it
//! are complete.

use crate::scanner::pool::ProbeReport;
use crate::scanner::traits::ScanOutcome;
use crate::scanner::ScanStats;
use crate::types::{HostList, Port};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Aggregated, sorted report for one host.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub host: String,
    /// Open ports, ascending.
    pub open_ports: Vec<Port>,
    /// Number of closed ports.
    pub closed: usize,
    /// Outcomes received for this host.
    pub scanned: usize,
    /// Outcomes a full run produces for this host.
    pub expected: usize,
    /// From the first dispatch to the last outcome for this host.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// False when cancellation cut this host short.
    pub complete: bool,
    pub completed_at: DateTime<Utc>,
    /// Every outcome sorted by port, kept only when closed ports are requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<ScanOutcome>,
}

impl RunSummary {
    pub fn has_open_ports(&self) -> bool {
        !self.open_ports.is_empty()
    }

    /// Open ports joined as `22, 80, 443`.
    pub fn open_ports_list(&self) -> String {
        self.open_ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The line appended to the results log, if this host has open ports.
    pub fn log_line(&self) -> Option<String> {
        self.has_open_ports()
            .then(|| format!("{}: Open Ports: {}", self.host, self.open_ports_list()))
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// What the collector does with summaries.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CollectorOptions {
    /// Keep every outcome on the summary.
    pub show_closed: bool,
    /// Drop summaries without open ports.
    pub quiet: bool,
}

#[derive(Debug)]
struct HostTally {
    host: Arc<str>,
    outcomes: Vec<ScanOutcome>,
    first_dispatch: Option<Instant>,
    last_outcome: Option<Instant>,
}

impl HostTally {
    fn new(host: Arc<str>) -> Self {
        Self {
            host,
            outcomes: Vec::new(),
            first_dispatch: None,
            last_outcome: None,
        }
    }

    fn record(&mut self, report: ProbeReport, received_at: Instant) {
        self.first_dispatch = Some(match self.first_dispatch {
            Some(first) => first.min(report.dispatched_at),
            None => report.dispatched_at,
        });
        self.last_outcome = Some(received_at);
        self.outcomes.push(report.outcome);
    }

    fn into_summary(mut self, expected: usize, show_closed: bool) -> RunSummary {
        self.outcomes.sort_unstable_by_key(|o| o.port);

        let open_ports: Vec<Port> = self
            .outcomes
            .iter()
            .filter(|o| o.is_open())
            .map(|o| o.port)
            .collect();
        let scanned = self.outcomes.len();
        let elapsed = match (self.first_dispatch, self.last_outcome) {
            (Some(first), Some(last)) => last.saturating_duration_since(first),
            _ => Duration::ZERO,
        };

        RunSummary {
            host: self.host.to_string(),
            closed: scanned - open_ports.len(),
            open_ports,
            scanned,
            expected,
            elapsed,
            complete: scanned == expected,
            completed_at: Utc::now(),
            outcomes: if show_closed { self.outcomes } else { Vec::new() },
        }
    }
}

pub(crate) struct Collector {
    tallies: Vec<Option<HostTally>>,
    index: HashMap<Arc<str>, usize>,
    next_to_emit: usize,
    expected_per_host: usize,
    options: CollectorOptions,
    summaries: mpsc::Sender<RunSummary>,
    progress: Option<ProgressBar>,
    stats: Arc<ScanStats>,
    cancel: CancellationToken,
}

impl Collector {
    pub(crate) fn new(
        hosts: &HostList,
        expected_per_host: usize,
        options: CollectorOptions,
        summaries: mpsc::Sender<RunSummary>,
        stats: Arc<ScanStats>,
        cancel: CancellationToken,
    ) -> Self {
        let tallies = hosts
            .iter()
            .map(|host| Some(HostTally::new(Arc::clone(host))))
            .collect();
        let index = hosts
            .iter()
            .enumerate()
            .map(|(i, host)| (Arc::clone(host), i))
            .collect();

        Self {
            tallies,
            index,
            next_to_emit: 0,
            expected_per_host,
            options,
            summaries,
            progress: None,
            stats,
            cancel,
        }
    }

    pub(crate) fn with_progress(mut self, progress: Option<ProgressBar>) -> Self {
        self.progress = progress;
        self
    }

    /// Drain `results` until every sender is gone, emitting summaries.
    pub(crate) async fn run(mut self, mut results: mpsc::Receiver<ProbeReport>) {
        while let Some(report) = results.recv().await {
            self.record(report);
            self.emit_ready().await;
        }
        self.emit_remaining().await;

        if let Some(pb) = self.progress.take() {
            let snapshot = self.stats.snapshot();
            if snapshot.completed as usize == self.expected_per_host * self.tallies.len() {
                pb.finish_with_message("Scan complete");
            } else {
                pb.abandon_with_message("Scan cancelled");
            }
        }
        debug!("collector finished");
    }

    fn record(&mut self, report: ProbeReport) {
        let received_at = Instant::now();
        self.stats.record_completed();

        if let Some(pb) = &self.progress {
            pb.inc(1);
            if report.outcome.is_open() {
                pb.set_message(format!("Found open port: {}", report.unit));
            }
        }

        let Some(&slot) = self.index.get(&report.unit.host) else {
            warn!(unit = %report.unit, "outcome for unknown host");
            return;
        };
        match self.tallies.get_mut(slot).and_then(Option::as_mut) {
            Some(tally) => tally.record(report, received_at),
            None => warn!(unit = %report.unit, "outcome after host was reported"),
        }
    }

    /// Emit summaries for the leading run of completed hosts.
    async fn emit_ready(&mut self) {
        while let Some(Some(tally)) = self.tallies.get(self.next_to_emit) {
            if tally.outcomes.len() < self.expected_per_host {
                break;
            }
            self.emit_next().await;
        }
    }

    /// Emit whatever is left after the channel closed.
    ///
    /// Hosts that never produced an outcome were never dispatched and are
    /// skipped.
    async fn emit_remaining(&mut self) {
        while self.next_to_emit < self.tallies.len() {
            self.emit_next().await;
        }
    }

    async fn emit_next(&mut self) {
        let slot = self.next_to_emit;
        self.next_to_emit += 1;

        let Some(tally) = self.tallies.get_mut(slot).and_then(Option::take) else {
            return;
        };
        if tally.outcomes.is_empty() {
            return;
        }

        let summary = tally.into_summary(self.expected_per_host, self.options.show_closed);
        debug!(
            host = %summary.host,
            open = summary.open_ports.len(),
            scanned = summary.scanned,
            complete = summary.complete,
            "host finished"
        );

        if self.options.quiet && !summary.has_open_ports() {
            return;
        }
        // Nobody is reading: stop the run but keep draining until workers exit.
        if self.summaries.send(summary).await.is_err() && !self.cancel.is_cancelled() {
            debug!("summary receiver dropped, cancelling run");
            self.cancel.cancel();
        }
    }
}
