//! TCP connect probing.
//!
//! Performs standard TCP connect attempts using the operating system's
//! socket API. A port is open if any of up to `retries` sequential attempts
//! completes the handshake.

use crate::error::ProbeError;
use crate::scanner::enumerator::ScanUnit;
use crate::scanner::traits::{Connector, ScanOutcome, SharedConnector};
use crate::types::Port;
use async_trait::async_trait;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Connects with `TcpStream::connect`, resolving hostnames as it goes.
///
/// Does not require elevated privileges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: Port) -> Result<(), ProbeError> {
        let mut stream = TcpStream::connect((host, port.as_u16())).await?;
        if let Err(e) = stream.shutdown().await {
            trace!(host, %port, error = %e, "shutdown after connect failed");
        }
        Ok(())
    }
}

/// Runs the retry loop for one scan unit.
///
/// Attempts are sequential, each with a fresh `timeout`, so a closed port
/// costs at most `retries × timeout`.
#[derive(Clone)]
pub struct Prober {
    connector: SharedConnector,
    timeout: Duration,
    retries: NonZeroU32,
}

impl Prober {
    /// Create a prober.
    ///
    /// # Arguments
    /// * `connector` - How a single attempt is made
    /// * `timeout` - Budget for each attempt
    /// * `retries` - Maximum number of attempts
    pub fn new(connector: SharedConnector, timeout: Duration, retries: NonZeroU32) -> Self {
        Self {
            connector,
            timeout,
            retries,
        }
    }

    /// A prober backed by real TCP connects.
    pub fn tcp(timeout: Duration, retries: NonZeroU32) -> Self {
        Self::new(Arc::new(TcpConnector), timeout, retries)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> NonZeroU32 {
        self.retries
    }

    /// Probe one unit, stopping at the first successful attempt.
    pub async fn probe(&self, unit: &ScanUnit) -> ScanOutcome {
        let mut last_error = None;

        for attempt in 1..=self.retries.get() {
            let start = Instant::now();
            match timeout(self.timeout, self.connector.connect(&unit.host, unit.port)).await {
                Ok(Ok(())) => {
                    debug!(
                        host = %unit.host,
                        port = %unit.port,
                        attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "port open"
                    );
                    return ScanOutcome::open(unit.port);
                }
                Ok(Err(e)) => last_error = Some(e),
                Err(_) => last_error = Some(ProbeError::Timeout(self.timeout)),
            }

            if let Some(e) = &last_error {
                trace!(host = %unit.host, port = %unit.port, attempt, error = %e, "attempt failed");
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        ScanOutcome::closed(unit.port, reason)
    }
}

impl std::fmt::Debug for Prober {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prober")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::PortState;
    use nonzero_ext::nonzero;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::net::TcpListener;

    /// Fails a fixed number of times, then accepts.
    struct FlakyConnector {
        failures: u32,
        attempts: AtomicU32,
    }

    impl FlakyConnector {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        async fn connect(&self, _host: &str, _port: Port) -> Result<(), ProbeError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(ProbeError::Refused)
            } else {
                Ok(())
            }
        }
    }

    /// Never completes.
    struct HangingConnector;

    #[async_trait]
    impl Connector for HangingConnector {
        async fn connect(&self, _host: &str, _port: Port) -> Result<(), ProbeError> {
            std::future::pending().await
        }
    }

    fn unit(host: &str, port: u16) -> ScanUnit {
        ScanUnit::new(host, Port::new(port).unwrap())
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let connector = Arc::new(FlakyConnector::new(2));
        let prober = Prober::new(connector.clone(), Duration::from_millis(200), nonzero!(5u32));

        let outcome = prober.probe(&unit("10.0.0.1", 80)).await;

        assert_eq!(outcome.state, PortState::Open);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let connector = Arc::new(FlakyConnector::new(u32::MAX));
        let prober = Prober::new(connector.clone(), Duration::from_millis(200), nonzero!(3u32));

        let outcome = prober.probe(&unit("10.0.0.1", 80)).await;

        assert_eq!(outcome.state, PortState::Closed);
        assert_eq!(outcome.reason.as_deref(), Some("connection refused"));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_on_last_allowed_attempt() {
        let connector = Arc::new(FlakyConnector::new(2));
        let prober = Prober::new(connector.clone(), Duration::from_millis(200), nonzero!(3u32));

        let outcome = prober.probe(&unit("10.0.0.1", 80)).await;

        assert!(outcome.is_open());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_gets_its_own_timeout() {
        let prober = Prober::new(Arc::new(HangingConnector), Duration::from_secs(2), nonzero!(3u32));

        let start = tokio::time::Instant::now();
        let outcome = prober.probe(&unit("10.0.0.1", 80)).await;

        assert_eq!(outcome.state, PortState::Closed);
        assert!(outcome.reason.unwrap().contains("timed out"));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed < Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_listening_port_is_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let prober = Prober::tcp(Duration::from_millis(500), nonzero!(1u32));

        let outcome = prober.probe(&unit("127.0.0.1", port)).await;

        assert_eq!(outcome, ScanOutcome::open(Port::new(port).unwrap()));
    }

    #[tokio::test]
    async fn test_closed_port_has_reason() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let prober = Prober::tcp(Duration::from_millis(200), nonzero!(2u32));

        let outcome = prober.probe(&unit("127.0.0.1", port)).await;

        assert_eq!(outcome.state, PortState::Closed);
        assert!(outcome.reason.is_some());
    }
}
