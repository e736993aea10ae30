//! Rate limiting for network scans.
//!
//! Provides token bucket rate limiting shared by every worker in a run,
//! capping the global connection attempt rate.

use crate::error::Cancelled;
use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Rate and burst settings for a limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Tokens added per second.
    pub per_second: NonZeroU32,
    /// Bucket capacity.
    pub burst: NonZeroU32,
}

impl RateLimit {
    /// A limit whose burst equals its rate.
    pub fn per_second(rate: NonZeroU32) -> Self {
        Self {
            per_second: rate,
            burst: rate,
        }
    }

    /// Set the burst capacity.
    pub fn with_burst(mut self, burst: NonZeroU32) -> Self {
        self.burst = burst;
        self
    }
}

/// A token bucket shared by all workers.
///
/// Waiters queue on a fair mutex before polling the bucket, so tokens are
/// granted in arrival order and no worker is starved under contention.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
    queue: Arc<Mutex<()>>,
    limit: RateLimit,
}

impl RateLimiter {
    /// Create a new rate limiter; the bucket starts full.
    pub fn new(limit: RateLimit) -> Self {
        let quota = Quota::per_second(limit.per_second).allow_burst(limit.burst);

        Self {
            limiter: Arc::new(DefaultDirectRateLimiter::direct(quota)),
            queue: Arc::new(Mutex::new(())),
            limit,
        }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Wait until a token is available.
    ///
    /// Returns `Err(Cancelled)` without consuming a token if `cancel` fires
    /// first, including when it has already fired.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            _ = self.wait_turn() => Ok(()),
        }
    }

    async fn wait_turn(&self) {
        let _turn = self.queue.lock().await;
        self.limiter.until_ready().await;
    }

    /// Try to acquire a token without waiting.
    ///
    /// Returns `true` if a token was available, `false` otherwise.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// Admission gate for workers; no limiter means no waiting.
pub(crate) async fn admit(
    limiter: Option<&RateLimiter>,
    cancel: &CancellationToken,
) -> Result<(), Cancelled> {
    match limiter {
        Some(limiter) => limiter.acquire(cancel).await,
        None if cancel.is_cancelled() => Err(Cancelled),
        None => Ok(()),
    }
}
