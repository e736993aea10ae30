//! Run-wide cancellation.
//!
//! A single `CancellationToken` is cloned into every worker and the rate
//! limiter. Firing it is irreversible for the rest of the run.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Ctrl-C or another external interrupt.
    Interrupt,
    /// The configured deadline expired.
    Deadline,
    /// Cancelled through the API.
    Requested,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupted"),
            Self::Deadline => write!(f, "deadline reached"),
            Self::Requested => write!(f, "cancel requested"),
        }
    }
}

/// Owns the cancellation signal and the tasks that may fire it.
///
/// Clones share the same signal.
#[derive(Clone, Default)]
pub struct CancelController {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
    triggers: Arc<std::sync::Mutex<Vec<JoinHandle<()>>>>,
}

impl CancelController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token observers can wait on or poll.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The first reason the signal fired for, if it has.
    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    /// Fire the signal. Later calls keep the first reason.
    pub fn cancel(&self, reason: CancelReason) {
        if self.reason.set(reason).is_ok() {
            info!(%reason, "cancelling scan");
        }
        self.token.cancel();
    }

    /// Cancel on Ctrl-C.
    pub fn cancel_on_interrupt(&self) {
        let controller = self.clone();
        self.track(tokio::spawn(async move {
            tokio::select! {
                _ = controller.token.cancelled() => {}
                result = tokio::signal::ctrl_c() => {
                    if result.is_ok() {
                        controller.cancel(CancelReason::Interrupt);
                    }
                }
            }
        }));
    }

    /// Cancel once `deadline` has elapsed from now.
    pub fn cancel_after(&self, deadline: Duration) {
        let controller = self.clone();
        self.track(tokio::spawn(async move {
            tokio::select! {
                _ = controller.token.cancelled() => {}
                _ = tokio::time::sleep(deadline) => controller.cancel(CancelReason::Deadline),
            }
        }));
    }

    /// Stop the trigger tasks without cancelling the run.
    pub fn disarm(&self) {
        if let Ok(mut triggers) = self.triggers.lock() {
            for handle in triggers.drain(..) {
                handle.abort();
            }
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        if let Ok(mut triggers) = self.triggers.lock() {
            triggers.push(handle);
        }
    }
}

impl fmt::Debug for CancelController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelController")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
