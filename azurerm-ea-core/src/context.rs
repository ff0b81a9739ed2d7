//! Stop context - Cancellation and deadline signal threaded through provider calls
//!
//! Every provider operation receives a `StopContext`. Long waits (such as
//! polling a remote operation) race against `StopContext::stopped` and give up
//! as soon as the host engine cancels or the deadline passes.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Why a `StopContext` fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "operation was cancelled"),
            StopReason::DeadlineExceeded => write!(f, "operation deadline exceeded"),
        }
    }
}

/// Sending half, held by the host engine
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    /// Fire the signal; every clone of the paired context observes it
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half, handed to provider operations
#[derive(Debug, Clone)]
pub struct StopContext {
    rx: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl StopContext {
    /// Create a linked handle/context pair
    pub fn new() -> (StopHandle, StopContext) {
        let (tx, rx) = watch::channel(false);
        (StopHandle { tx }, StopContext { rx, deadline: None })
    }

    /// A context that never fires on its own
    pub fn background() -> Self {
        let (_, ctx) = Self::new();
        ctx
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Never resolves for a background context.
    pub async fn stopped(&self) -> StopReason {
        let mut rx = self.rx.clone();
        let cancelled = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Handle dropped without firing: cancellation can no longer happen
                    std::future::pending::<()>().await;
                }
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = cancelled => StopReason::Cancelled,
                _ = tokio::time::sleep_until(deadline) => StopReason::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                StopReason::Cancelled
            }
        }
    }
}
