//! In-flight stream accounting.
//!
//! Every accepted stream holds a [`StreamGuard`] for as long as its handler
//! task runs. Shutdown first stops admitting streams, then waits for the
//! in-flight count to reach zero (or a timeout) before cancelling the rest via
//! the shared [`CancellationToken`].

use core::time::Duration;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct StreamTracker {
    inflight: AtomicUsize,
    closed: AtomicBool,
    cancel: CancellationToken,
}

impl StreamTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a new stream, or returns `None` once shutdown has begun.
    ///
    /// The count is raised before `closed` is checked, so a drain that has
    /// already observed `inflight == 0` can never miss a stream admitted
    /// concurrently.
    pub fn admit(self: &Arc<Self>) -> Option<StreamGuard> {
        self.inflight.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            self.inflight.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(StreamGuard {
            tracker: Arc::clone(self),
        })
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Token cancelled once the drain window has elapsed.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops admitting streams, waits up to `drain_timeout` for in-flight
    /// streams to finish, then cancels whatever is left.
    ///
    /// Returns the number of streams that were still running when the drain
    /// window closed.
    pub async fn shutdown(&self, drain_timeout: Duration) -> usize {
        // === Phase 0: Stop accepting new streams ===
        tracing::info!("Refusing new streams");
        self.closed.store(true, Ordering::SeqCst);

        // === Phase 1: Wait for in-flight streams to drain ===
        tracing::info!("Draining in-flight streams ({} active)", self.inflight());
        let drained = timeout(drain_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        let remaining = self.inflight();
        match drained {
            Ok(()) => tracing::debug!("All in-flight streams drained successfully"),
            Err(_) => tracing::warn!("Graceful drain timed out ({remaining} streams still active)"),
        }

        // === Phase 2: Cancel any remaining streams ===
        self.cancel.cancel();
        remaining
    }
}

/// Decrements the in-flight count when the owning stream handler finishes.
#[derive(Debug)]
pub struct StreamGuard {
    tracker: Arc<StreamTracker>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.tracker.inflight.fetch_sub(1, Ordering::AcqRel);
    }
}
