//! Single-assignment outcome cell for one asynchronous step.
//!
//! A [`PendingResult`] is resolved at most once, by whichever of its writers
//! gets there first: the [`Resolver`] handed to the worker running the step,
//! or a cancellation raised while the step is in flight. Later attempts are
//! no-ops, so a result that loses the race is simply discarded.

use crate::error::BridgeError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Final state of a pending step.
#[derive(Debug)]
pub enum Resolution<T> {
    Completed(T),
    Failed(BridgeError),
    Canceled,
}

#[cfg(test)]
impl<T> Resolution<T> {
    fn is_canceled(&self) -> bool {
        matches!(self, Resolution::Canceled)
    }
}

struct Shared<T> {
    claimed: AtomicBool,
    slot: Mutex<Option<Resolution<T>>>,
    notify: Notify,
}

impl<T> Shared<T> {
    fn try_resolve(&self, resolution: Resolution<T>) -> bool {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        *self.slot.lock() = Some(resolution);
        self.notify.notify_waiters();
        true
    }

    fn take(&self) -> Option<Resolution<T>> {
        self.slot.lock().take()
    }
}

/// Reading side of a single step outcome.
pub struct PendingResult<T> {
    shared: Arc<Shared<T>>,
}

/// Writing side of a single step outcome, owned by the worker.
pub struct Resolver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> PendingResult<T> {
    /// Creates an unresolved cell and its worker-side resolver.
    pub fn channel() -> (Resolver<T>, PendingResult<T>) {
        let shared = Arc::new(Shared {
            claimed: AtomicBool::new(false),
            slot: Mutex::new(None),
            notify: Notify::new(),
        });
        (
            Resolver {
                shared: shared.clone(),
            },
            PendingResult { shared },
        )
    }

    #[cfg(test)]
    fn is_resolved(&self) -> bool {
        self.shared.claimed.load(Ordering::Acquire)
    }

    /// Resolves the cell as canceled. Returns false if it was already resolved.
    pub fn cancel(&self) -> bool {
        self.shared.try_resolve(Resolution::Canceled)
    }

    #[cfg(test)]
    async fn wait(self) -> Resolution<T> {
        loop {
            let notified = self.shared.notify.notified();
            if let Some(resolution) = self.shared.take() {
                return resolution;
            }
            notified.await;
        }
    }

    /// Waits for the cell, resolving it as canceled if `cancel` fires first.
    ///
    /// Whichever of the worker and the token claims the cell first decides the
    /// returned resolution.
    pub async fn wait_or_cancel(self, cancel: &CancellationToken) -> Resolution<T> {
        let mut cancel_raced = false;
        loop {
            let notified = self.shared.notify.notified();
            if let Some(resolution) = self.shared.take() {
                return resolution;
            }
            if cancel_raced {
                // the worker claimed the cell first and is storing its result
                notified.await;
                continue;
            }
            tokio::select! {
                _ = notified => {}
                _ = cancel.cancelled() => {
                    self.cancel();
                    cancel_raced = true;
                }
            }
        }
    }
}

impl<T> Resolver<T> {
    /// Stores the step outcome. Returns false if the cell was already resolved.
    pub fn resolve(self, resolution: Resolution<T>) -> bool {
        self.shared.try_resolve(resolution)
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        // a worker torn down before reporting must not leave the reader hanging
        self.shared.try_resolve(Resolution::Failed(BridgeError::WorkerPanicked(
            "step abandoned before resolving".to_string(),
        )));
    }
}
