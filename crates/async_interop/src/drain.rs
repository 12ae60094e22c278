//! Blocking, single-pass consumption of an [`AsyncEnumerable`].
//!
//! Each advance blocks the calling thread until it resolves. No cancellation
//! is possible from here: every step is given a token that never fires.
//!
//! Blocking a thread that is itself needed to drive the sequence deadlocks.
//! Inside a multi-thread Tokio runtime the drain uses `block_in_place`, which
//! hands the worker's other tasks to a new thread; inside a current-thread
//! runtime there is nothing to hand over, so callers must not drain sequences
//! that depend on that runtime making progress.

use crate::enumerable::{AsyncEnumerable, AsyncEnumerator};
use crate::error::{BridgeError, BridgeResult};
use std::future::Future;
use std::iter::FusedIterator;
use tokio::runtime::{Builder as RuntimeBuilder, Handle, Runtime, RuntimeFlavor};
use tokio::task::block_in_place;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Lazily drains a new enumeration of `source`, rejecting an absent source.
pub fn drain<A>(source: Option<&A>) -> BridgeResult<Drain<A::Enumerator>>
where
    A: AsyncEnumerable + ?Sized,
    A::Item: Clone,
{
    let source = source.ok_or(BridgeError::NullArgument("source"))?;
    Ok(Drain::new(source.enumerator()))
}

/// How the draining thread waits for one step.
enum Blocker {
    /// Multi-thread runtime: yield the worker slot, then block on the handle.
    InPlace(Handle),
    /// Current-thread runtime: park the thread with a standalone executor.
    Parked,
    /// No runtime: drive steps on a private current-thread runtime.
    Owned(Runtime),
}

impl Blocker {
    fn detect() -> BridgeResult<Self> {
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => Ok(Blocker::InPlace(handle)),
                _ => {
                    warn!(
                        "draining an async sequence from a current-thread runtime; \
                         steps that need this runtime to progress will deadlock"
                    );
                    Ok(Blocker::Parked)
                }
            },
            Err(_) => RuntimeBuilder::new_current_thread()
                .enable_all()
                .build()
                .map(Blocker::Owned)
                .map_err(BridgeError::runtime),
        }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        match self {
            Blocker::InPlace(handle) => block_in_place(|| handle.block_on(future)),
            Blocker::Parked => futures::executor::block_on(future),
            Blocker::Owned(runtime) => runtime.block_on(future),
        }
    }
}

/// Blocking iterator over one enumeration of an asynchronous sequence.
///
/// Yields `Ok(item)` per element; a failed step is yielded once as `Err` and
/// ends the iteration. The enumerator is disposed as soon as the iteration
/// ends, or when the `Drain` is dropped.
pub struct Drain<E: AsyncEnumerator> {
    enumerator: E,
    blocker: Option<Blocker>,
    finished: bool,
}

impl<E: AsyncEnumerator> Drain<E> {
    pub(crate) fn new(enumerator: E) -> Self {
        Self {
            enumerator,
            blocker: None,
            finished: false,
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.enumerator.dispose();
            trace!("drained enumerator disposed");
        }
    }
}

impl<E> Iterator for Drain<E>
where
    E: AsyncEnumerator,
    E::Item: Clone,
{
    type Item = BridgeResult<E::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let blocker = match self.blocker.take() {
            Some(blocker) => blocker,
            None => match Blocker::detect() {
                Ok(blocker) => blocker,
                Err(err) => {
                    self.finish();
                    return Some(Err(err));
                }
            },
        };
        let step = blocker.block_on(self.enumerator.move_next(CancellationToken::new()));
        self.blocker = Some(blocker);

        match step {
            Ok(true) => match self.enumerator.current() {
                Some(item) => Some(Ok(item.clone())),
                None => {
                    warn!("enumerator reported an element but exposed no current value");
                    self.finish();
                    Some(Err(BridgeError::MissingCurrent))
                }
            },
            Ok(false) => {
                self.finish();
                None
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }
}

impl<E> FusedIterator for Drain<E>
where
    E: AsyncEnumerator,
    E::Item: Clone,
{
}

impl<E: AsyncEnumerator> Drop for Drain<E> {
    fn drop(&mut self) {
        self.finish();
        if let Some(Blocker::Owned(runtime)) = self.blocker.take() {
            // a drain abandoned inside async code must not block on runtime teardown
            runtime.shutdown_background();
        }
    }
}
