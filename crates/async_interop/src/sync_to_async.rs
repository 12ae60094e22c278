//! Exposes a synchronous iterator as an [`AsyncEnumerable`].
//!
//! Every enumeration clones the source and takes ownership of a fresh
//! iterator. Each advance runs `Iterator::next` off the calling task (on the
//! Tokio blocking pool, or a dedicated thread when no runtime is current) and
//! reports the outcome through a [`PendingResult`], which a cancellation token
//! may resolve first.
//!
//! The iterator is released (dropped) exactly once: when it is exhausted, when
//! it fails, or when the enumerator is disposed, whichever happens first. A
//! worker still running after a cancellation keeps the iterator until it
//! returns, then drops it itself if the enumerator was disposed meanwhile.
//! The next advance waits for that worker to hand the iterator back before it
//! schedules its own step.

use crate::config::{BridgeConfig, OffloadMode};
use crate::enumerable::{AsyncEnumerable, AsyncEnumerator};
use crate::error::{BridgeError, BridgeResult};
use crate::pending::{PendingResult, Resolution, Resolver};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Adapts an iterator of plain items into one of `Result<_, Infallible>` items.
#[derive(Debug, Clone)]
pub struct Unfailing<S>(S);

impl<S: IntoIterator> IntoIterator for Unfailing<S> {
    type Item = Result<S::Item, Infallible>;
    type IntoIter = std::iter::Map<S::IntoIter, fn(S::Item) -> Result<S::Item, Infallible>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0
            .into_iter()
            .map(Ok as fn(S::Item) -> Result<S::Item, Infallible>)
    }
}

/// Asynchronous view of a re-iterable synchronous sequence.
#[derive(Debug, Clone)]
pub struct SyncToAsync<S> {
    source: S,
    config: BridgeConfig,
}

impl<S> SyncToAsync<Unfailing<S>> {
    /// Wraps a sequence whose items cannot fail.
    pub fn new(source: S) -> Self {
        Self {
            source: Unfailing(source),
            config: BridgeConfig::default(),
        }
    }

    /// Like [`new`](Self::new), rejecting an absent source.
    pub fn create(source: Option<S>) -> BridgeResult<Self> {
        source
            .map(Self::new)
            .ok_or(BridgeError::NullArgument("source"))
    }
}

impl<S> SyncToAsync<S> {
    /// Wraps a sequence of `Result` items. An `Err` item fails the step that
    /// produced it and ends the enumeration.
    pub fn fallible(source: S) -> Self {
        Self {
            source,
            config: BridgeConfig::default(),
        }
    }

    /// Like [`fallible`](Self::fallible), rejecting an absent source.
    pub fn create_fallible(source: Option<S>) -> BridgeResult<Self> {
        source
            .map(Self::fallible)
            .ok_or(BridgeError::NullArgument("source"))
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl<S, T, E> AsyncEnumerable for SyncToAsync<S>
where
    S: IntoIterator<Item = Result<T, E>> + Clone,
    S::IntoIter: Send + 'static,
    T: Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    type Item = T;
    type Enumerator = SyncToAsyncEnumerator<S::IntoIter, T>;

    fn enumerator(&self) -> Self::Enumerator {
        SyncToAsyncEnumerator::new(self.source.clone().into_iter(), self.config.clone())
    }
}

/// Converts any cloneable sequence into a [`SyncToAsync`].
pub trait IntoAsyncEnumerable: IntoIterator + Clone + Sized {
    fn into_async_enumerable(self) -> SyncToAsync<Unfailing<Self>> {
        SyncToAsync::new(self)
    }
}

impl<S: IntoIterator + Clone> IntoAsyncEnumerable for S {}

enum SlotState<I> {
    Idle(I),
    InFlight,
    Released,
}

/// Exclusive owner of the iterator for one enumeration.
struct HandleSlot<I> {
    state: Mutex<SlotState<I>>,
    handed_back: Notify,
}

impl<I> HandleSlot<I> {
    fn new(iter: I) -> Self {
        Self {
            state: Mutex::new(SlotState::Idle(iter)),
            handed_back: Notify::new(),
        }
    }

    /// Waits until no step holds the iterator.
    ///
    /// A worker from a canceled advance keeps running until its step returns;
    /// the next advance must not be scheduled before that.
    async fn settled(&self, cancel: &CancellationToken) -> BridgeResult<()> {
        loop {
            let handed_back = self.handed_back.notified();
            if !self.in_flight() {
                return Ok(());
            }
            tokio::select! {
                _ = handed_back => {}
                _ = cancel.cancelled() => return Err(BridgeError::Canceled),
            }
        }
    }

    fn in_flight(&self) -> bool {
        matches!(*self.state.lock(), SlotState::InFlight)
    }

    /// Moves the iterator out for a step, or `None` once it has been released.
    ///
    /// Callers wait for [`settled`](Self::settled) first, so the slot is never
    /// found in flight here.
    fn checkout(&self) -> Option<I> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, SlotState::InFlight) {
            SlotState::Idle(iter) => Some(iter),
            other => {
                *state = other;
                None
            }
        }
    }

    /// Hands the iterator back after a step, dropping it if the step was
    /// terminal or the slot was released while the step ran.
    fn checkin(&self, iter: I, terminal: bool) {
        let mut state = self.state.lock();
        let keep = !terminal && matches!(*state, SlotState::InFlight);
        if keep {
            *state = SlotState::Idle(iter);
            drop(state);
            self.handed_back.notify_waiters();
            return;
        }
        *state = SlotState::Released;
        drop(state);
        drop(iter);
        self.handed_back.notify_waiters();
        trace!("iteration handle released by worker");
    }

    fn release(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), SlotState::Released);
        match previous {
            SlotState::Idle(iter) => {
                drop(iter);
                trace!("iteration handle released on dispose");
            }
            SlotState::InFlight => {
                debug!("dispose requested while a step is in flight; worker will release");
            }
            SlotState::Released => {}
        }
    }
}

/// Runs one synchronous step and reports it.
fn run_step<I, T, E>(slot: &HandleSlot<I>, resolver: Resolver<Option<T>>)
where
    I: Iterator<Item = Result<T, E>>,
    E: StdError + Send + Sync + 'static,
{
    let Some(mut iter) = slot.checkout() else {
        resolver.resolve(Resolution::Completed(None));
        return;
    };

    let (resolution, terminal) = match catch_unwind(AssertUnwindSafe(|| iter.next())) {
        Ok(Some(Ok(item))) => (Resolution::Completed(Some(item)), false),
        Ok(None) => (Resolution::Completed(None), true),
        Ok(Some(Err(err))) => (Resolution::Failed(BridgeError::iteration(err)), true),
        Err(payload) => (Resolution::Failed(BridgeError::from_panic(payload)), true),
    };
    slot.checkin(iter, terminal);

    if !resolver.resolve(resolution) {
        trace!("step finished after the advance was canceled; result discarded");
    }
}

/// Enumerator produced by [`SyncToAsync`].
pub struct SyncToAsyncEnumerator<I, T> {
    slot: Arc<HandleSlot<I>>,
    current: Option<T>,
    config: BridgeConfig,
}

impl<I, T> SyncToAsyncEnumerator<I, T> {
    fn new(iter: I, config: BridgeConfig) -> Self {
        Self {
            slot: Arc::new(HandleSlot::new(iter)),
            current: None,
            config,
        }
    }
}

impl<I, T, E> SyncToAsyncEnumerator<I, T>
where
    I: Iterator<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    fn offload(&self, resolver: Resolver<Option<T>>) {
        let slot = self.slot.clone();
        if let Ok(handle) = Handle::try_current() {
            // detached: the pending result is the only channel back
            drop(handle.spawn_blocking(move || run_step(&slot, resolver)));
            return;
        }

        let spawned = std::thread::Builder::new()
            .name(self.config.worker_thread_name.clone())
            .spawn(move || run_step(&slot, resolver));
        if let Err(err) = spawned {
            // the dropped resolver fails the pending step
            warn!("failed to spawn iteration worker thread: {}", err);
        }
    }
}

#[async_trait]
impl<I, T, E> AsyncEnumerator for SyncToAsyncEnumerator<I, T>
where
    I: Iterator<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    type Item = T;

    async fn move_next(&mut self, cancel: CancellationToken) -> BridgeResult<bool> {
        self.current = None;
        if cancel.is_cancelled() {
            debug!("advance canceled before the step was scheduled");
            return Err(BridgeError::Canceled);
        }
        if let Err(err) = self.slot.settled(&cancel).await {
            debug!("advance canceled while the previous step still held the iterator");
            return Err(err);
        }

        let (resolver, pending) = PendingResult::channel();
        match self.config.offload {
            OffloadMode::Inline => run_step(&self.slot, resolver),
            OffloadMode::Worker => self.offload(resolver),
        }

        match pending.wait_or_cancel(&cancel).await {
            Resolution::Completed(Some(item)) => {
                self.current = Some(item);
                Ok(true)
            }
            Resolution::Completed(None) => Ok(false),
            Resolution::Failed(err) => {
                debug!("synchronous step failed: {}", err);
                Err(err)
            }
            Resolution::Canceled => {
                debug!("advance canceled while the step was in flight");
                Err(BridgeError::Canceled)
            }
        }
    }

    fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    fn dispose(&mut self) {
        self.current = None;
        self.slot.release();
    }
}

impl<I, T> Drop for SyncToAsyncEnumerator<I, T> {
    fn drop(&mut self) {
        self.slot.release();
    }
}
