//! Pull-based asynchronous sequence contract.
//!
//! An [`AsyncEnumerable`] hands out a fresh [`AsyncEnumerator`] per
//! enumeration. Enumerators are advanced with [`AsyncEnumerator::move_next`],
//! read with [`AsyncEnumerator::current`] and released with
//! [`AsyncEnumerator::dispose`]. Every adapter in this crate produces or
//! consumes these two traits.

use crate::drain::Drain;
use crate::error::BridgeResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Cursor over one enumeration of an asynchronous sequence.
#[async_trait]
pub trait AsyncEnumerator: Send {
    type Item: Send;

    /// Advances to the next element.
    ///
    /// Resolves `Ok(true)` when an element is available through
    /// [`current`](Self::current), `Ok(false)` once the sequence is exhausted,
    /// and `Err` when the step failed or was canceled. A new advance must not be
    /// issued before the previous one resolved.
    async fn move_next(&mut self, cancel: CancellationToken) -> BridgeResult<bool>;

    /// The element produced by the last successful advance.
    fn current(&self) -> Option<&Self::Item>;

    /// Releases any resource held by the enumerator. Idempotent.
    fn dispose(&mut self);
}

/// An asynchronous sequence that can be enumerated any number of times.
pub trait AsyncEnumerable {
    type Item: Send;
    type Enumerator: AsyncEnumerator<Item = Self::Item>;

    /// Starts a new, independent enumeration.
    fn enumerator(&self) -> Self::Enumerator;
}

/// Enumerable built from a factory producing one enumerator per enumeration.
#[derive(Clone)]
pub struct FromFn<F> {
    factory: F,
}

/// Builds an [`AsyncEnumerable`] from an enumerator factory.
pub fn from_fn<F, E>(factory: F) -> FromFn<F>
where
    F: Fn() -> E,
    E: AsyncEnumerator,
{
    FromFn { factory }
}

impl<F, E> AsyncEnumerable for FromFn<F>
where
    F: Fn() -> E,
    E: AsyncEnumerator,
{
    type Item = E::Item;
    type Enumerator = E;

    fn enumerator(&self) -> E {
        (self.factory)()
    }
}

/// Blocking consumption helpers for any [`AsyncEnumerable`].
pub trait AsyncEnumerableExt: AsyncEnumerable {
    /// Lazily drains a new enumeration on the calling thread.
    fn to_blocking_iter(&self) -> Drain<Self::Enumerator>
    where
        Self::Item: Clone,
    {
        Drain::new(self.enumerator())
    }

    /// Drains a new enumeration into a vector, stopping at the first error.
    fn collect_blocking(&self) -> BridgeResult<Vec<Self::Item>>
    where
        Self::Item: Clone,
    {
        self.to_blocking_iter().collect()
    }
}

impl<A: AsyncEnumerable + ?Sized> AsyncEnumerableExt for A {}
