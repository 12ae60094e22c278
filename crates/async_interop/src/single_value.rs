//! One deferred computation exposed as a sequence of at most one element.

use crate::enumerable::{AsyncEnumerable, AsyncEnumerator};
use crate::error::{BridgeError, BridgeResult};
use crate::gate::OneShotGate;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};
use std::error::Error as StdError;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::trace;

type Computation<T> = Shared<BoxFuture<'static, BridgeResult<T>>>;

/// Asynchronous sequence yielding the result of a single computation.
///
/// The computation starts on the first advance of the first enumeration and
/// is evaluated at most once; every enumeration observes the same result.
#[derive(Clone)]
pub struct SingleValue<T: Clone> {
    computation: Computation<T>,
}

impl<T> SingleValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self::from_boxed(future.map(Ok).boxed())
    }

    /// Wraps a computation that may fail. Its error is reported by the
    /// advance that evaluated it.
    pub fn fallible<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        Self::from_boxed(future.map_err(BridgeError::iteration).boxed())
    }

    pub fn create<F>(future: Option<F>) -> BridgeResult<Self>
    where
        F: Future<Output = T> + Send + 'static,
    {
        future
            .map(Self::new)
            .ok_or(BridgeError::NullArgument("computation"))
    }

    pub fn create_fallible<F, E>(future: Option<F>) -> BridgeResult<Self>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        future
            .map(Self::fallible)
            .ok_or(BridgeError::NullArgument("computation"))
    }

    fn from_boxed(future: BoxFuture<'static, BridgeResult<T>>) -> Self {
        Self {
            computation: future.shared(),
        }
    }
}

impl<T> AsyncEnumerable for SingleValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;
    type Enumerator = SingleValueEnumerator<T>;

    fn enumerator(&self) -> SingleValueEnumerator<T> {
        SingleValueEnumerator {
            computation: self.computation.clone(),
            gate: OneShotGate::new(),
            value: None,
        }
    }
}

/// Enumerator produced by [`SingleValue`].
///
/// Only the advance that claims the gate awaits the computation. Any other
/// advance, including one issued after the claiming advance was abandoned
/// mid-flight, reports the end of the sequence without waiting.
pub struct SingleValueEnumerator<T: Clone> {
    computation: Computation<T>,
    gate: OneShotGate,
    value: Option<T>,
}

#[async_trait]
impl<T> AsyncEnumerator for SingleValueEnumerator<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    async fn move_next(&mut self, _cancel: CancellationToken) -> BridgeResult<bool> {
        self.value = None;
        if !self.gate.try_claim() {
            return Ok(false);
        }

        trace!("evaluating single value computation");
        let value = self.computation.clone().await?;
        self.value = Some(value);
        Ok(true)
    }

    fn current(&self) -> Option<&T> {
        self.value.as_ref()
    }

    fn dispose(&mut self) {}
}
