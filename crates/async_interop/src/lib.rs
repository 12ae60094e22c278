//! Neo async interop
//!
//! Adapters between pull-based synchronous iteration (`Iterator`) and
//! pull-based asynchronous iteration ([`AsyncEnumerable`]):
//!
//! - [`SyncToAsync`] exposes a re-iterable synchronous sequence as an
//!   asynchronous one, running each step off the calling task with support for
//!   cancellation.
//! - [`drain`] / [`AsyncEnumerableExt::to_blocking_iter`] consume an
//!   asynchronous sequence by blocking the calling thread per step.
//! - [`SingleValue`] exposes one deferred computation as a sequence of at most
//!   one element.
//!
//! ```no_run
//! use neo_async_interop::{AsyncEnumerableExt, IntoAsyncEnumerable, SingleValue};
//!
//! let numbers = vec![1, 2, 3].into_async_enumerable();
//! assert_eq!(numbers.collect_blocking().unwrap(), vec![1, 2, 3]);
//!
//! let answer = SingleValue::new(async { 7 });
//! assert_eq!(answer.collect_blocking().unwrap(), vec![7]);
//! ```

pub mod config;
pub mod drain;
pub mod enumerable;
pub mod error;
pub mod gate;
pub mod pending;
pub mod single_value;
pub mod sync_to_async;

pub use config::{BridgeConfig, OffloadMode};
pub use drain::{drain, Drain};
pub use enumerable::{from_fn, AsyncEnumerable, AsyncEnumerableExt, AsyncEnumerator, FromFn};
pub use error::{BridgeError, BridgeResult, SharedError};
pub use gate::OneShotGate;
pub use pending::{PendingResult, Resolution, Resolver};
pub use single_value::{SingleValue, SingleValueEnumerator};
pub use sync_to_async::{IntoAsyncEnumerable, SyncToAsync, SyncToAsyncEnumerator, Unfailing};

pub use tokio_util::sync::CancellationToken;
