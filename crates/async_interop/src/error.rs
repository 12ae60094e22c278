//! Error types for the async interop adapters.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for adapter operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Shared, type-erased error produced by a wrapped iterator or computation.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced by the sync/async adapters.
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    /// A required sequence or computation argument was absent.
    #[error("argument '{0}' must not be null")]
    NullArgument(&'static str),

    /// The wrapped iterator or computation failed; the error is kept as-is.
    #[error("iteration failed: {0}")]
    IterationFailure(#[source] SharedError),

    /// The in-flight step was canceled before it resolved.
    #[error("iteration step was canceled")]
    Canceled,

    /// An enumerator reported an element without exposing it.
    #[error("enumerator reported an element but exposed no current value")]
    MissingCurrent,

    /// The synchronous step panicked on its worker.
    #[error("iteration worker panicked: {0}")]
    WorkerPanicked(String),

    /// A blocking runtime for draining could not be built.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Configuration was invalid or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BridgeError {
    /// Wraps a failure raised by the underlying sequence.
    pub fn iteration<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        BridgeError::IterationFailure(Arc::new(err))
    }

    pub fn runtime<E: ToString>(err: E) -> Self {
        BridgeError::Runtime(err.to_string())
    }

    pub fn config<E: ToString>(err: E) -> Self {
        BridgeError::Config(err.to_string())
    }

    /// Returns true when the step resolved as canceled rather than failed.
    pub fn is_canceled(&self) -> bool {
        matches!(self, BridgeError::Canceled)
    }

    /// The original error raised by the wrapped sequence, if any.
    pub fn failure_source(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            BridgeError::IterationFailure(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Converts a captured panic payload into an error.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&'static str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "unknown panic payload".to_string()
        };
        BridgeError::WorkerPanicked(message)
    }
}

impl From<toml::de::Error> for BridgeError {
    fn from(err: toml::de::Error) -> Self {
        BridgeError::config(err)
    }
}
