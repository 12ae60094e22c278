//! Shared helpers for the integration suites.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError(pub &'static str);

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source error: {}", self.0)
    }
}

impl std::error::Error for SourceError {}

/// Re-iterable sequence whose iterators report every release.
#[derive(Clone)]
pub struct ReleaseCounting<T> {
    items: Vec<T>,
    released: Arc<AtomicUsize>,
}

impl<T> ReleaseCounting<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

pub struct ReleaseCountingIter<T> {
    inner: std::vec::IntoIter<T>,
    released: Arc<AtomicUsize>,
}

impl<T> Iterator for ReleaseCountingIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }
}

impl<T> Drop for ReleaseCountingIter<T> {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T> IntoIterator for ReleaseCounting<T> {
    type Item = T;
    type IntoIter = ReleaseCountingIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        ReleaseCountingIter {
            inner: self.items.into_iter(),
            released: self.released,
        }
    }
}
