//! Reporter sinks for finished traces.
//!
//! A reporter receives one encoded batch per terminated trace. Ingestion is
//! best-effort: the trace actor never waits on delivery, failures are logged
//! and discarded, and nothing is retried.

#[cfg(feature = "reqwest-client")]
mod http;

#[cfg(feature = "reqwest-client")]
pub use http::{HttpReporter, HttpReporterBuilder};

use crate::model::Span;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// A sink for completed traces.
///
/// `ingest` is called once per trace, on the trace actor's task, with the
/// full encoded span list. Implementations must not block: hand the batch
/// off to a queue or a spawned task and return.
pub trait Reporter: Send + Sync + Debug {
    /// Accept one trace's span batch.
    fn ingest(&self, batch: Vec<Span>);
}

/// A reporter that discards every batch. This is the process default until
/// another reporter is configured.
#[derive(Clone, Debug, Default)]
pub struct NoopReporter {
    _private: (),
}

impl NoopReporter {
    /// Create a new noop reporter.
    pub fn new() -> Self {
        NoopReporter::default()
    }
}

impl Reporter for NoopReporter {
    fn ingest(&self, _batch: Vec<Span>) {}
}

/// A reporter that stores batches in memory.
///
/// Useful for tests and debugging; clones share the same storage.
///
/// # Example
/// ```
/// use zipline::{InMemoryReporter, Reporter};
///
/// let reporter = InMemoryReporter::default();
/// reporter.ingest(vec![]);
/// assert_eq!(reporter.batches().len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryReporter {
    batches: Arc<Mutex<Vec<Vec<Span>>>>,
}

impl InMemoryReporter {
    /// Create a new empty in-memory reporter.
    pub fn new() -> Self {
        InMemoryReporter::default()
    }

    /// The batches ingested so far, one per terminated trace.
    pub fn batches(&self) -> Vec<Vec<Span>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// All ingested spans, flattened across batches.
    pub fn spans(&self) -> Vec<Span> {
        self.batches().into_iter().flatten().collect()
    }

    /// Clears the internal storage.
    pub fn reset(&self) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.clear();
        }
    }
}

impl Reporter for InMemoryReporter {
    fn ingest(&self, batch: Vec<Span>) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch);
        }
    }
}
