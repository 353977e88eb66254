//! The trace lifecycle API.
//!
//! Callers hold an immutable [`TraceHandle`] naming a trace and their
//! current span. Every recording operation resolves the handle through the
//! process-wide registry and enqueues one event on the owning trace actor's
//! mailbox; nothing on the recording path blocks or fails. The actor owns
//! the span tree, enforces the idle TTL, and reports the finished trace
//! exactly once.

pub(crate) mod actor;
pub(crate) mod handle;
pub(crate) mod id;
pub(crate) mod registry;
pub(crate) mod span;
pub(crate) mod supervisor;
pub(crate) mod tracer;

pub use handle::TraceHandle;
pub use id::{SpanId, TraceId};
pub use span::{AnnotationValue, BinaryValue, Delta, Parent};
pub use supervisor::{CallerGuard, CallerMonitor};
pub use tracer::{
    finish, finish_span, join, start, start_span, update_span, FinishOptions, SpanOptions,
    TraceKind, TraceOptions, UpdateOptions,
};

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors surfaced when starting or joining a trace, or building a
/// reporter. Nothing on the recording path after a successful start is
/// fatal to the caller.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// The trace TTL must be non-zero.
    #[error("trace TTL must be non-zero")]
    InvalidTtl,

    /// Recording a trace spawns its actor on the ambient tokio runtime;
    /// there is none.
    #[error("no tokio runtime available to host the trace actor")]
    NoRuntime,

    /// The collector endpoint handed to a reporter builder is not a URL.
    #[error("invalid collector endpoint: {0}")]
    InvalidCollectorEndpoint(String),
}

/// Microseconds since the Unix epoch, captured on the caller side before an
/// event is sent.
pub(crate) fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_micros() as u64
}
