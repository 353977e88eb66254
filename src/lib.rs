//! # Zipline
//!
//! An embedded distributed-tracing client producing traces for a
//! Zipkin-style collector.
//!
//! Applications instrument their code with span start/finish and annotation
//! calls against an immutable [`TraceHandle`]. For each sampled trace a
//! dedicated actor task owns the span tree, so the calling path does
//! minimum work: every operation is a fire-and-forget message. Abandoned
//! traces are timed out by an idle TTL, and each finished trace is encoded
//! once as a Zipkin v1 span batch and handed to a pluggable [`Reporter`].
//!
//! ## Quickstart
//!
//! ```no_run
//! use zipline::{Config, Delta, FinishOptions, HttpReporter, SpanOptions, TraceOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     zipline::configure(
//!         Config::default()
//!             .with_system_id("checkout")
//!             .with_reporter(HttpReporter::builder().build().unwrap()),
//!     );
//!
//!     let trace = zipline::start(
//!         TraceOptions::default().with_name("checkout").with_sample(true),
//!     )
//!     .unwrap();
//!
//!     let span = zipline::start_span(&trace, SpanOptions::default().with_name("db.query"));
//!     // ... do the work ...
//!     let trace = zipline::finish_span(&span, vec![Delta::binary_annotate("db.rows", 42i64)]);
//!
//!     zipline::finish(trace, FinishOptions::default());
//! }
//! ```
//!
//! Handles are plain values: clone them across threads, start parallel
//! spans from one handle, or drop them after the trace actor is gone;
//! every operation degrades to a silent no-op. Unsampled traces and the
//! [`TraceHandle::IGNORE`] handle never touch the actor machinery at all.

#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

#[macro_use]
extern crate typed_builder;

mod config;
mod internal_logging;
mod model;
mod reporter;
mod trace;

pub use config::{configure, Config, DEFAULT_TTL};
pub use model::{Annotation, AnnotationType, BinaryAnnotation, Endpoint, Span, Value};
#[cfg(feature = "reqwest-client")]
pub use reporter::{HttpReporter, HttpReporterBuilder};
pub use reporter::{InMemoryReporter, NoopReporter, Reporter};
pub use trace::{
    finish, finish_span, join, start, start_span, update_span, AnnotationValue, BinaryValue,
    CallerGuard, CallerMonitor, Delta, FinishOptions, Parent, SpanId, SpanOptions, TraceError,
    TraceHandle, TraceId, TraceKind, TraceOptions, UpdateOptions,
};
