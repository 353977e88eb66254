use crate::config;
use crate::model::Endpoint;
use crate::reporter::Reporter;
use crate::trace::actor::{StartArgs, TraceEvent};
use crate::trace::handle::TraceHandle;
use crate::trace::id::{SpanId, TraceId};
use crate::trace::span::{Delta, Parent};
use crate::trace::supervisor::{self, CallerMonitor};
use crate::trace::{now_micros, registry, TraceError};
use std::sync::Arc;
use std::time::Duration;

/// Whether the local host is the client or the server side of the traced
/// operation. Decides the implicit root annotation (`cs` vs `sr`) and which
/// address tag (`sa` vs `ca`) a remote endpoint produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceKind {
    /// This process initiated the operation.
    Client,
    /// This process is serving a propagated operation.
    Server,
}

/// Options for [`start`] and [`join`].
#[derive(Debug, Default)]
pub struct TraceOptions {
    name: Option<String>,
    sample: bool,
    debug: bool,
    kind: Option<TraceKind>,
    remote: Option<Endpoint>,
    annotations: Vec<Delta>,
    ttl: Option<Duration>,
    reporter: Option<Arc<dyn Reporter>>,
    endpoint: Option<Endpoint>,
    monitor: Option<CallerMonitor>,
}

impl TraceOptions {
    /// Name the root span.
    pub fn with_name<T: Into<String>>(mut self, name: T) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record this trace. Defaults to `false`: an unsampled trace costs one
    /// handle and nothing else.
    pub fn with_sample(mut self, sample: bool) -> Self {
        self.sample = sample;
        self
    }

    /// Force recording regardless of the sampling decision.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The side of the operation this host is on. [`start`] defaults to
    /// [`TraceKind::Client`], [`join`] to [`TraceKind::Server`].
    pub fn with_kind(mut self, kind: TraceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// The remote peer, recorded as an `sa`/`ca` address tag on the root
    /// span.
    pub fn with_remote(mut self, remote: Endpoint) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Initial deltas applied to the root span at its start timestamp.
    pub fn with_annotations(mut self, annotations: Vec<Delta>) -> Self {
        self.annotations = annotations;
        self
    }

    /// Idle TTL for this trace; the process default when unset.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Reporter override for this trace.
    pub fn with_reporter<R: Reporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Local endpoint override; the configured process endpoint when unset.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Attach a caller-liveness monitor; see
    /// [`CallerGuard`](crate::CallerGuard).
    pub fn with_monitor(mut self, monitor: CallerMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }
}

/// Options for [`start_span`].
#[derive(Clone, Debug, Default)]
pub struct SpanOptions {
    name: Option<String>,
    local: Option<String>,
    annotations: Vec<Delta>,
}

impl SpanOptions {
    /// Name the span.
    pub fn with_name<T: Into<String>>(mut self, name: T) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark the span as a named local component (the `lc` tag).
    pub fn with_local<T: Into<String>>(mut self, component: T) -> Self {
        self.local = Some(component.into());
        self
    }

    /// Initial deltas applied at the span's start timestamp.
    pub fn with_annotations(mut self, annotations: Vec<Delta>) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Options for [`update_span`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateOptions {
    timestamp: Option<u64>,
}

impl UpdateOptions {
    /// Apply the deltas at this timestamp (microseconds since the Unix
    /// epoch) instead of now.
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Options for [`finish`].
#[derive(Clone, Debug, Default)]
pub struct FinishOptions {
    async_trace: bool,
    annotations: Vec<Delta>,
}

impl FinishOptions {
    /// Close the root span but keep the trace alive until its remaining
    /// spans finish (or the idle TTL expires).
    pub fn with_async(mut self, async_trace: bool) -> Self {
        self.async_trace = async_trace;
        self
    }

    /// Final deltas applied to the root span at the finish timestamp.
    pub fn with_annotations(mut self, annotations: Vec<Delta>) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Begin a new trace in this process.
///
/// Returns the handle naming the trace and its root span. When the trace is
/// recorded (`sample` or `debug` set) this also spawns the trace's
/// supervised actor, so it must be called within a tokio runtime; an
/// unsampled start is pure handle construction and never fails.
pub fn start(opts: TraceOptions) -> Result<TraceHandle, TraceError> {
    let trace_id = TraceId::generate();
    let span_id = SpanId::generate();
    begin(trace_id, span_id, Parent::Root, opts.sample, TraceKind::Client, opts)
}

/// Begin a trace actor for a trace propagated from an upstream peer.
///
/// `trace_id`, `span_id`, and `parent` arrive from propagation headers;
/// `sampled` and `debug` carry the upstream decision. Options are as for
/// [`start`], except the kind defaults to [`TraceKind::Server`].
pub fn join(
    trace_id: TraceId,
    span_id: SpanId,
    parent: Parent,
    sampled: bool,
    debug: bool,
    opts: TraceOptions,
) -> Result<TraceHandle, TraceError> {
    let opts = TraceOptions {
        debug: debug || opts.debug,
        ..opts
    };
    begin(trace_id, span_id, parent, sampled, TraceKind::Server, opts)
}

fn begin(
    trace_id: TraceId,
    span_id: SpanId,
    parent: Parent,
    sampled: bool,
    default_kind: TraceKind,
    opts: TraceOptions,
) -> Result<TraceHandle, TraceError> {
    let handle = TraceHandle::new(trace_id, span_id, sampled, opts.debug);
    if !handle.is_recording() {
        return Ok(handle);
    }

    let config = config::current();
    let ttl = opts.ttl.unwrap_or_else(|| config.default_ttl());
    if ttl.is_zero() {
        return Err(TraceError::InvalidTtl);
    }
    if tokio::runtime::Handle::try_current().is_err() {
        return Err(TraceError::NoRuntime);
    }

    let args = StartArgs {
        trace_id,
        span_id,
        parent,
        name: opts.name,
        timestamp: now_micros(),
        kind: opts.kind.unwrap_or(default_kind),
        remote: opts.remote,
        annotations: opts.annotations,
        debug: opts.debug,
        ttl,
        reporter: opts.reporter.unwrap_or_else(|| config.reporter()),
        endpoint: opts.endpoint.unwrap_or_else(|| config.local_endpoint()),
    };
    supervisor::spawn(args, opts.monitor);
    Ok(handle)
}

/// Start a child span of the handle's current span.
///
/// Returns a new handle positioned at the child. Calling this repeatedly on
/// one handle, from any number of threads, produces sibling spans sharing
/// the same parent.
pub fn start_span(handle: &TraceHandle, opts: SpanOptions) -> TraceHandle {
    if handle.is_ignore() {
        return handle.clone();
    }

    let span_id = SpanId::generate();
    let child = handle.push(span_id);
    if let (true, Some(trace_id), Some(parent)) =
        (handle.is_recording(), handle.trace_id(), handle.span_id())
    {
        let mut deltas = opts.annotations;
        if let Some(component) = opts.local {
            deltas.push(Delta::binary_annotate("lc", component));
        }
        registry::send(
            trace_id,
            TraceEvent::StartSpan {
                span_id,
                parent: Parent::Span(parent),
                name: opts.name,
                timestamp: now_micros(),
                deltas,
            },
        );
    }
    child
}

/// Finish the handle's current span, applying any final deltas first.
///
/// Returns the handle positioned back at the parent: the handle that was
/// input to the matching [`start_span`].
pub fn finish_span(handle: &TraceHandle, annotations: Vec<Delta>) -> TraceHandle {
    if handle.is_ignore() {
        return handle.clone();
    }

    if let (true, Some(trace_id), Some(span_id)) =
        (handle.is_recording(), handle.trace_id(), handle.span_id())
    {
        registry::send(
            trace_id,
            TraceEvent::FinishSpan {
                span_id,
                timestamp: now_micros(),
                deltas: annotations,
            },
        );
    }
    handle.pop()
}

/// Apply deltas to the handle's current span. Returns the handle unchanged.
pub fn update_span(handle: &TraceHandle, deltas: Vec<Delta>, opts: UpdateOptions) -> TraceHandle {
    if let (true, Some(trace_id), Some(span_id)) =
        (handle.is_recording(), handle.trace_id(), handle.span_id())
    {
        registry::send(
            trace_id,
            TraceEvent::Update {
                span_id,
                timestamp: opts.timestamp.unwrap_or_else(now_micros),
                deltas,
            },
        );
    }
    handle.clone()
}

/// Finish the trace.
///
/// Closes the root span. With [`FinishOptions::with_async`] the trace stays
/// alive for its remaining spans; otherwise it terminates now, and the
/// reporter receives the encoded batch.
pub fn finish(handle: TraceHandle, opts: FinishOptions) {
    if let (true, Some(trace_id)) = (handle.is_recording(), handle.trace_id()) {
        registry::send(
            trace_id,
            TraceEvent::Finish {
                timestamp: now_micros(),
                async_trace: opts.async_trace,
                annotations: opts.annotations,
            },
        );
    }
}
