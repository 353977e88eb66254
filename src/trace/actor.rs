use crate::model::{self, Endpoint};
use crate::reporter::Reporter;
use crate::trace::id::{SpanId, TraceId};
use crate::trace::registry;
use crate::trace::span::{AnnotationValue, BinaryValue, Delta, Parent, SpanRecord};
use crate::trace::supervisor::CallerMonitor;
use crate::trace::{now_micros, TraceKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tokio::time::{sleep_until, Instant};

/// An asynchronous mutation of one trace. Events are fire-and-forget: the
/// caller never learns whether an event was applied or dropped.
#[derive(Debug)]
pub(crate) enum TraceEvent {
    StartSpan {
        span_id: SpanId,
        parent: Parent,
        name: Option<String>,
        timestamp: u64,
        deltas: Vec<Delta>,
    },
    FinishSpan {
        span_id: SpanId,
        timestamp: u64,
        deltas: Vec<Delta>,
    },
    Update {
        span_id: SpanId,
        timestamp: u64,
        deltas: Vec<Delta>,
    },
    Finish {
        timestamp: u64,
        async_trace: bool,
        annotations: Vec<Delta>,
    },
}

/// Why the terminal sweep ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SweepCause {
    /// `finish` completed the trace (directly, or once async children
    /// closed).
    Finished,
    /// The idle TTL expired, or the mailbox closed with the trace still
    /// open.
    Timeout,
    /// The monitored caller went away.
    CallerExit,
}

/// The arguments a trace actor is (re)started from. Retained by the
/// supervisor so a crashed actor can be replaced by a fresh one seeded the
/// same way.
#[derive(Clone, Debug)]
pub(crate) struct StartArgs {
    pub(crate) trace_id: TraceId,
    pub(crate) span_id: SpanId,
    pub(crate) parent: Parent,
    pub(crate) name: Option<String>,
    pub(crate) timestamp: u64,
    pub(crate) kind: TraceKind,
    pub(crate) remote: Option<Endpoint>,
    pub(crate) annotations: Vec<Delta>,
    pub(crate) debug: bool,
    pub(crate) ttl: Duration,
    pub(crate) reporter: Arc<dyn Reporter>,
    pub(crate) endpoint: Endpoint,
}

/// The per-trace single-writer lifecycle engine.
///
/// One actor owns one trace's span tree. It applies mailbox events in FIFO
/// order, re-arms an idle deadline on every event, and terminates exactly
/// once: by `finish`, by TTL expiry, or by caller exit. Termination runs the
/// terminal sweep, hands the encoded batch to the reporter, deregisters the
/// trace, and drops the actor.
pub(crate) struct TraceActor {
    trace_id: TraceId,
    root_span_id: SpanId,
    spans: HashMap<SpanId, SpanRecord>,
    debug: bool,
    ttl: Duration,
    reporter: Arc<dyn Reporter>,
    endpoint: Endpoint,
    async_terminating: bool,
}

impl TraceActor {
    /// Seed a fresh actor from its start arguments: the root span opens at
    /// the trace's start timestamp with the implicit `cs`/`sr` annotation,
    /// the `sa`/`ca` remote address tag when a remote peer was named, and
    /// any caller-supplied initial deltas.
    pub(crate) fn new(args: &StartArgs) -> Self {
        let mut actor = TraceActor {
            trace_id: args.trace_id,
            root_span_id: args.span_id,
            spans: HashMap::new(),
            debug: args.debug,
            ttl: args.ttl,
            reporter: args.reporter.clone(),
            endpoint: args.endpoint.clone(),
            async_terminating: false,
        };

        let mut root = SpanRecord::new(
            args.span_id,
            args.parent,
            args.name.clone(),
            args.timestamp,
        );
        let implicit = match args.kind {
            TraceKind::Client => AnnotationValue::ClientSend,
            TraceKind::Server => AnnotationValue::ServerRecv,
        };
        root.annotate(implicit, args.timestamp, None);
        if let Some(remote) = &args.remote {
            let key = match args.kind {
                TraceKind::Client => "sa",
                TraceKind::Server => "ca",
            };
            root.binary_annotate(key.to_owned(), BinaryValue::Bool(true), Some(remote.clone()));
        }
        actor.spans.insert(args.span_id, root);
        actor.apply_deltas(args.span_id, args.timestamp, args.annotations.clone());
        actor
    }

    /// Run the actor until it terminates. `mailbox` delivers events in
    /// submission order per sender; `monitor` resolves if the initiating
    /// caller goes away before disarming its guard.
    pub(crate) async fn run(
        mut self,
        mut mailbox: UnboundedReceiver<TraceEvent>,
        monitor: Option<CallerMonitor>,
    ) {
        let mut deadline = Instant::now() + self.ttl;
        let (mut exit_rx, mut monitor_armed) = match monitor {
            Some(monitor) => (monitor.into_receiver(), true),
            None => {
                // A pre-dropped sender: the arm fires Err once and disarms.
                let (_tx, rx) = oneshot::channel();
                (rx, true)
            }
        };

        loop {
            tokio::select! {
                event = mailbox.recv() => {
                    match event {
                        Some(event) => {
                            deadline = Instant::now() + self.ttl;
                            if self.process_event(event) {
                                return self.sweep(SweepCause::Finished);
                            }
                            if self.async_terminating && self.all_closed() {
                                return self.sweep(SweepCause::Finished);
                            }
                        }
                        // Every sender is gone, so no event can ever arrive
                        // again; treat the trace as abandoned.
                        None => return self.sweep(SweepCause::Timeout),
                    }
                }
                _ = sleep_until(deadline) => {
                    return self.sweep(SweepCause::Timeout);
                }
                exited = &mut exit_rx, if monitor_armed => {
                    match exited {
                        Ok(()) => return self.sweep(SweepCause::CallerExit),
                        // Guard was disarmed; stop watching.
                        Err(_) => monitor_armed = false,
                    }
                }
            }
        }
    }

    /// Apply one event. Returns `true` when the trace must terminate now.
    fn process_event(&mut self, event: TraceEvent) -> bool {
        match event {
            TraceEvent::StartSpan {
                span_id,
                parent,
                name,
                timestamp,
                deltas,
            } => {
                // An id collision keeps the first record.
                self.spans
                    .entry(span_id)
                    .or_insert_with(|| SpanRecord::new(span_id, parent, name, timestamp));
                self.apply_deltas(span_id, timestamp, deltas);
                false
            }
            TraceEvent::FinishSpan {
                span_id,
                timestamp,
                deltas,
            } => {
                if self.spans.contains_key(&span_id) {
                    self.apply_deltas(span_id, timestamp, deltas);
                    if let Some(span) = self.spans.get_mut(&span_id) {
                        span.close(timestamp);
                    }
                } else {
                    crate::zipline_debug!(name: "TraceActor.FinishSpan.UnknownSpan", span_id = span_id.to_string());
                }
                false
            }
            TraceEvent::Update {
                span_id,
                timestamp,
                deltas,
            } => {
                if self.spans.contains_key(&span_id) {
                    self.apply_deltas(span_id, timestamp, deltas);
                } else {
                    crate::zipline_debug!(name: "TraceActor.Update.UnknownSpan", span_id = span_id.to_string());
                }
                false
            }
            TraceEvent::Finish {
                timestamp,
                async_trace,
                annotations,
            } => {
                self.apply_deltas(self.root_span_id, timestamp, annotations);
                if let Some(root) = self.spans.get_mut(&self.root_span_id) {
                    if async_trace {
                        root.is_async = true;
                    }
                    root.close(timestamp);
                }
                if self.trace_is_async() {
                    self.async_terminating = true;
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Apply deltas to a span, ignoring them when the span does not exist.
    fn apply_deltas(&mut self, span_id: SpanId, timestamp: u64, deltas: Vec<Delta>) {
        if let Some(span) = self.spans.get_mut(&span_id) {
            for delta in deltas {
                span.apply(delta, timestamp);
            }
        }
    }

    /// An async delta on any span marks the whole trace async.
    fn trace_is_async(&self) -> bool {
        self.spans.values().any(|span| span.is_async)
    }

    fn all_closed(&self) -> bool {
        self.spans.values().all(|span| !span.is_open())
    }

    /// The terminal sweep: stamp every still-open span with an end timestamp
    /// and a `timeout` annotation, add an `error` annotation on the root
    /// when the caller went away, then encode, report, deregister, and exit.
    fn sweep(mut self, cause: SweepCause) {
        let now = now_micros();
        for span in self.spans.values_mut() {
            if span.is_open() {
                span.close(now);
                span.annotate(AnnotationValue::Timeout, now, None);
            }
        }
        if cause == SweepCause::CallerExit {
            if let Some(root) = self.spans.get_mut(&self.root_span_id) {
                root.annotate(AnnotationValue::Error, now, None);
            }
        }

        let batch = model::encode(
            self.trace_id,
            self.debug,
            &self.endpoint,
            self.spans.into_values(),
        );
        self.reporter.ingest(batch);
        registry::deregister(self.trace_id);
        crate::zipline_debug!(
            name: "TraceActor.Terminated",
            trace_id = self.trace_id.to_string(),
            cause = format!("{:?}", cause)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::InMemoryReporter;

    fn args(reporter: InMemoryReporter, ttl: Duration) -> StartArgs {
        StartArgs {
            trace_id: TraceId::generate(),
            span_id: SpanId::generate(),
            parent: Parent::Root,
            name: Some("root".to_owned()),
            timestamp: 1_000,
            kind: TraceKind::Client,
            remote: None,
            annotations: vec![],
            debug: false,
            ttl,
            reporter: Arc::new(reporter),
            endpoint: Endpoint::builder().service_name("test").build(),
        }
    }

    #[test]
    fn test_seeding_client_trace() {
        let actor = TraceActor::new(&args(InMemoryReporter::new(), Duration::from_secs(30)));
        let root = &actor.spans[&actor.root_span_id];
        assert_eq!(root.annotations.len(), 1);
        assert_eq!(root.annotations[0].value, AnnotationValue::ClientSend);
        assert_eq!(root.annotations[0].timestamp, 1_000);
    }

    #[test]
    fn test_seeding_server_trace_with_remote() {
        let mut start = args(InMemoryReporter::new(), Duration::from_secs(30));
        start.kind = TraceKind::Server;
        start.remote = Some(Endpoint::builder().service_name("gateway").build());

        let actor = TraceActor::new(&start);
        let root = &actor.spans[&actor.root_span_id];
        assert_eq!(root.annotations[0].value, AnnotationValue::ServerRecv);
        assert_eq!(root.binary_annotations[0].key, "ca");
        assert_eq!(root.binary_annotations[0].value, BinaryValue::Bool(true));
    }

    #[test]
    fn test_finish_with_open_child_sweeps_timeout() {
        let reporter = InMemoryReporter::new();
        let start = args(reporter.clone(), Duration::from_secs(30));
        let mut actor = TraceActor::new(&start);

        let child = SpanId::generate();
        assert!(!actor.process_event(TraceEvent::StartSpan {
            span_id: child,
            parent: Parent::Span(start.span_id),
            name: Some("orphan".to_owned()),
            timestamp: 1_100,
            deltas: vec![],
        }));
        assert!(actor.process_event(TraceEvent::Finish {
            timestamp: 2_000,
            async_trace: false,
            annotations: vec![],
        }));
        actor.sweep(SweepCause::Finished);

        let spans = reporter.spans();
        assert_eq!(spans.len(), 2);
        let orphan = spans.iter().find(|s| s.name() == "orphan").unwrap();
        assert!(orphan
            .annotations()
            .iter()
            .any(|a| a.value() == "timeout"));
        let root = spans.iter().find(|s| s.name() == "root").unwrap();
        assert!(root.annotations().iter().all(|a| a.value() != "timeout"));
    }

    #[test]
    fn test_finish_async_defers_termination() {
        let mut actor = TraceActor::new(&args(InMemoryReporter::new(), Duration::from_secs(30)));
        let child = SpanId::generate();
        actor.process_event(TraceEvent::StartSpan {
            span_id: child,
            parent: Parent::Span(actor.root_span_id),
            name: None,
            timestamp: 1_100,
            deltas: vec![],
        });

        assert!(!actor.process_event(TraceEvent::Finish {
            timestamp: 2_000,
            async_trace: true,
            annotations: vec![],
        }));
        assert!(actor.async_terminating);
        assert!(!actor.all_closed());

        actor.process_event(TraceEvent::FinishSpan {
            span_id: child,
            timestamp: 3_000,
            deltas: vec![],
        });
        assert!(actor.all_closed());
    }

    #[test]
    fn test_async_delta_on_child_defers_termination() {
        let mut actor = TraceActor::new(&args(InMemoryReporter::new(), Duration::from_secs(30)));
        let child = SpanId::generate();
        actor.process_event(TraceEvent::StartSpan {
            span_id: child,
            parent: Parent::Span(actor.root_span_id),
            name: None,
            timestamp: 1_100,
            deltas: vec![],
        });
        actor.process_event(TraceEvent::Update {
            span_id: child,
            timestamp: 1_200,
            deltas: vec![Delta::Async],
        });

        // A plain finish still defers: the child's async flag holds the
        // trace open.
        assert!(!actor.process_event(TraceEvent::Finish {
            timestamp: 2_000,
            async_trace: false,
            annotations: vec![],
        }));
        assert!(actor.async_terminating);
    }

    #[test]
    fn test_events_for_unknown_spans_are_dropped() {
        let mut actor = TraceActor::new(&args(InMemoryReporter::new(), Duration::from_secs(30)));
        let ghost = SpanId::generate();
        actor.process_event(TraceEvent::FinishSpan {
            span_id: ghost,
            timestamp: 1_100,
            deltas: vec![],
        });
        actor.process_event(TraceEvent::Update {
            span_id: ghost,
            timestamp: 1_200,
            deltas: vec![Delta::Name("late".to_owned())],
        });
        // No span was created retroactively.
        assert_eq!(actor.spans.len(), 1);
    }

    #[test]
    fn test_caller_exit_sweep_annotates_error_on_root() {
        let reporter = InMemoryReporter::new();
        let actor = TraceActor::new(&args(reporter.clone(), Duration::from_secs(30)));
        actor.sweep(SweepCause::CallerExit);

        let spans = reporter.spans();
        assert_eq!(spans.len(), 1);
        let values: Vec<&str> = spans[0].annotations().iter().map(|a| a.value()).collect();
        assert!(values.contains(&"timeout"));
        assert!(values.contains(&"error"));
    }
}
