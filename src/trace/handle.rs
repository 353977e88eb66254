use crate::trace::id::{SpanId, TraceId};
use std::fmt;

/// The caller-held, immutable value naming a trace and the caller's current
/// position in its span tree.
///
/// A handle is cheap to clone and may be copied freely across threads; it
/// contains only identifiers, never a reference to the trace's actor. Handles
/// for unsampled traces still track span ids as spans are started and
/// finished, so a downstream peer can be handed consistent propagation ids,
/// but no recording takes place. The [`ignore`](TraceHandle::IGNORE) handle
/// short-circuits everything.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraceHandle {
    context: Option<HandleContext>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct HandleContext {
    trace_id: TraceId,
    span_id: SpanId,
    /// Ancestor span ids, most recent first.
    parent_stack: Vec<SpanId>,
    sampled: bool,
    debug: bool,
}

impl TraceHandle {
    /// The inert handle: every trace operation on it is a no-op and returns
    /// it unchanged.
    pub const IGNORE: TraceHandle = TraceHandle { context: None };

    pub(crate) fn new(trace_id: TraceId, span_id: SpanId, sampled: bool, debug: bool) -> Self {
        TraceHandle {
            context: Some(HandleContext {
                trace_id,
                span_id,
                parent_stack: Vec::new(),
                sampled,
                debug,
            }),
        }
    }

    /// Returns `true` for the [`IGNORE`](TraceHandle::IGNORE) handle.
    pub fn is_ignore(&self) -> bool {
        self.context.is_none()
    }

    /// Returns `true` when operations on this handle are recorded by a trace
    /// actor: the trace is sampled, or the debug override is set.
    pub fn is_recording(&self) -> bool {
        self.context
            .as_ref()
            .map(|cx| cx.sampled || cx.debug)
            .unwrap_or(false)
    }

    /// The trace id, if this is not the ignore handle.
    pub fn trace_id(&self) -> Option<TraceId> {
        self.context.as_ref().map(|cx| cx.trace_id)
    }

    /// The current span id, if this is not the ignore handle.
    pub fn span_id(&self) -> Option<SpanId> {
        self.context.as_ref().map(|cx| cx.span_id)
    }

    /// Whether the trace carries the sampled flag.
    pub fn is_sampled(&self) -> bool {
        self.context.as_ref().map(|cx| cx.sampled).unwrap_or(false)
    }

    /// Whether the trace carries the debug override.
    pub fn is_debug(&self) -> bool {
        self.context.as_ref().map(|cx| cx.debug).unwrap_or(false)
    }

    /// Decompose the handle into `(trace_id, span_id, parent_span_id,
    /// sampled, debug)` for propagation to a downstream peer.
    ///
    /// Returns `None` for the ignore handle. The parent span id is the
    /// nearest ancestor, or `None` at the root.
    pub fn destructure(&self) -> Option<(TraceId, SpanId, Option<SpanId>, bool, bool)> {
        self.context.as_ref().map(|cx| {
            (
                cx.trace_id,
                cx.span_id,
                cx.parent_stack.first().copied(),
                cx.sampled,
                cx.debug,
            )
        })
    }

    /// A new handle positioned at `span_id`, with the previous current span
    /// pushed onto the ancestor stack.
    pub fn push(&self, span_id: SpanId) -> TraceHandle {
        match &self.context {
            None => TraceHandle::IGNORE,
            Some(cx) => {
                let mut parent_stack = Vec::with_capacity(cx.parent_stack.len() + 1);
                parent_stack.push(cx.span_id);
                parent_stack.extend_from_slice(&cx.parent_stack);
                TraceHandle {
                    context: Some(HandleContext {
                        trace_id: cx.trace_id,
                        span_id,
                        parent_stack,
                        sampled: cx.sampled,
                        debug: cx.debug,
                    }),
                }
            }
        }
    }

    /// A new handle positioned at the nearest ancestor. Popping with an
    /// empty ancestor stack returns the handle unchanged.
    pub fn pop(&self) -> TraceHandle {
        match &self.context {
            None => TraceHandle::IGNORE,
            Some(cx) => match cx.parent_stack.split_first() {
                None => self.clone(),
                Some((head, tail)) => TraceHandle {
                    context: Some(HandleContext {
                        trace_id: cx.trace_id,
                        span_id: *head,
                        parent_stack: tail.to_vec(),
                        sampled: cx.sampled,
                        debug: cx.debug,
                    }),
                },
            },
        }
    }
}

impl fmt::Display for TraceHandle {
    /// Renders `<trace hex>.<uniq>:<span hex>,SAMPLED|UNSAMPLED[,DEBUG]`;
    /// intended for log lines only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            None => f.write_str("IGNORE"),
            Some(cx) => {
                write!(
                    f,
                    "{}:{},{}",
                    cx.trace_id,
                    cx.span_id,
                    if cx.sampled { "SAMPLED" } else { "UNSAMPLED" }
                )?;
                if cx.debug {
                    f.write_str(",DEBUG")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> TraceHandle {
        TraceHandle::new(TraceId::new(0xa1, 7), SpanId::from(0xb2), true, false)
    }

    #[test]
    fn test_push_then_pop_is_identity() {
        let h = handle();
        assert_eq!(h.push(SpanId::from(0xc3)).pop(), h);
    }

    #[test]
    fn test_pop_on_empty_stack_is_noop() {
        let h = handle();
        assert_eq!(h.pop(), h);
    }

    #[test]
    fn test_push_tracks_parent() {
        let h = handle().push(SpanId::from(0xc3));
        let (_, span_id, parent, _, _) = h.destructure().unwrap();
        assert_eq!(span_id, SpanId::from(0xc3));
        assert_eq!(parent, Some(SpanId::from(0xb2)));
    }

    #[test]
    fn test_ignore_operations_are_noops() {
        assert_eq!(TraceHandle::IGNORE.push(SpanId::from(1)), TraceHandle::IGNORE);
        assert_eq!(TraceHandle::IGNORE.pop(), TraceHandle::IGNORE);
        assert!(!TraceHandle::IGNORE.is_recording());
        assert_eq!(TraceHandle::IGNORE.destructure(), None);
    }

    #[test]
    fn test_unsampled_handle_is_not_recording() {
        let h = TraceHandle::new(TraceId::generate(), SpanId::generate(), false, false);
        assert!(!h.is_recording());
        // The debug override forces recording regardless of sampling.
        let h = TraceHandle::new(TraceId::generate(), SpanId::generate(), false, true);
        assert!(h.is_recording());
    }

    #[test]
    fn test_display_format() {
        let h = handle();
        assert_eq!(format!("{}", h), "00000000000000a1.7:00000000000000b2,SAMPLED");
        assert_eq!(format!("{}", TraceHandle::IGNORE), "IGNORE");
    }
}
