use crate::trace::actor::TraceEvent;
use crate::trace::id::TraceId;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;

lazy_static::lazy_static! {
    /// Process-wide map from trace id to the owning actor's mailbox.
    static ref REGISTRY: RwLock<HashMap<TraceId, UnboundedSender<TraceEvent>>> =
        RwLock::new(HashMap::new());
}

/// Insert a mailbox for a trace, replacing any previous registration (a
/// supervisor restart re-registers the same id).
pub(crate) fn register(trace_id: TraceId, mailbox: UnboundedSender<TraceEvent>) {
    if let Ok(mut registry) = REGISTRY.write() {
        registry.insert(trace_id, mailbox);
    }
}

/// Remove a trace's mailbox. Called by the actor after its terminal sweep.
pub(crate) fn deregister(trace_id: TraceId) {
    if let Ok(mut registry) = REGISTRY.write() {
        registry.remove(&trace_id);
    }
}

/// Route one event to a trace's actor. Events for unknown traces, and events
/// racing against termination, are dropped without telling the caller.
pub(crate) fn send(trace_id: TraceId, event: TraceEvent) {
    let mailbox = match REGISTRY.read() {
        Ok(registry) => registry.get(&trace_id).cloned(),
        Err(_) => None,
    };
    match mailbox {
        Some(mailbox) => {
            if mailbox.send(event).is_err() {
                crate::zipline_debug!(name: "Registry.Send.ActorGone", trace_id = trace_id.to_string());
            }
        }
        None => {
            crate::zipline_debug!(name: "Registry.Send.UnknownTrace", trace_id = trace_id.to_string());
        }
    }
}

#[cfg(test)]
pub(crate) fn contains(trace_id: TraceId) -> bool {
    REGISTRY
        .read()
        .map(|registry| registry.contains_key(&trace_id))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_register_lookup_deregister() {
        let trace_id = TraceId::generate();
        let (tx, mut rx) = mpsc::unbounded_channel();

        register(trace_id, tx);
        assert!(contains(trace_id));

        send(trace_id, TraceEvent::Finish {
            timestamp: 1,
            async_trace: false,
            annotations: vec![],
        });
        assert!(rx.try_recv().is_ok());

        deregister(trace_id);
        assert!(!contains(trace_id));
    }

    #[test]
    fn test_send_to_unknown_trace_is_silent() {
        // Nothing to assert beyond "does not panic".
        send(TraceId::generate(), TraceEvent::Finish {
            timestamp: 1,
            async_trace: false,
            annotations: vec![],
        });
    }
}
