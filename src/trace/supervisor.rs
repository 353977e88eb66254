use crate::trace::actor::{StartArgs, TraceActor};
use crate::trace::registry;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

/// A caller-liveness token.
///
/// Create a pair with [`CallerGuard::new`], attach the [`CallerMonitor`] to
/// the trace's start options, and keep the guard alive for as long as the
/// initiating caller is. Dropping the guard while still armed tells the
/// trace actor that the caller went away: the actor runs its terminal sweep
/// and annotates the root span with `error`. Call [`disarm`](CallerGuard::disarm)
/// on a clean hand-off to release the guard silently.
#[derive(Debug)]
pub struct CallerGuard {
    tx: Option<oneshot::Sender<()>>,
}

/// The actor-side half of a [`CallerGuard`] pair.
#[derive(Debug)]
pub struct CallerMonitor(oneshot::Receiver<()>);

impl CallerGuard {
    /// Create a linked guard/monitor pair.
    pub fn new() -> (CallerGuard, CallerMonitor) {
        let (tx, rx) = oneshot::channel();
        (CallerGuard { tx: Some(tx) }, CallerMonitor(rx))
    }

    /// Release the guard without signaling caller exit.
    pub fn disarm(mut self) {
        self.tx = None;
    }
}

impl Drop for CallerGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl CallerMonitor {
    pub(crate) fn into_receiver(self) -> oneshot::Receiver<()> {
        self.0
    }
}

/// Spawn a supervised actor for one trace.
///
/// The supervisor owns the actor with a transient restart policy: a panic
/// replaces the actor with a fresh one seeded from the original start
/// arguments (in-flight spans are lost, later events still land), while
/// normal termination after the terminal sweep ends supervision. Each trace
/// is its own isolation boundary; neither a caller crash nor an actor crash
/// touches other traces.
pub(crate) fn spawn(args: StartArgs, monitor: Option<CallerMonitor>) {
    tokio::spawn(supervise(args, monitor));
}

async fn supervise(args: StartArgs, mut monitor: Option<CallerMonitor>) {
    loop {
        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        registry::register(args.trace_id, mailbox_tx);

        let actor = TraceActor::new(&args);
        let lifecycle = tokio::spawn(actor.run(mailbox_rx, monitor.take()));
        match lifecycle.await {
            Ok(()) => return,
            Err(err) if err.is_panic() => {
                crate::zipline_warn!(
                    name: "TraceSupervisor.Restart",
                    trace_id = args.trace_id.to_string()
                );
            }
            // Runtime shutdown cancelled the actor; nothing left to do.
            Err(_) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_guard_signals_monitor() {
        let (guard, monitor) = CallerGuard::new();
        drop(guard);
        assert!(matches!(monitor.into_receiver().await, Ok(())));
    }

    #[tokio::test]
    async fn test_disarmed_guard_stays_silent() {
        let (guard, monitor) = CallerGuard::new();
        guard.disarm();
        assert!(monitor.into_receiver().await.is_err());
    }
}
