//! Destinations for progress events emitted by a pipeline run.

use crate::pipeline::types::ProgressEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Pluggable observer of a pipeline run.
///
/// `emit` must never block or fail the step that triggered it: a sink whose
/// consumer has gone away drops events silently.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Called in emission order.
    fn emit(&self, event: ProgressEvent);

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Forwards events into an unbounded single-consumer channel.
///
/// Everything after the first terminal event is discarded, as is anything
/// sent once the receiver is dropped (client disconnected).
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
    finished: AtomicBool,
}

impl ChannelSink {
    /// Create a sink together with the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                finished: AtomicBool::new(false),
            },
            rx,
        )
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        if self.finished.load(Ordering::SeqCst) {
            tracing::debug!(?event, "dropping event emitted after terminal event");
            return;
        }
        if event.is_terminal() {
            self.finished.store(true, Ordering::SeqCst);
        }
        if self.tx.send(event).is_err() {
            // Receiver gone - the observer disconnected, nothing to report to
            tracing::trace!("progress receiver closed");
        }
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

/// Records every event in memory (tests, library callers).
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events collected so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The last event, if any.
    pub fn last(&self) -> Option<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}
