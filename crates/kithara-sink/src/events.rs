//! Worker notifications and the channels they are delivered through.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

/// Notification pushed by the worker thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    /// The worker can take this many more payloads.
    Demand(usize),
    /// The buffer ran dry for this long before the next payload arrived
    /// (or before the run ended).
    Underrun(Duration),
    /// `open` failed; the worker is going idle.
    ConnectionError(String),
    /// `send` failed; the worker is going idle.
    SendError(String),
}

/// The receiving side of a notification channel is gone.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("notification receiver closed")]
pub struct SinkClosed;

/// Destination for [`SinkEvent`]s.
///
/// Called from the worker thread without any sink lock held. Must not block:
/// the worker only observes a stop request between calls. An `Err` makes the
/// worker stop the run.
pub trait NotificationSink: Send + Sync + 'static {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns [`SinkClosed`] when nobody can receive events any more.
    fn notify(&self, event: SinkEvent) -> Result<(), SinkClosed>;
}

/// Events that do not fit into a full bounded channel are dropped.
impl NotificationSink for kanal::Sender<SinkEvent> {
    fn notify(&self, event: SinkEvent) -> Result<(), SinkClosed> {
        match self.try_send(event) {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("notification channel full, event dropped");
                Ok(())
            }
            Err(_) => Err(SinkClosed),
        }
    }
}

/// Broadcast bus for sink events.
///
/// Every subscriber receives every event. Publishing never fails: with no
/// subscribers events are dropped, and slow subscribers observe
/// `RecvError::Lagged` instead of blocking the worker.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<SinkEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: SinkEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SinkEvent> {
        self.tx.subscribe()
    }
}

impl NotificationSink for EventBus {
    fn notify(&self, event: SinkEvent) -> Result<(), SinkClosed> {
        self.publish(event);
        Ok(())
    }
}
