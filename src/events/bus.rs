//! In-process publish/subscribe bus.
//!
//! # Responsibilities
//! - Fan out each published event to every current subscriber
//! - Preserve publish order per subscriber
//! - Signal completion to subscribers on shutdown
//!
//! # Design Decisions
//! - Buffered fan-out (tokio broadcast): publishing never waits on a subscriber
//! - A subscriber that falls behind its buffer skips the oldest events; the skip is logged
//! - No replay: a new subscriber only sees events published after it subscribed

use std::sync::{Arc, RwLock};

use futures_util::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::events::VaultEvent;
use crate::observability::metrics;

/// Default per-subscriber buffer.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Multi-subscriber event channel. Cheap to clone; clones share the channel.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    /// `None` once the bus has been shut down.
    sender: RwLock<Option<broadcast::Sender<VaultEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                sender: RwLock::new(Some(tx)),
            }),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns `false` if the bus has been shut down.
    pub fn publish(&self, event: VaultEvent) -> bool {
        let guard = self
            .inner
            .sender
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(tx) = guard.as_ref() else {
            tracing::debug!(kind = event.kind(), "Event dropped, bus is shut down");
            return false;
        };

        metrics::record_event_published(event.kind());
        // An error only means nobody is subscribed right now.
        let _ = tx.send(event);
        true
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> EventStream {
        let guard = self
            .inner
            .sender
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(tx) => EventStream { rx: tx.subscribe() },
            None => {
                // Already completed: hand out a stream that is closed from the start.
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                EventStream { rx }
            }
        }
    }

    /// Stop accepting events and signal completion to every subscriber.
    pub fn shutdown(&self) {
        let mut guard = self
            .inner
            .sender
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.take().is_some() {
            tracing::info!("Event bus completed");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner
            .sender
            .read()
            .map(|guard| guard.is_none())
            .unwrap_or(true)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .sender
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|tx| tx.receiver_count()))
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription to the bus.
pub struct EventStream {
    rx: broadcast::Receiver<VaultEvent>,
}

impl EventStream {
    /// Wait for the next event. `None` once the bus is shut down and drained.
    pub async fn recv(&mut self) -> Option<VaultEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged, oldest events skipped");
                    metrics::record_events_lagged(skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-published event without waiting.
    pub fn try_recv(&mut self) -> Option<VaultEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged, oldest events skipped");
                    metrics::record_events_lagged(skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Adapt the subscription into a `Stream` that ends when the bus completes.
    pub fn into_stream(self) -> impl Stream<Item = VaultEvent> + Send + 'static {
        stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|event| (event, sub))
        })
    }
}
