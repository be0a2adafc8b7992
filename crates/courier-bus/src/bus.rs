//! Typed pub/sub fan-out of [`Event`] values.
//!
//! Each subscriber owns a bounded queue, so delivery to one subscriber can
//! never block delivery to another, and `publish` never waits on subscriber
//! processing. A new subscriber receives a one-time bootstrap snapshot
//! before any live event.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use uuid::Uuid;

use courier_core::events::{BootstrapData, Event};
use courier_core::Result;

/// Handle identifying one attached subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Supplies the full-state snapshot delivered first to each new subscriber.
///
/// Implementations pull live state on every call; the bus never caches a
/// snapshot between subscribers.
#[async_trait]
pub trait BootstrapSource: Send + Sync {
    async fn bootstrap(&self) -> Result<BootstrapData>;
}

/// Fan-out bus for the closed [`Event`] variant set.
pub struct EventBus {
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::Sender<Event>>>,
    queue_capacity: usize,
}

impl EventBus {
    /// Create a bus whose subscribers each get a queue of `queue_capacity`
    /// events. A capacity below one is raised to one so the bootstrap
    /// always fits.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Deliver `event` to every attached subscriber, in emission order per
    /// subscriber, without waiting on any of them.
    ///
    /// A subscriber whose queue is full loses this event; the loss is
    /// logged and confined to that subscriber. Subscribers whose receiver
    /// was dropped are pruned here.
    pub fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock().expect("subscriber table poisoned");
        subscribers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    subscriber = %id,
                    event = %event.event_name(),
                    "subscriber queue full, event lost for this subscriber"
                );
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = %id, "pruning detached subscriber");
                false
            }
        });
    }

    /// Attach a new subscriber.
    ///
    /// Pulls a fresh snapshot from `source` and queues it as the first
    /// event the subscriber will observe; only live events follow. A
    /// failure to assemble the snapshot is reported to the caller and no
    /// subscriber is attached.
    pub async fn subscribe(&self, source: &dyn BootstrapSource) -> Result<Subscription> {
        let snapshot = source.bootstrap().await?;
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        tx.try_send(Event::Bootstrap(snapshot))
            .expect("fresh subscriber queue cannot be full");

        let id = SubscriptionId::new();
        self.subscribers
            .lock()
            .expect("subscriber table poisoned")
            .insert(id, tx);
        debug!(subscriber = %id, "subscriber attached");

        Ok(Subscription { id, rx })
    }

    /// Detach a subscriber.
    ///
    /// Takes effect before the next `publish`; events already queued to the
    /// subscriber still drain to its receiver.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let removed = self
            .subscribers
            .lock()
            .expect("subscriber table poisoned")
            .remove(&id);
        if removed.is_some() {
            debug!(subscriber = %id, "subscriber detached");
        }
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber table poisoned")
            .len()
    }
}

/// Receiving side of one subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<Event>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event. Returns `None` once detached and drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Adapt the subscription into a `Stream`, e.g. for a transport layer.
    pub fn into_stream(self) -> ReceiverStream<Event> {
        ReceiverStream::new(self.rx)
    }
}
