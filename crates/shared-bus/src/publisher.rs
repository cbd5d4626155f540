//! # Event Publisher
//!
//! Defines the publishing side of the event bus and the in-memory bus that
//! owns the subscription table.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use shared_types::DomainEvent;

use crate::dead_letter::{DeadLetter, DeadLetterQueue};
use crate::pattern::TopicPattern;
use crate::subscriber::{
    EventHandler, Subscription, SubscriptionError, SubscriptionHandle, SubscriptionId,
};
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_DLQ_CAPACITY, DLQ_NAME};

/// Trait for publishing events to the bus.
///
/// This is the interface components use to emit facts for consumption by
/// other components.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// Never waits for queue space or handler completion.
    ///
    /// # Returns
    ///
    /// The number of subscriptions the event was enqueued to.
    async fn publish(&self, event: DomainEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// One row of the compiled subscription table.
struct SubscriptionEntry {
    id: SubscriptionId,
    pattern: TopicPattern,
    sender: mpsc::Sender<DomainEvent>,
}

/// Shared state behind every clone of the bus.
pub(crate) struct BusInner {
    /// Compiled subscription table.
    table: RwLock<Vec<SubscriptionEntry>>,
    /// Failed deliveries.
    dead_letters: Mutex<DeadLetterQueue>,
    next_id: AtomicU64,
    events_published: AtomicU64,
    capacity: usize,
}

impl BusInner {
    pub(crate) fn remove(&self, id: SubscriptionId) {
        self.table.write().retain(|entry| entry.id != id);
    }

    /// Senders whose pattern matches `topic`, cloned so the lock is released
    /// before any await.
    fn route(&self, topic: &str) -> Vec<(SubscriptionId, String, mpsc::Sender<DomainEvent>)> {
        self.table
            .read()
            .iter()
            .filter(|entry| entry.pattern.matches(topic))
            .map(|entry| (entry.id, entry.pattern.to_string(), entry.sender.clone()))
            .collect()
    }

    fn sender_for(&self, id: SubscriptionId) -> Option<mpsc::Sender<DomainEvent>> {
        self.table
            .read()
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.sender.clone())
    }

    fn dead_letter(&self, letter: DeadLetter) {
        self.dead_letters.lock().push(letter);
    }

    /// Park an event that did not fit a subscriber's queue.
    fn overflow(&self, id: SubscriptionId, pattern: String, event: DomainEvent) {
        warn!(
            topic = %event.topic,
            event_id = %event.id,
            subscription = id,
            "Subscriber queue full, routing event to {}",
            DLQ_NAME
        );
        self.dead_letter(DeadLetter {
            subscription: id,
            pattern,
            event,
            error: "subscriber queue full".into(),
            recoverable: true,
            failed_at: shared_types::now_millis(),
        });
    }
}

/// In-memory implementation of the event bus.
///
/// Each subscription gets its own bounded `mpsc` queue, giving per-subscriber
/// ordering. Publishing never waits: an event that does not fit one
/// subscriber's queue is parked in the dead-letter queue for that subscriber
/// alone while the others still receive it. Cloning the bus yields another
/// handle to the same subscription table.
#[derive(Clone)]
pub struct InMemoryEventBus {
    inner: Arc<BusInner>,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with the given per-subscriber queue
    /// capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_limits(capacity, DEFAULT_DLQ_CAPACITY)
    }

    #[must_use]
    pub fn with_limits(capacity: usize, dead_letter_capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                table: RwLock::new(Vec::new()),
                dead_letters: Mutex::new(DeadLetterQueue::new(dead_letter_capacity)),
                next_id: AtomicU64::new(1),
                events_published: AtomicU64::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    fn register(
        &self,
        pattern: &str,
    ) -> Result<(SubscriptionId, TopicPattern, mpsc::Receiver<DomainEvent>), SubscriptionError> {
        let compiled = TopicPattern::parse(pattern)?;
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner.table.write().push(SubscriptionEntry {
            id,
            pattern: compiled.clone(),
            sender,
        });

        debug!(pattern = %compiled, id, "New subscription created");
        Ok((id, compiled, receiver))
    }

    /// Subscribe with a raw receiver, for components running their own loop.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::InvalidPattern` if the pattern does not compile.
    pub fn subscribe(&self, pattern: &str) -> Result<Subscription, SubscriptionError> {
        let (id, compiled, receiver) = self.register(pattern)?;
        Ok(Subscription::new(
            id,
            compiled,
            receiver,
            Arc::downgrade(&self.inner),
        ))
    }

    /// Subscribe a handler. The bus spawns one worker task that applies
    /// queued events to the handler one at a time.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::InvalidPattern` if the pattern does not compile.
    pub fn subscribe_handler(
        &self,
        pattern: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        let (id, compiled, mut receiver) = self.register(pattern)?;
        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        let worker_pattern = compiled.to_string();

        info!(pattern = %compiled, handler = handler.name(), "Handler subscribed");

        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match handler.handle(&event).await {
                    Ok(()) => {
                        debug!(
                            handler = handler.name(),
                            topic = %event.topic,
                            event_id = %event.id,
                            "Event handled"
                        );
                    }
                    Err(e) => {
                        error!(
                            handler = handler.name(),
                            topic = %event.topic,
                            event_id = %event.id,
                            error = %e,
                            "Handler failed, routing event to {}",
                            DLQ_NAME
                        );
                        let Some(bus) = bus.upgrade() else {
                            continue;
                        };
                        bus.dead_letter(DeadLetter {
                            subscription: id,
                            pattern: worker_pattern.clone(),
                            recoverable: e.is_recoverable(),
                            error: e.to_string(),
                            event,
                            failed_at: shared_types::now_millis(),
                        });
                    }
                }
            }
            debug!(pattern = %worker_pattern, id, "Handler worker stopped");
        });

        Ok(SubscriptionHandle::new(id, compiled, &self.inner, worker))
    }

    /// Publish, reporting full queues to the caller instead of parking the
    /// event in the dead-letter queue.
    ///
    /// Subscribers with space still receive the event; the first full queue
    /// is reported as an error.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::QueueFull` if any matching queue was full.
    pub fn try_publish(&self, event: DomainEvent) -> Result<usize, SubscriptionError> {
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        let mut first_full = None;

        for (id, pattern, sender) in self.inner.route(&event.topic) {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(topic = %event.topic, subscription = id, "Subscriber queue full");
                    first_full.get_or_insert(SubscriptionError::QueueFull {
                        subscription: id,
                        pattern,
                    });
                }
                Err(mpsc::error::TrySendError::Closed(_)) => self.inner.remove(id),
            }
        }

        match first_full {
            Some(err) => Err(err),
            None => Ok(delivered),
        }
    }

    /// Re-enqueue every dead letter to its original subscription.
    ///
    /// Letters whose subscription no longer exists are dropped with a
    /// warning; letters that still do not fit their queue stay parked.
    ///
    /// # Returns
    ///
    /// The number of letters redelivered.
    pub fn redeliver_dead_letters(&self) -> usize {
        self.redeliver(|_| true)
    }

    /// Re-enqueue only the letters whose failure was reported recoverable.
    pub fn redeliver_recoverable(&self) -> usize {
        self.redeliver(|letter| letter.recoverable)
    }

    fn redeliver(&self, selected: impl Fn(&DeadLetter) -> bool) -> usize {
        let letters = self.inner.dead_letters.lock().drain();
        let mut redelivered = 0;
        let mut parked = Vec::new();

        for letter in letters {
            if !selected(&letter) {
                parked.push(letter);
                continue;
            }
            let Some(sender) = self.inner.sender_for(letter.subscription) else {
                warn!(
                    event_id = %letter.event.id,
                    subscription = letter.subscription,
                    "Dropping dead letter for removed subscription"
                );
                continue;
            };
            match sender.try_send(letter.event) {
                Ok(()) => redelivered += 1,
                Err(mpsc::error::TrySendError::Full(event)) => {
                    parked.push(DeadLetter { event, ..letter });
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.inner.remove(letter.subscription);
                }
            }
        }

        if !parked.is_empty() {
            let mut queue = self.inner.dead_letters.lock();
            for letter in parked {
                queue.push(letter);
            }
        }
        if redelivered > 0 {
            info!(count = redelivered, "Dead letters redelivered");
        }
        redelivered
    }

    /// Copy of the current dead letters.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.dead_letters.lock().snapshot()
    }

    #[must_use]
    pub fn dead_letter_count(&self) -> usize {
        self.inner.dead_letters.lock().len()
    }

    /// Get the number of active subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.table.read().len()
    }

    /// Get the per-subscriber queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: DomainEvent) -> usize {
        // Always increment counter (event was attempted)
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);

        let routes = self.inner.route(&event.topic);
        if routes.is_empty() {
            debug!(topic = %event.topic, event_id = %event.id, "Event published (no subscribers)");
            return 0;
        }

        let mut delivered = 0;
        for (id, pattern, sender) in routes {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(event)) => {
                    self.inner.overflow(id, pattern, event);
                }
                // Receiver dropped between routing and sending.
                Err(mpsc::error::TrySendError::Closed(_)) => self.inner.remove(id),
            }
        }

        debug!(
            topic = %event.topic,
            event_id = %event.id,
            receivers = delivered,
            "Event published"
        );
        delivered
    }

    fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }
}
