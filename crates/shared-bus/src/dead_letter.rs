//! # Dead Letter Queue
//!
//! Events a handler failed to apply. They are kept, not dropped, so an
//! operator or a repair task can redeliver them to the same subscription.

use std::collections::VecDeque;

use shared_types::DomainEvent;
use tracing::warn;

use crate::subscriber::SubscriptionId;

/// A failed delivery.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// Subscription whose handler failed.
    pub subscription: SubscriptionId,
    /// Pattern of that subscription.
    pub pattern: String,
    /// The undelivered event.
    pub event: DomainEvent,
    /// Handler error text.
    pub error: String,
    /// Whether the handler reported the failure as recoverable.
    pub recoverable: bool,
    /// Unix millis when the failure happened.
    pub failed_at: u64,
}

/// Bounded FIFO of failed deliveries.
///
/// When full, the oldest letter is evicted.
#[derive(Debug)]
pub struct DeadLetterQueue {
    letters: VecDeque<DeadLetter>,
    capacity: usize,
    evicted: u64,
}

impl DeadLetterQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            letters: VecDeque::new(),
            capacity: capacity.max(1),
            evicted: 0,
        }
    }

    pub fn push(&mut self, letter: DeadLetter) {
        if self.letters.len() >= self.capacity {
            if let Some(old) = self.letters.pop_front() {
                self.evicted += 1;
                warn!(
                    event_id = %old.event.id,
                    topic = %old.event.topic,
                    "Dead letter queue full, evicting oldest letter"
                );
            }
        }
        self.letters.push_back(letter);
    }

    /// Take every letter out of the queue.
    pub fn drain(&mut self) -> Vec<DeadLetter> {
        self.letters.drain(..).collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.letters.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Letters lost to eviction since creation.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
