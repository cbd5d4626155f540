//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.
//!
//! Every subscription owns one bounded queue. Events for a subscription are
//! consumed in publish order; distinct subscriptions are independent, so a
//! slow consumer only delays its own queue.

use async_trait::async_trait;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::debug;

use shared_types::DomainEvent;

use crate::pattern::TopicPattern;
use crate::publisher::BusInner;

/// Identifier of a registered subscription.
pub type SubscriptionId = u64;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The pattern could not be compiled.
    #[error("Invalid topic pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// A subscriber's queue had no space (non-waiting publish only).
    #[error("Queue full for subscription {subscription} ({pattern})")]
    QueueFull {
        subscription: SubscriptionId,
        pattern: String,
    },
}

/// Failure reported by an `EventHandler`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The event may apply cleanly if delivered again later.
    #[error("Recoverable handler failure: {0}")]
    Recoverable(String),

    /// The event could not be applied.
    #[error("Handler failure: {0}")]
    Failed(String),
}

impl HandlerError {
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable(_))
    }
}

/// A consumer driven by the bus.
///
/// The bus calls `handle` once per delivered event, sequentially per
/// subscription. Returning an error parks the event in the dead-letter queue;
/// the bus itself never retries.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Apply one event.
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;

    /// Name used in log lines.
    fn name(&self) -> &str {
        "event-handler"
    }
}

/// A raw subscription handle for receiving events.
///
/// When dropped, the subscription is removed from the bus.
pub struct Subscription {
    id: SubscriptionId,
    pattern: TopicPattern,
    receiver: mpsc::Receiver<DomainEvent>,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        pattern: TopicPattern,
        receiver: mpsc::Receiver<DomainEvent>,
        bus: Weak<BusInner>,
    ) -> Self {
        Self {
            id,
            pattern,
            receiver,
            bus,
        }
    }

    /// Receive the next event routed to this subscription.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next matching event
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        self.receiver.recv().await
    }

    /// Try to receive the next event without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was queued
    /// - `Ok(None)` - The queue is empty
    /// - `Err(SubscriptionError::Closed)` - The bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<DomainEvent>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub fn pattern(&self) -> &TopicPattern {
        &self.pattern
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
        debug!(pattern = %self.pattern, id = self.id, "Subscription dropped");
    }
}

impl Stream for Subscription {
    type Item = DomainEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Handle for a handler-driven subscription.
///
/// Dropping the handle unregisters the subscription; the worker finishes the
/// events already queued and then exits.
#[must_use = "dropping the handle unsubscribes the handler"]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    pattern: TopicPattern,
    bus: Weak<BusInner>,
    worker: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        id: SubscriptionId,
        pattern: TopicPattern,
        bus: &Arc<BusInner>,
        worker: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            pattern,
            bus: Arc::downgrade(bus),
            worker: Some(worker),
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub fn pattern(&self) -> &TopicPattern {
        &self.pattern
    }

    /// Unregister and wait for the worker to drain its queue.
    pub async fn unsubscribe(mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}
