//! # Shared Bus - Topic Event Bus
//!
//! Decouples producers of domain events from their consumers.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐   publish()    ┌──────────────┐   queue per    ┌──────────────┐
//! │   Producer   │ ─────────────→ │  Event Bus   │ ─────────────→ │  Subscriber  │
//! └──────────────┘                └──────────────┘  subscription  └──────────────┘
//!                                        │
//!                                        │ handler error / queue full
//!                                        ▼
//!                                 ┌──────────────┐
//!                                 │ dlq.critical │
//!                                 └──────────────┘
//! ```
//!
//! - **Routing:** exact topics or one trailing `*` segment (`icode.*`)
//! - **Ordering:** events reach each subscription in publish order
//! - **At-least-once:** a failed handler parks the event in the dead-letter
//!   queue; redelivery is explicit, so consumers must be idempotent
//! - **Isolation:** publishing never waits; a full queue diverts the event to
//!   the dead-letter queue for that subscription only

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dead_letter;
pub mod dedup;
pub mod pattern;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use dedup::ProcessedEventCache;
pub use pattern::TopicPattern;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{
    EventHandler, HandlerError, Subscription, SubscriptionError, SubscriptionHandle,
    SubscriptionId,
};

/// Maximum events buffered per subscriber before overflow goes to the
/// dead-letter queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Maximum dead letters retained before the oldest is evicted.
pub const DEFAULT_DLQ_CAPACITY: usize = 10_000;

/// Name of the dead-letter queue in log lines.
pub const DLQ_NAME: &str = "dlq.critical";
