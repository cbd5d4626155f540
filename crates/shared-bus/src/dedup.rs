//! # Processed Event Cache
//!
//! Time-bounded record of event ids already applied by a consumer, for
//! consumers that need at-most-once application on top of the bus's
//! at-least-once delivery.
//!
//! - Ids are remembered for `retention` after first being seen
//! - Expired ids are garbage-collected every `gc_interval`
//! - Memory stays bounded by the event rate times the retention window

use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Time-bounded cache of processed event ids.
pub struct ProcessedEventCache {
    /// Map of event id -> unix millis when first processed.
    seen: HashMap<Uuid, u64>,

    /// How long an id is remembered.
    retention_ms: u64,

    /// Last garbage collection time (unix millis).
    last_gc: u64,

    /// Garbage collection interval.
    gc_interval_ms: u64,
}

impl ProcessedEventCache {
    /// Default retention: 10 minutes.
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

    /// Default garbage collection interval.
    pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(30);

    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_RETENTION, Self::DEFAULT_GC_INTERVAL)
    }

    #[must_use]
    pub fn with_config(retention: Duration, gc_interval: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            retention_ms: retention.as_millis() as u64,
            last_gc: shared_types::now_millis(),
            gc_interval_ms: gc_interval.as_millis() as u64,
        }
    }

    /// Record an event id. Returns `false` if it was already processed.
    pub fn first_seen(&mut self, id: Uuid) -> bool {
        self.first_seen_at(id, shared_types::now_millis())
    }

    /// Record an event id at an explicit time.
    pub fn first_seen_at(&mut self, id: Uuid, now: u64) -> bool {
        if now.saturating_sub(self.last_gc) > self.gc_interval_ms {
            self.garbage_collect(now);
            self.last_gc = now;
        }

        if self.seen.contains_key(&id) {
            return false;
        }
        self.seen.insert(id, now);
        true
    }

    /// Forget an id so a redelivery is applied again.
    ///
    /// Used when applying the event failed after it was recorded.
    pub fn forget(&mut self, id: &Uuid) {
        self.seen.remove(id);
    }

    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.seen.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn garbage_collect(&mut self, now: u64) {
        let expiry_threshold = now.saturating_sub(self.retention_ms);
        self.seen.retain(|_, &mut ts| ts > expiry_threshold);
    }
}

impl Default for ProcessedEventCache {
    fn default() -> Self {
        Self::new()
    }
}
