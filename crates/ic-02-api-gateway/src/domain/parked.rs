//! # Parked Status Changes
//!
//! Status changes that arrived before their ICode was created. The latest
//! one per id waits here until the create lands, then becomes the record's
//! initial status.
//!
//! - Entries older than `retention` are dropped
//! - At `capacity` the oldest entry makes room for the new one

use std::collections::HashMap;
use std::time::Duration;

use shared_types::ICodeStatus;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
struct Parked {
    status: ICodeStatus,
    /// Unix millis when parked.
    parked_at: u64,
}

#[derive(Debug)]
pub struct ParkedStatusChanges {
    entries: HashMap<String, Parked>,
    capacity: usize,
    retention_ms: u64,
}

impl ParkedStatusChanges {
    #[must_use]
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            retention_ms: retention.as_millis() as u64,
        }
    }

    /// Park `status` for `id`, replacing an earlier one.
    pub fn park(&mut self, id: &str, status: ICodeStatus) {
        self.park_at(id, status, shared_types::now_millis());
    }

    pub fn park_at(&mut self, id: &str, status: ICodeStatus, now: u64) {
        self.expire(now);

        if !self.entries.contains_key(id) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, parked)| parked.parked_at)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                warn!(id = %oldest, "[ic-02] Parked status changes full, dropping oldest");
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(
            id.to_string(),
            Parked {
                status,
                parked_at: now,
            },
        );
    }

    /// Remove and return the status parked for `id`, unless it expired.
    pub fn take(&mut self, id: &str) -> Option<ICodeStatus> {
        self.take_at(id, shared_types::now_millis())
    }

    pub fn take_at(&mut self, id: &str, now: u64) -> Option<ICodeStatus> {
        let parked = self.entries.remove(id)?;
        (now.saturating_sub(parked.parked_at) <= self.retention_ms).then_some(parked.status)
    }

    /// Drop whatever is parked for `id`.
    pub fn discard(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    fn expire(&mut self, now: u64) {
        let before = self.entries.len();
        let retention = self.retention_ms;
        self.entries
            .retain(|_, parked| now.saturating_sub(parked.parked_at) <= retention);
        let expired = before - self.entries.len();
        if expired > 0 {
            warn!(expired, "[ic-02] Parked status changes expired before their ICode was created");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
