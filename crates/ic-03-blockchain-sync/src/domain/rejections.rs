//! # Rejection Log
//!
//! A block rejected from a source is never admitted again from that source
//! until an explicit resync clears the log.
//!
//! Entries at or below the committed height are pruned, since nothing can be
//! admitted there anyway. Above it the log holds at most `capacity` entries
//! and forgets the oldest first.

use std::collections::{HashSet, VecDeque};

use shared_types::{Hash, NodeId};

type Entry = (u64, Hash, NodeId);

#[derive(Debug)]
pub struct RejectionLog {
    entries: HashSet<Entry>,
    /// Insertion order, oldest first.
    order: VecDeque<Entry>,
    capacity: usize,
}

impl RejectionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, height: u64, hash: Hash, source: NodeId) {
        let entry = (height, hash, source);
        if !self.entries.insert(entry.clone()) {
            return;
        }
        self.order.push_back(entry);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn is_rejected(&self, height: u64, hash: &Hash, source: &NodeId) -> bool {
        // Tuple lookup needs an owned key.
        self.entries.contains(&(height, *hash, source.clone()))
    }

    /// Forget every entry at or below `height`.
    pub fn prune_through(&mut self, height: u64) -> usize {
        let before = self.order.len();
        self.order.retain(|(h, _, _)| *h > height);
        self.entries.retain(|(h, _, _)| *h > height);
        before - self.order.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_by_source() {
        let mut log = RejectionLog::new(16);
        log.record(4, [1; 32], NodeId::new("a"));

        assert!(log.is_rejected(4, &[1; 32], &NodeId::new("a")));
        assert!(!log.is_rejected(4, &[1; 32], &NodeId::new("b")));
        assert!(!log.is_rejected(4, &[2; 32], &NodeId::new("a")));

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_capacity_forgets_oldest() {
        let mut log = RejectionLog::new(3);
        for i in 0..10u8 {
            log.record(5, [i; 32], NodeId::new("spam"));
        }

        assert_eq!(log.len(), 3);
        assert!(!log.is_rejected(5, &[0; 32], &NodeId::new("spam")));
        assert!(log.is_rejected(5, &[9; 32], &NodeId::new("spam")));
    }

    #[test]
    fn test_duplicate_record_keeps_one_entry() {
        let mut log = RejectionLog::new(2);
        log.record(1, [1; 32], NodeId::new("a"));
        log.record(1, [1; 32], NodeId::new("a"));
        log.record(2, [2; 32], NodeId::new("a"));

        assert_eq!(log.len(), 2);
        assert!(log.is_rejected(1, &[1; 32], &NodeId::new("a")));
    }

    #[test]
    fn test_prune_through_committed_height() {
        let mut log = RejectionLog::new(16);
        log.record(3, [3; 32], NodeId::new("a"));
        log.record(4, [4; 32], NodeId::new("a"));
        log.record(7, [7; 32], NodeId::new("b"));

        assert_eq!(log.prune_through(4), 2);
        assert_eq!(log.len(), 1);
        assert!(log.is_rejected(7, &[7; 32], &NodeId::new("b")));
    }
}
