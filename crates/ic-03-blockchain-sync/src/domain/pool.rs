//! # Block Pool
//!
//! Received blocks waiting for their predecessor to commit, ordered by
//! height. Several candidates may wait at one height (e.g. a gossiped block
//! and a fetched one); they are tried in arrival order.
//!
//! At capacity a lower block displaces the highest waiting one, so the block
//! at `committed + 1` is always admitted.

use std::collections::{BTreeMap, VecDeque};

use shared_types::{Block, BlockState, NodeId};

/// A queued block and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledBlock {
    pub block: Block,
    pub source: NodeId,
    pub state: BlockState,
}

/// Outcome of offering a block to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Added as a new candidate.
    Queued,
    /// At or below the committed height.
    Stale,
    /// The same block is already waiting.
    Duplicate,
    /// The pool is at capacity and every waiting block is at or below this
    /// height.
    Full,
}

#[derive(Debug)]
pub struct BlockPool {
    pending: BTreeMap<u64, VecDeque<PooledBlock>>,
    len: usize,
    capacity: usize,
}

impl BlockPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: BTreeMap::new(),
            len: 0,
            capacity: capacity.max(1),
        }
    }

    /// Offer a block received from `source` while the chain tip is at
    /// `committed_height`.
    pub fn admit(&mut self, block: Block, source: NodeId, committed_height: u64) -> Admission {
        if block.height <= committed_height {
            return Admission::Stale;
        }
        let duplicate = self
            .pending
            .get(&block.height)
            .is_some_and(|candidates| candidates.iter().any(|c| c.block.hash == block.hash));
        if duplicate {
            return Admission::Duplicate;
        }
        if self.len >= self.capacity {
            match self.highest() {
                Some(top) if top > block.height => self.evict_highest(),
                _ => return Admission::Full,
            }
        }
        self.pending.entry(block.height).or_default().push_back(PooledBlock {
            block,
            source,
            state: BlockState::Queued,
        });
        self.len += 1;
        Admission::Queued
    }

    /// Next candidate at `height`, removed from the pool.
    pub fn take(&mut self, height: u64) -> Option<PooledBlock> {
        let candidates = self.pending.get_mut(&height)?;
        let next = candidates.pop_front();
        if candidates.is_empty() {
            self.pending.remove(&height);
        }
        if next.is_some() {
            self.len -= 1;
        }
        next
    }

    /// Drop every candidate at or below `height`.
    pub fn prune_through(&mut self, height: u64) -> usize {
        let keep = self.pending.split_off(&(height.saturating_add(1)));
        let dropped: usize = self.pending.values().map(VecDeque::len).sum();
        self.pending = keep;
        self.len -= dropped;
        dropped
    }

    /// Drop every candidate received from `source`.
    pub fn discard_from(&mut self, source: &NodeId) -> usize {
        let mut dropped = 0;
        self.pending.retain(|_, candidates| {
            let before = candidates.len();
            candidates.retain(|c| &c.source != source);
            dropped += before - candidates.len();
            !candidates.is_empty()
        });
        self.len -= dropped;
        dropped
    }

    /// Drop the latest candidate at the highest height.
    fn evict_highest(&mut self) {
        let Some(mut top) = self.pending.last_entry() else {
            return;
        };
        if top.get_mut().pop_back().is_some() {
            self.len -= 1;
        }
        if top.get().is_empty() {
            top.remove();
        }
    }

    /// Highest height with a waiting candidate.
    pub fn highest(&self) -> Option<u64> {
        self.pending.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ZERO_HASH;

    fn block(height: u64, payload: u8) -> Block {
        Block::new(height, ZERO_HASH, NodeId::new("c"), height, vec![payload])
    }

    fn src(id: &str) -> NodeId {
        NodeId::new(id)
    }

    #[test]
    fn test_admission_outcomes() {
        let mut pool = BlockPool::new(10);
        assert_eq!(pool.admit(block(1, 0), src("a"), 1), Admission::Stale);
        assert_eq!(pool.admit(block(2, 0), src("a"), 1), Admission::Queued);
        assert_eq!(pool.admit(block(2, 0), src("b"), 1), Admission::Duplicate);
        assert_eq!(pool.admit(block(2, 1), src("b"), 1), Admission::Queued);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_candidates_taken_in_arrival_order() {
        let mut pool = BlockPool::new(10);
        pool.admit(block(3, 1), src("a"), 0);
        pool.admit(block(3, 2), src("b"), 0);

        assert_eq!(pool.take(3).unwrap().source, src("a"));
        assert_eq!(pool.take(3).unwrap().source, src("b"));
        assert!(pool.take(3).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_capacity_bound() {
        let mut pool = BlockPool::new(1);
        assert_eq!(pool.admit(block(2, 0), src("a"), 0), Admission::Queued);
        assert_eq!(pool.admit(block(3, 0), src("a"), 0), Admission::Full);
        assert_eq!(pool.admit(block(2, 1), src("b"), 0), Admission::Full);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.highest(), Some(2));
    }

    #[test]
    fn test_next_height_displaces_far_future_blocks() {
        let mut pool = BlockPool::new(4);
        for h in 100..104 {
            assert_eq!(pool.admit(block(h, 0), src("spam"), 0), Admission::Queued);
        }
        assert_eq!(pool.admit(block(200, 0), src("spam"), 0), Admission::Full);

        assert_eq!(pool.admit(block(1, 0), src("good"), 0), Admission::Queued);
        assert_eq!(pool.admit(block(2, 0), src("good"), 0), Admission::Queued);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.highest(), Some(101));
        assert_eq!(pool.take(1).unwrap().source, src("good"));
    }

    #[test]
    fn test_prune_and_discard() {
        let mut pool = BlockPool::new(10);
        for h in 1..=5 {
            pool.admit(block(h, 0), src(if h % 2 == 0 { "a" } else { "b" }), 0);
        }
        assert_eq!(pool.prune_through(2), 2);
        assert_eq!(pool.discard_from(&src("b")), 2);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.highest(), Some(4));
    }
}
