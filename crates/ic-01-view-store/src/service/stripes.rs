//! # Striped Key Locks
//!
//! A fixed pool of mutexes indexed by key hash. Writers to the same key
//! always contend on the same stripe; writers to distinct keys usually do
//! not.

use parking_lot::{Mutex, MutexGuard};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default number of stripes.
pub const DEFAULT_STRIPES: usize = 64;

pub struct KeyStripes {
    stripes: Vec<Mutex<()>>,
}

impl KeyStripes {
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            stripes: (0..count.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    /// Lock the stripes of every key.
    ///
    /// Stripes are taken in ascending index order and each at most once, so
    /// two callers locking overlapping key sets cannot deadlock.
    pub fn lock_all(&self, keys: &[&str]) -> Vec<MutexGuard<'_, ()>> {
        let mut indices: Vec<usize> = keys.iter().map(|k| self.index(k)).collect();
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|i| self.stripes[i].lock()).collect()
    }
}

impl Default for KeyStripes {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_stripe() {
        let stripes = KeyStripes::default();
        assert_eq!(stripes.index("icode-1"), stripes.index("icode-1"));
    }

    #[test]
    fn test_duplicate_keys_lock_once() {
        // A single stripe forces a collision; locking twice would deadlock.
        let stripes = KeyStripes::new(1);
        let guards = stripes.lock_all(&["a", "b", "a"]);
        assert_eq!(guards.len(), 1);
    }

    #[test]
    fn test_stripe_released_on_drop() {
        let stripes = KeyStripes::new(4);
        drop(stripes.lock_all(&["a"]));
        assert_eq!(stripes.lock_all(&["a"]).len(), 1);
    }
}
