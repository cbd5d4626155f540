//! Storage Adapters
//!
//! Implementations of the `KeyValueStore` trait.

mod file;
mod memory;
#[cfg(feature = "rocksdb")]
mod rocksdb;

pub use file::FileBackedKVStore;
pub use memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::{RocksDbConfig, RocksDbStore};

use crate::ports::outbound::{BatchOperation, ScanResult};
use std::collections::BTreeMap;

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// Apply a batch, returning the previous value of every touched key so a
/// failed persist can be rolled back.
fn apply_batch(data: &mut Table, operations: Vec<BatchOperation>) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
    let mut undo = Vec::with_capacity(operations.len());
    for op in operations {
        match op {
            BatchOperation::Put { key, value } => {
                let previous = data.insert(key.clone(), value);
                undo.push((key, previous));
            }
            BatchOperation::Delete { key } => {
                let previous = data.remove(&key);
                undo.push((key, previous));
            }
        }
    }
    undo
}

fn rollback(data: &mut Table, undo: Vec<(Vec<u8>, Option<Vec<u8>>)>) {
    // Reverse order restores keys touched more than once.
    for (key, previous) in undo.into_iter().rev() {
        match previous {
            Some(value) => {
                data.insert(key, value);
            }
            None => {
                data.remove(&key);
            }
        }
    }
}

fn scan(data: &Table, prefix: &[u8]) -> ScanResult {
    data.range(prefix.to_vec()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_restores_overwritten_and_inserted_keys() {
        let mut data = Table::new();
        data.insert(b"a".to_vec(), b"1".to_vec());

        let undo = apply_batch(
            &mut data,
            vec![
                BatchOperation::put(b"a".to_vec(), b"2".to_vec()),
                BatchOperation::put(b"a".to_vec(), b"3".to_vec()),
                BatchOperation::put(b"b".to_vec(), b"x".to_vec()),
            ],
        );
        rollback(&mut data, undo);

        assert_eq!(data.get(b"a".as_slice()), Some(&b"1".to_vec()));
        assert!(!data.contains_key(b"b".as_slice()));
    }

    #[test]
    fn test_scan_is_ordered_and_bounded() {
        let mut data = Table::new();
        for key in ["b:2", "a:1", "b:1", "c:1"] {
            data.insert(key.as_bytes().to_vec(), Vec::new());
        }
        let keys: Vec<_> = scan(&data, b"b:").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"b:1".to_vec(), b"b:2".to_vec()]);
    }
}
