//! # Key-Value Block Repository
//!
//! | Key | Value |
//! |-----|-------|
//! | `chain:block:<height u64 BE>` | bincode `Block` |
//! | `chain:tip` | tip height, u64 BE |

use ic_01_view_store::{BatchOperation, KeyValueStore};
use shared_types::Block;
use std::sync::Arc;
use tracing::info;

use crate::domain::SyncError;
use crate::ports::outbound::BlockRepository;

const BLOCK_PREFIX: &[u8] = b"chain:block:";
const TIP_KEY: &[u8] = b"chain:tip";

fn block_key(height: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(BLOCK_PREFIX.len() + 8);
    key.extend_from_slice(BLOCK_PREFIX);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

pub struct KvBlockRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvBlockRepository {
    /// Open the chain in `store`, writing `genesis` if the chain is empty.
    ///
    /// # Errors
    ///
    /// `SyncError::Storage` if the stored genesis differs from `genesis`.
    pub fn open(store: Arc<dyn KeyValueStore>, genesis: &Block) -> Result<Self, SyncError> {
        let repo = Self { store };

        match repo.block_at(0)? {
            Some(stored) if stored.hash == genesis.hash => {
                let tip = repo.tip()?;
                info!("[ic-03] ⛓️ Chain opened at height {}", tip.height);
            }
            Some(stored) => {
                return Err(SyncError::Storage(format!(
                    "stored genesis {} does not match configured genesis {}",
                    stored.short_hash(),
                    genesis.short_hash()
                )));
            }
            None => {
                repo.store.atomic_batch_write(vec![
                    BatchOperation::put(block_key(0), encode(genesis)?),
                    BatchOperation::put(TIP_KEY, 0u64.to_be_bytes().to_vec()),
                ])?;
                info!("[ic-03] 🌱 Genesis {} written", genesis.short_hash());
            }
        }

        Ok(repo)
    }

    fn tip_height(&self) -> Result<u64, SyncError> {
        let bytes = self
            .store
            .get(TIP_KEY)?
            .ok_or_else(|| SyncError::Storage("chain tip missing".into()))?;
        let raw: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SyncError::Storage("chain tip malformed".into()))?;
        Ok(u64::from_be_bytes(raw))
    }
}

fn encode(block: &Block) -> Result<Vec<u8>, SyncError> {
    bincode::serialize(block).map_err(|e| SyncError::Storage(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Block, SyncError> {
    bincode::deserialize(bytes).map_err(|e| SyncError::Storage(e.to_string()))
}

impl BlockRepository for KvBlockRepository {
    fn tip(&self) -> Result<Block, SyncError> {
        let height = self.tip_height()?;
        self.block_at(height)?
            .ok_or_else(|| SyncError::Storage(format!("tip block {height} missing")))
    }

    fn block_at(&self, height: u64) -> Result<Option<Block>, SyncError> {
        self.store
            .get(&block_key(height))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn commit(&self, block: &Block) -> Result<(), SyncError> {
        let tip = self.tip_height()?;
        if block.height != tip + 1 {
            return Err(SyncError::Storage(format!(
                "commit of height {} on tip {}",
                block.height, tip
            )));
        }
        self.store.atomic_batch_write(vec![
            BatchOperation::put(block_key(block.height), encode(block)?),
            BatchOperation::put(TIP_KEY, block.height.to_be_bytes().to_vec()),
        ])?;
        Ok(())
    }
}
