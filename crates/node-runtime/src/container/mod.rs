//! # Node Container
//!
//! Holds the shared infrastructure and the services built on it. Everything
//! is constructed here and handed out as `Arc` handles; nothing is global.
//!
//! ```text
//! StorageConfig ──→ KeyValueStore ──┬──→ ViewMetaRepository ──→ ICodeQueryApi
//!                                   └──→ KvBlockRepository (genesis on first open)
//! BusConfig ──────→ InMemoryEventBus
//! ```

pub mod config;

pub use config::{BusConfig, ConfigError, NodeConfig, StorageBackend, StorageConfig};

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use ic_01_view_store::{FileBackedKVStore, InMemoryKVStore, KeyValueStore};
use ic_02_api_gateway::{ICodeQuery, ICodeQueryApi, MetaRepository, ViewMetaRepository};
use ic_03_blockchain_sync::KvBlockRepository;
use shared_bus::InMemoryEventBus;

/// File name of the snapshot used by the file backend.
const FILE_STORE_NAME: &str = "node.db";
/// Directory name used by the RocksDB backend.
#[cfg(feature = "rocksdb")]
const ROCKSDB_DIR_NAME: &str = "rocksdb";

/// Shared infrastructure of one node.
pub struct NodeContainer {
    pub config: NodeConfig,
    pub bus: InMemoryEventBus,
    /// Backing store of views and the committed chain.
    pub store: Arc<dyn KeyValueStore>,
    pub meta_repository: Arc<dyn MetaRepository>,
    pub query: Arc<dyn ICodeQuery>,
    pub chain: Arc<KvBlockRepository>,
}

impl NodeContainer {
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate().context("Invalid node configuration")?;

        let bus = InMemoryEventBus::with_limits(config.bus.capacity, config.bus.dead_letter_capacity);
        let store = open_store(&config.storage)?;

        let meta_repository: Arc<dyn MetaRepository> =
            Arc::new(ViewMetaRepository::new(Arc::clone(&store)));
        let query: Arc<dyn ICodeQuery> = Arc::new(ICodeQueryApi::new(Arc::clone(&meta_repository)));

        let chain = Arc::new(
            KvBlockRepository::open(Arc::clone(&store), &config.genesis.block())
                .context("Failed to open committed chain")?,
        );

        info!(
            backend = %config.storage.backend,
            "Node container initialized"
        );

        Ok(Self {
            config,
            bus,
            store,
            meta_repository,
            query,
            chain,
        })
    }
}

fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryKVStore::new())),
        StorageBackend::File => {
            std::fs::create_dir_all(&config.data_dir).with_context(|| {
                format!("Failed to create data dir {}", config.data_dir.display())
            })?;
            let path = config.data_dir.join(FILE_STORE_NAME);
            let store = FileBackedKVStore::open(&path)
                .with_context(|| format!("Failed to open store {}", path.display()))?;
            Ok(Arc::new(store))
        }
        StorageBackend::RocksDb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    let path = config.data_dir.join(ROCKSDB_DIR_NAME);
    let store = ic_01_view_store::RocksDbStore::open_default(&path)
        .with_context(|| format!("Failed to open RocksDB at {}", path.display()))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    Err(ConfigError::RocksDbDisabled.into())
}
