//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Every section has sane defaults. `NodeConfig::from_env` applies the
//! `IC_*` environment overrides on top of them.

use ic_02_api_gateway::config::ProjectionConfigError;
use ic_02_api_gateway::ProjectionConfig;
use ic_03_blockchain_sync::{SyncConfig, SyncConfigError};
use serde::{Deserialize, Serialize};
use shared_types::NodeId;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::genesis::GenesisConfig;
use crate::redelivery::RedeliveryBackoff;

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Event bus configuration.
    pub bus: BusConfig,
    /// Block sync configuration.
    pub sync: SyncConfig,
    /// ICode projection configuration.
    pub projection: ProjectionConfig,
    /// Genesis block and block producers.
    pub genesis: GenesisConfig,
}

impl NodeConfig {
    /// In-memory storage and short timeouts.
    pub fn for_testing() -> Self {
        Self {
            storage: StorageConfig::for_testing(),
            bus: BusConfig::for_testing(),
            sync: SyncConfig::for_testing(),
            projection: ProjectionConfig::for_testing(),
            genesis: GenesisConfig::default(),
        }
    }

    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `IC_*` overrides read through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = lookup("IC_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(id) = lookup("IC_NODE_ID") {
            self.sync.node_id = NodeId::new(id);
        }
        if let Some(ms) = lookup("IC_FETCH_TIMEOUT_MS") {
            self.sync.fetch_timeout_ms = parse("IC_FETCH_TIMEOUT_MS", &ms)?;
        }
        if let Some(capacity) = lookup("IC_BUS_CAPACITY") {
            self.bus.capacity = parse("IC_BUS_CAPACITY", &capacity)?;
        }
        if let Some(backend) = lookup("IC_STORAGE_BACKEND") {
            self.storage.backend = parse("IC_STORAGE_BACKEND", &backend)?;
        }
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate()?;
        self.bus.validate()?;
        self.sync.validate()?;
        self.projection.validate()?;
        Ok(())
    }

    pub fn log_summary(&self) {
        info!(
            node_id = %self.sync.node_id,
            backend = %self.storage.backend,
            data_dir = %self.storage.data_dir.display(),
            bus_capacity = self.bus.capacity,
            fetch_timeout_ms = self.sync.fetch_timeout_ms,
            "Configuration loaded"
        );
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Bus capacity must be at least 1")]
    ZeroBusCapacity,

    #[error("Redelivery delay needs 0 < base <= cap, got base {base} ms, cap {cap} ms")]
    RedeliveryDelay { base: u64, cap: u64 },

    #[error("Storage backend {0} needs a data directory")]
    MissingDataDir(StorageBackend),

    #[error("Storage backend rocksdb requires the `rocksdb` feature")]
    RocksDbDisabled,

    #[error(transparent)]
    Sync(#[from] SyncConfigError),

    #[error(transparent)]
    Projection(#[from] ProjectionConfigError),
}

/// Key-value engine behind views and the committed chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Nothing survives a restart.
    Memory,
    /// Single snapshot file with atomic replace.
    #[default]
    File,
    /// RocksDB column store.
    RocksDb,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::RocksDb => "rocksdb",
        })
    }
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "rocksdb" => Ok(Self::RocksDb),
            _ => Err(()),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Data directory for views and the committed chain.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    pub fn for_testing() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::new(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend != StorageBackend::Memory && self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingDataDir(self.backend));
        }
        if self.backend == StorageBackend::RocksDb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::RocksDbDisabled);
        }
        Ok(())
    }
}

/// Event bus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Queue capacity per subscription.
    pub capacity: usize,
    /// Failed deliveries kept for redelivery.
    pub dead_letter_capacity: usize,
    /// First delay between redelivery passes in milliseconds.
    pub redelivery_base_ms: u64,
    /// Upper bound of the redelivery delay in milliseconds.
    pub redelivery_cap_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
            dead_letter_capacity: shared_bus::DEFAULT_DLQ_CAPACITY,
            redelivery_base_ms: 1_000,
            redelivery_cap_ms: 60_000,
        }
    }
}

impl BusConfig {
    pub fn for_testing() -> Self {
        Self {
            capacity: 64,
            dead_letter_capacity: 64,
            redelivery_base_ms: 20,
            redelivery_cap_ms: 200,
        }
    }

    pub fn redelivery_backoff(&self) -> RedeliveryBackoff {
        RedeliveryBackoff::new(
            Duration::from_millis(self.redelivery_base_ms),
            Duration::from_millis(self.redelivery_cap_ms),
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroBusCapacity);
        }
        if self.redelivery_base_ms == 0 || self.redelivery_cap_ms < self.redelivery_base_ms {
            return Err(ConfigError::RedeliveryDelay {
                base: self.redelivery_base_ms,
                cap: self.redelivery_cap_ms,
            });
        }
        Ok(())
    }
}
