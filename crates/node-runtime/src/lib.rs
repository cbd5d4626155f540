//! # Node Runtime
//!
//! Wires the bus, the view store, the ICode projection and block sync into
//! one node. Holds no business logic of its own.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Open storage; write genesis if the chain is empty
//! 3. Subscribe the ICode projection to `icode.*`
//! 4. Start the sync control loop on `node.*` and `block.queued`
//! 5. Start dead letter redelivery
//!
//! ## Shutdown Sequence
//!
//! 1. Signal shutdown to the sync loop and redelivery, wait for both
//! 2. Unsubscribe the projection; its worker drains queued events first

pub mod container;
pub mod genesis;
pub mod logging;
pub mod redelivery;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use ic_02_api_gateway::{ICodeEventHandler, ICodeQuery};
use ic_03_blockchain_sync::{InMemoryPeerNetwork, PeerNetwork, SyncHandle, SyncManager};
use shared_bus::{InMemoryEventBus, SubscriptionHandle};
use shared_types::topics;

pub use container::{NodeConfig, NodeContainer};

/// The main node runtime.
pub struct NodeRuntime {
    container: NodeContainer,
    network: Arc<dyn PeerNetwork>,
    projection: Option<SubscriptionHandle>,
    sync: Option<SyncHandle>,
    redelivery: Option<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Runtime whose peers are served from memory.
    ///
    /// Peer transport is provided by the embedding application through
    /// [`NodeRuntime::with_network`].
    pub fn new(config: NodeConfig) -> Result<Self> {
        Self::with_network(config, Arc::new(InMemoryPeerNetwork::new()))
    }

    pub fn with_network(config: NodeConfig, network: Arc<dyn PeerNetwork>) -> Result<Self> {
        info!("Creating ICode node runtime");
        let container = NodeContainer::new(config)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            container,
            network,
            projection: None,
            sync: None,
            redelivery: None,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  ICode Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        self.container.config.log_summary();

        let handler = Arc::new(ICodeEventHandler::new(
            Arc::clone(&self.container.meta_repository),
            self.container.config.projection.clone(),
        ));
        let projection = self
            .container
            .bus
            .subscribe_handler(topics::ICODE_ALL, handler)
            .context("Failed to subscribe ICode projection")?;
        info!("[ic-02] ICode projection subscribed to {}", topics::ICODE_ALL);
        self.projection = Some(projection);

        let manager = SyncManager::new(
            self.container.config.sync.clone(),
            self.container.chain.clone(),
            Arc::clone(&self.network),
            self.container.config.genesis.validator(),
            Arc::new(self.container.bus.clone()),
        );
        let sync = manager
            .start(&self.container.bus, self.shutdown_rx.clone())
            .context("Failed to start block sync")?;
        self.sync = Some(sync);

        self.redelivery = Some(tokio::spawn(redelivery::run(
            self.container.bus.clone(),
            self.container.config.bus.redelivery_backoff(),
            self.shutdown_rx.clone(),
        )));

        info!("All subsystems started");
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        if let Some(sync) = self.sync.take() {
            sync.join().await;
        }
        if let Some(task) = self.redelivery.take() {
            if let Err(e) = task.await {
                error!("Redelivery task failed: {}", e);
            }
        }
        if let Some(projection) = self.projection.take() {
            projection.unsubscribe().await;
        }

        info!("Shutdown complete");
    }

    pub fn bus(&self) -> &InMemoryEventBus {
        &self.container.bus
    }

    pub fn query(&self) -> Arc<dyn ICodeQuery> {
        Arc::clone(&self.container.query)
    }

    /// Control surface of block sync, once started.
    pub fn sync(&self) -> Option<&SyncHandle> {
        self.sync.as_ref()
    }

    pub fn container(&self) -> &NodeContainer {
        &self.container
    }
}
