//! # Sync Manager
//!
//! Runs the `SyncMachine` as its own control loop task. The loop owns the
//! machine outright; everything else talks to it through the bus, the
//! command queue or the published `SyncStatus`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use shared_bus::{EventPublisher, InMemoryEventBus, Subscription};
use shared_types::topics;

use super::machine::SyncMachine;
use crate::config::SyncConfig;
use crate::domain::{SyncError, SyncStatus};
use crate::ports::inbound::SyncControl;
use crate::ports::outbound::{BlockRepository, BlockValidator, PeerNetwork};

enum Command {
    Resync(oneshot::Sender<()>),
}

/// Builder for the sync control loop.
pub struct SyncManager {
    config: SyncConfig,
    repository: Arc<dyn BlockRepository>,
    network: Arc<dyn PeerNetwork>,
    validator: Arc<dyn BlockValidator>,
    publisher: Arc<dyn EventPublisher>,
}

impl SyncManager {
    pub fn new(
        config: SyncConfig,
        repository: Arc<dyn BlockRepository>,
        network: Arc<dyn PeerNetwork>,
        validator: Arc<dyn BlockValidator>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            repository,
            network,
            validator,
            publisher,
        }
    }

    /// Subscribe to peer and block events and spawn the control loop.
    ///
    /// The loop stops when `shutdown` turns `true` or its sender is dropped.
    pub fn start(
        self,
        bus: &InMemoryEventBus,
        shutdown: watch::Receiver<bool>,
    ) -> Result<SyncHandle, SyncError> {
        let nodes = bus.subscribe(topics::NODE_ALL)?;
        let blocks = bus.subscribe(topics::BLOCK_QUEUED)?;

        let tick = self.config.tick_interval();
        let (command_tx, command_rx) = mpsc::channel(self.config.command_capacity.max(1));
        let machine = SyncMachine::new(
            self.config,
            self.repository,
            self.network,
            self.validator,
            self.publisher,
        )?;
        let (status_tx, status_rx) = watch::channel(machine.status());

        info!(
            height = machine.local_height(),
            "[ic-03] 🚀 Sync manager started"
        );
        let task = tokio::spawn(control_loop(
            machine,
            ControlInputs {
                nodes,
                blocks,
                commands: command_rx,
                shutdown,
            },
            status_tx,
            tick,
        ));

        Ok(SyncHandle {
            status: status_rx,
            commands: command_tx,
            task: Mutex::new(Some(task)),
        })
    }
}

struct ControlInputs {
    nodes: Subscription,
    blocks: Subscription,
    commands: mpsc::Receiver<Command>,
    shutdown: watch::Receiver<bool>,
}

async fn control_loop(
    mut machine: SyncMachine,
    mut inputs: ControlInputs,
    status_tx: watch::Sender<SyncStatus>,
    tick: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        if *inputs.shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = inputs.shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            Some(command) = inputs.commands.recv() => match command {
                Command::Resync(reply) => {
                    machine.resync().await;
                    let _ = reply.send(());
                }
            },
            Some(event) = inputs.nodes.recv() => machine.on_event(&event).await,
            Some(event) = inputs.blocks.recv() => machine.on_event(&event).await,
            _ = ticker.tick() => machine.on_tick().await,
            () = std::future::ready(()), if machine.has_work() => machine.step().await,
        }

        status_tx.send_replace(machine.status());
    }

    info!(
        height = machine.local_height(),
        "[ic-03] Shutdown signal received"
    );
}

/// Control surface of a running sync manager.
pub struct SyncHandle {
    status: watch::Receiver<SyncStatus>,
    commands: mpsc::Sender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncHandle {
    /// Wait until a published status satisfies `predicate`.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&SyncStatus) -> bool,
    ) -> Result<SyncStatus, SyncError> {
        let mut status = self.status.clone();
        let matched = status
            .wait_for(predicate)
            .await
            .map_err(|_| SyncError::Stopped)?;
        Ok((*matched).clone())
    }

    /// Wait for the control loop to exit after shutdown was signalled.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                debug!(error = %e, "[ic-03] Control loop ended abnormally");
            }
        }
    }
}

#[async_trait]
impl SyncControl for SyncHandle {
    fn status(&self) -> SyncStatus {
        (*self.status.borrow()).clone()
    }

    async fn resync(&self) -> Result<(), SyncError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Resync(reply_tx))
            .await
            .map_err(|_| SyncError::Stopped)?;
        reply_rx.await.map_err(|_| SyncError::Stopped)
    }
}
