//! # Sync State Machine
//!
//! ```text
//!            peer set changed / gap / resync
//!   ┌──────┐ ─────────────────────────────→ ┌─────────────┐
//!   │ Idle │                                │ Discovering │
//!   └──────┘ ←───────── no peer ahead ───── └─────────────┘
//!      ↑                                        │  ↑
//!      │ local == target           source found │  │ source failed / rejected / gone
//!      │                                        ↓  │
//!      └─────────────────────────────────── ┌─────────┐
//!                                           │ Syncing │
//!                                           └─────────┘
//! ```
//!
//! Blocks commit strictly in height order: only the candidate at
//! `local + 1` is ever validated, whatever order blocks arrive in.

use std::sync::Arc;

use shared_bus::EventPublisher;
use shared_types::{
    Block, BlockQueued, BlockRejected, BlockState, BlockValidated, DomainEvent, EventPayload,
    NodeId, Peer, SyncState, SyncStateChanged,
};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::domain::validation::{validate_link, validate_structure};
use crate::domain::{
    Admission, BlockPool, PeerSet, PooledBlock, RejectionLog, RetryPolicy, SyncError,
    SyncSession, SyncStatus,
};
use crate::ports::outbound::{BlockRepository, BlockValidator, PeerNetwork};

/// The block synchronization state machine.
///
/// Owned by exactly one task; every method takes `&mut self`.
pub struct SyncMachine {
    config: SyncConfig,
    retry: RetryPolicy,
    session: SyncSession,
    peers: PeerSet,
    pool: BlockPool,
    rejections: RejectionLog,
    /// Last committed block.
    tip: Block,
    repository: Arc<dyn BlockRepository>,
    network: Arc<dyn PeerNetwork>,
    validator: Arc<dyn BlockValidator>,
    publisher: Arc<dyn EventPublisher>,
}

impl SyncMachine {
    /// Build a machine resuming from the repository's committed tip.
    pub fn new(
        config: SyncConfig,
        repository: Arc<dyn BlockRepository>,
        network: Arc<dyn PeerNetwork>,
        validator: Arc<dyn BlockValidator>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, SyncError> {
        let tip = repository.tip()?;
        Ok(Self {
            retry: config.retry_policy(),
            session: SyncSession::new(tip.height),
            peers: PeerSet::new(),
            pool: BlockPool::new(config.max_pool_blocks),
            rejections: RejectionLog::new(config.max_rejected_blocks),
            config,
            tip,
            repository,
            network,
            validator,
            publisher,
        })
    }

    pub fn state(&self) -> SyncState {
        self.session.state
    }

    pub fn local_height(&self) -> u64 {
        self.session.local_height
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            state: self.session.state,
            local_height: self.session.local_height,
            target_height: self.session.target_height,
            source: self.session.source.clone(),
            peers: self.peers.len(),
            pooled_blocks: self.pool.len(),
            rejected_blocks: self.rejections.len(),
        }
    }

    /// Whether `step` has something to do.
    pub fn has_work(&self) -> bool {
        self.session.state != SyncState::Idle
    }

    /// Apply one bus event.
    pub async fn on_event(&mut self, event: &DomainEvent) {
        match &event.payload {
            EventPayload::NodeCreated(e) => self.on_peer_seen(e.peer.clone()).await,
            EventPayload::NodeUpdated(e) => self.on_peer_seen(e.peer.clone()).await,
            EventPayload::NodeDeleted(e) => self.on_peer_gone(&e.peer.node_id).await,
            EventPayload::BlockQueued(e) => self.on_block_queued(e.clone()).await,
            _ => debug!(topic = %event.topic, "[ic-03] Ignoring event"),
        }
    }

    async fn on_peer_seen(&mut self, peer: Peer) {
        if peer.node_id == self.config.node_id {
            return;
        }
        let node_id = peer.node_id.clone();
        if self.peers.upsert(peer) {
            info!(peer = %node_id, peers = self.peers.len(), "[ic-03] Peer joined");
            if self.session.state == SyncState::Idle {
                self.transition(SyncState::Discovering).await;
            }
        }
    }

    async fn on_peer_gone(&mut self, node_id: &NodeId) {
        if !self.peers.remove(node_id) {
            return;
        }
        info!(peer = %node_id, peers = self.peers.len(), "[ic-03] Peer left");

        if self.session.source.as_ref() == Some(node_id) {
            // Blocks already received from it stay queued; only new fetches
            // go elsewhere.
            self.session.source = None;
        }
        if self.session.state == SyncState::Idle {
            self.transition(SyncState::Discovering).await;
        }
    }

    async fn on_block_queued(&mut self, queued: BlockQueued) {
        let BlockQueued { block, source } = queued;
        let height = block.height;

        if self.rejections.is_rejected(height, &block.hash, &source) {
            debug!(height, source = %source, "[ic-03] Dropping previously rejected block");
            return;
        }

        match self.pool.admit(block, source, self.session.local_height) {
            Admission::Queued => {}
            Admission::Full => {
                warn!(height, pooled = self.pool.len(), "[ic-03] Block pool full, dropping block");
                return;
            }
            other => {
                debug!(height, admission = ?other, "[ic-03] Block not queued");
                return;
            }
        }

        if let Err(e) = self.drain().await {
            self.abort(e).await;
            return;
        }

        if self.session.state == SyncState::Idle && height > self.session.local_height + 1 {
            debug!(
                height,
                local = self.session.local_height,
                "[ic-03] Gap behind queued block"
            );
            self.transition(SyncState::Discovering).await;
        }
    }

    /// Periodic tick: retry discovery while queued blocks wait behind a gap.
    pub async fn on_tick(&mut self) {
        let gap = self
            .pool
            .highest()
            .is_some_and(|h| h > self.session.local_height);
        if self.session.state == SyncState::Idle && gap && !self.peers.is_empty() {
            self.transition(SyncState::Discovering).await;
        }
    }

    /// Forget rejections and exclusions and rediscover.
    pub async fn resync(&mut self) {
        info!(
            rejected = self.rejections.len(),
            "[ic-03] 🔄 Resync requested"
        );
        self.rejections.clear();
        self.peers.clear_exclusions();
        self.session.source = None;
        self.transition(SyncState::Discovering).await;
    }

    /// Run one unit of work for the current state.
    pub async fn step(&mut self) {
        let result = match self.session.state {
            SyncState::Idle => Ok(()),
            SyncState::Discovering => {
                self.discover().await;
                Ok(())
            }
            SyncState::Syncing => self.sync_batch().await,
        };
        if let Err(e) = result {
            self.abort(e).await;
        }
    }

    async fn discover(&mut self) {
        let candidates = self.peers.candidates();
        if candidates.is_empty() {
            debug!("[ic-03] No candidate peers");
            self.transition(SyncState::Idle).await;
            return;
        }

        let local = self.session.local_height;
        let network = Arc::clone(&self.network);
        let mut best: Option<(NodeId, u64)> = None;

        for peer in candidates {
            let result = self
                .retry
                .run(&peer.node_id, || network.chain_height(&peer))
                .await;
            match result {
                Ok(height) if height > local => {
                    debug!(peer = %peer.node_id, height, "[ic-03] Peer ahead");
                    if best.as_ref().map_or(true, |(_, h)| height > *h) {
                        best = Some((peer.node_id, height));
                    }
                }
                Ok(height) => {
                    debug!(peer = %peer.node_id, height, "[ic-03] Peer not ahead");
                }
                Err(e) => {
                    warn!(peer = %peer.node_id, error = %e, "[ic-03] Peer unreachable, excluding");
                    self.peers.exclude(&peer.node_id);
                }
            }
        }

        match best {
            Some((source, height)) => {
                info!(
                    source = %source,
                    target = height,
                    local,
                    "[ic-03] Sync source selected"
                );
                self.session.source = Some(source);
                self.session.target_height = height;
                self.transition(SyncState::Syncing).await;
            }
            None => self.transition(SyncState::Idle).await,
        }
    }

    /// Commit what is already queued, then fetch the next batch from the
    /// source.
    async fn sync_batch(&mut self) -> Result<(), SyncError> {
        self.drain().await?;
        if self.session.state != SyncState::Syncing {
            return Ok(());
        }
        if self.session.is_caught_up() {
            info!(
                height = self.session.local_height,
                "[ic-03] ✅ Caught up"
            );
            self.transition(SyncState::Idle).await;
            return Ok(());
        }

        let source = match self.session.source.clone() {
            Some(id) if !self.peers.is_excluded(&id) => self.peers.get(&id).cloned(),
            _ => None,
        };
        let Some(peer) = source else {
            self.session.source = None;
            self.transition(SyncState::Discovering).await;
            return Ok(());
        };

        let before = self.session.local_height;
        let from = before + 1;
        let remaining = self.session.target_height - before;
        let max = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(self.config.batch_size);

        let network = Arc::clone(&self.network);
        let fetched = self
            .retry
            .run(&peer.node_id, || network.fetch_blocks(&peer, from, max))
            .await;

        let blocks = match fetched {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(peer = %peer.node_id, error = %e, "[ic-03] Fetch failed, excluding source");
                self.drop_source(&peer.node_id).await;
                return Ok(());
            }
        };

        debug!(
            peer = %peer.node_id,
            from,
            received = blocks.len(),
            "[ic-03] Batch received"
        );
        for block in blocks {
            if self.rejections.is_rejected(block.height, &block.hash, &peer.node_id) {
                continue;
            }
            if self.pool.admit(block, peer.node_id.clone(), self.session.local_height)
                == Admission::Full
            {
                warn!(pooled = self.pool.len(), "[ic-03] Block pool full, truncating batch");
                break;
            }
        }

        self.drain().await?;

        if self.session.state == SyncState::Syncing && self.session.local_height == before {
            warn!(peer = %peer.node_id, from, "[ic-03] Source made no progress, excluding");
            self.drop_source(&peer.node_id).await;
        }
        Ok(())
    }

    /// Validate and commit queued blocks while the next height is present.
    async fn drain(&mut self) -> Result<usize, SyncError> {
        let mut committed = 0;

        while let Some(mut candidate) = self.pool.take(self.session.local_height + 1) {
            let verdict = validate_structure(&candidate.block, self.config.max_payload_bytes)
                .and_then(|()| validate_link(&candidate.block, &self.tip))
                .and_then(|()| self.validator.validate(&candidate.block, &self.tip));

            if let Err(e) = verdict {
                self.reject(candidate, e.to_string()).await;
                continue;
            }
            candidate.state = BlockState::Validated;

            self.repository.commit(&candidate.block)?;
            candidate.state = BlockState::Committed;

            let height = candidate.block.height;
            debug!(
                height,
                hash = %candidate.block.short_hash(),
                source = %candidate.source,
                state = ?candidate.state,
                "[ic-03] Block committed"
            );
            self.tip = candidate.block.clone();
            self.session.local_height = height;
            self.session.target_height = self.session.target_height.max(height);
            self.pool.prune_through(height);
            self.rejections.prune_through(height);
            self.publisher
                .publish(DomainEvent::new(BlockValidated {
                    block: candidate.block,
                }))
                .await;
            committed += 1;
        }

        Ok(committed)
    }

    async fn reject(&mut self, mut candidate: PooledBlock, reason: String) {
        candidate.state = BlockState::Rejected;
        let PooledBlock { block, source, .. } = candidate;
        warn!(
            height = block.height,
            hash = %block.short_hash(),
            source = %source,
            reason = %reason,
            "[ic-03] ❌ Block rejected"
        );

        self.rejections.record(block.height, block.hash, source.clone());
        self.publisher
            .publish(DomainEvent::new(BlockRejected {
                height: block.height,
                hash: block.hash,
                source: source.clone(),
                reason,
            }))
            .await;

        let discarded = self.pool.discard_from(&source);
        if discarded > 0 {
            debug!(source = %source, discarded, "[ic-03] Discarded blocks from rejected source");
        }
        self.peers.exclude(&source);

        if self.session.source.as_ref() == Some(&source) {
            self.drop_source(&source).await;
        }
    }

    async fn drop_source(&mut self, source: &NodeId) {
        self.peers.exclude(source);
        self.session.source = None;
        if self.session.state == SyncState::Syncing {
            self.transition(SyncState::Discovering).await;
        }
    }

    /// Abandon the current attempt after a storage failure.
    async fn abort(&mut self, e: SyncError) {
        error!(error = %e, "[ic-03] Sync attempt aborted");
        if self.session.state != SyncState::Idle {
            self.transition(SyncState::Idle).await;
        }
    }

    async fn transition(&mut self, to: SyncState) {
        let from = self.session.state;
        if from == to {
            return;
        }
        self.session.state = to;

        match to {
            SyncState::Idle => {
                self.session.source = None;
                self.session.target_height = self.session.local_height;
                self.peers.clear_exclusions();
            }
            SyncState::Discovering => self.session.source = None,
            SyncState::Syncing => {}
        }

        info!(
            from = ?from,
            to = ?to,
            local = self.session.local_height,
            target = self.session.target_height,
            "[ic-03] Sync state changed"
        );
        self.publisher
            .publish(DomainEvent::new(SyncStateChanged {
                state: to,
                local_height: self.session.local_height,
                target_height: self.session.target_height,
            }))
            .await;
    }
}
