//! # Domain Events
//!
//! Immutable facts published on the shared bus. Every event travels inside a
//! `DomainEvent` envelope which stamps a unique id, the routing topic, the
//! creation time and the schema version.
//!
//! ## Topics
//!
//! ```text
//! node.created | node.updated | node.deleted          (peer membership)
//! block.queued | block.validated | block.rejected     (block lifecycle)
//! blockchain.sync_state                               (sync session)
//! icode.created | icode.status_changed | icode.deleted (read model)
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Block, Hash, ICodeStatus, NodeId, Peer, Version};

/// Current schema version stamped on every event.
pub const EVENT_VERSION: u16 = 1;

/// Aggregate id used by all sync start/finish events.
pub const BC_SYNC_STATE_ID: &str = "BC_SYNC_STATE_ID";

/// Well-known topic names (`<domain>.<action>`).
pub mod topics {
    pub const NODE_CREATED: &str = "node.created";
    pub const NODE_UPDATED: &str = "node.updated";
    pub const NODE_DELETED: &str = "node.deleted";
    pub const BLOCK_QUEUED: &str = "block.queued";
    pub const BLOCK_VALIDATED: &str = "block.validated";
    pub const BLOCK_REJECTED: &str = "block.rejected";
    pub const SYNC_STATE: &str = "blockchain.sync_state";
    pub const ICODE_CREATED: &str = "icode.created";
    pub const ICODE_STATUS_CHANGED: &str = "icode.status_changed";
    pub const ICODE_DELETED: &str = "icode.deleted";

    /// Every node membership topic.
    pub const NODE_ALL: &str = "node.*";
    /// Every ICode topic.
    pub const ICODE_ALL: &str = "icode.*";
}

/// Envelope for every fact published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Globally unique event id (deduplication key).
    pub id: Uuid,
    /// Id of the entity the fact is about.
    pub aggregate_id: String,
    /// Routing topic.
    pub topic: String,
    /// Unix milliseconds at creation.
    pub created_at: u64,
    /// Schema version.
    pub version: u16,
    /// The fact itself.
    pub payload: EventPayload,
}

impl DomainEvent {
    /// Wrap a payload, routing it to the payload's default topic.
    pub fn new(payload: impl Into<EventPayload>) -> Self {
        let payload = payload.into();
        let topic = payload.default_topic().to_string();
        Self::on_topic(topic, payload)
    }

    /// Wrap a payload on an explicit topic.
    pub fn on_topic(topic: impl Into<String>, payload: impl Into<EventPayload>) -> Self {
        let payload = payload.into();
        Self {
            id: Uuid::new_v4(),
            aggregate_id: payload.aggregate_id(),
            topic: topic.into(),
            created_at: crate::now_millis(),
            version: EVENT_VERSION,
            payload,
        }
    }
}

/// Tagged union of every event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    NodeCreated(NodeCreated),
    NodeUpdated(NodeUpdated),
    NodeDeleted(NodeDeleted),
    BlockQueued(BlockQueued),
    BlockValidated(BlockValidated),
    BlockRejected(BlockRejected),
    SyncStateChanged(SyncStateChanged),
    ICodeCreated(ICodeCreated),
    ICodeStatusChanged(ICodeStatusChanged),
    ICodeDeleted(ICodeDeleted),
}

impl EventPayload {
    /// Topic this kind of fact is published on.
    #[must_use]
    pub fn default_topic(&self) -> &'static str {
        match self {
            Self::NodeCreated(_) => topics::NODE_CREATED,
            Self::NodeUpdated(_) => topics::NODE_UPDATED,
            Self::NodeDeleted(_) => topics::NODE_DELETED,
            Self::BlockQueued(_) => topics::BLOCK_QUEUED,
            Self::BlockValidated(_) => topics::BLOCK_VALIDATED,
            Self::BlockRejected(_) => topics::BLOCK_REJECTED,
            Self::SyncStateChanged(_) => topics::SYNC_STATE,
            Self::ICodeCreated(_) => topics::ICODE_CREATED,
            Self::ICodeStatusChanged(_) => topics::ICODE_STATUS_CHANGED,
            Self::ICodeDeleted(_) => topics::ICODE_DELETED,
        }
    }

    /// Id of the entity this fact is about.
    #[must_use]
    pub fn aggregate_id(&self) -> String {
        match self {
            Self::NodeCreated(e) => e.peer.node_id.to_string(),
            Self::NodeUpdated(e) => e.peer.node_id.to_string(),
            Self::NodeDeleted(e) => e.peer.node_id.to_string(),
            Self::BlockQueued(e) => hex::encode(e.block.hash),
            Self::BlockValidated(e) => hex::encode(e.block.hash),
            Self::BlockRejected(e) => hex::encode(e.hash),
            Self::SyncStateChanged(_) => BC_SYNC_STATE_ID.to_string(),
            Self::ICodeCreated(e) => e.id.clone(),
            Self::ICodeStatusChanged(e) => e.id.clone(),
            Self::ICodeDeleted(e) => e.id.clone(),
        }
    }
}

macro_rules! impl_into_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for EventPayload {
                fn from(value: $variant) -> Self {
                    EventPayload::$variant(value)
                }
            }
        )*
    };
}

impl_into_payload!(
    NodeCreated,
    NodeUpdated,
    NodeDeleted,
    BlockQueued,
    BlockValidated,
    BlockRejected,
    SyncStateChanged,
    ICodeCreated,
    ICodeStatusChanged,
    ICodeDeleted,
);

// =============================================================================
// PEER MEMBERSHIP
// =============================================================================

/// A peer joined the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCreated {
    pub peer: Peer,
}

/// A peer's address or role changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdated {
    pub peer: Peer,
}

/// A peer left the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDeleted {
    pub peer: Peer,
}

// =============================================================================
// BLOCK LIFECYCLE
// =============================================================================

/// A block arrived and was queued for validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockQueued {
    pub block: Block,
    /// Peer the block was received from.
    pub source: NodeId,
}

/// A block was validated and durably committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockValidated {
    pub block: Block,
}

/// A block failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRejected {
    pub height: u64,
    pub hash: Hash,
    pub source: NodeId,
    pub reason: String,
}

/// Phase of the block synchronization state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SyncState {
    /// Caught up, or no peers known.
    #[default]
    Idle,
    /// Querying peers for their heights.
    Discovering,
    /// Fetching and committing blocks above the local height.
    Syncing,
}

/// The sync state machine changed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStateChanged {
    pub state: SyncState,
    pub local_height: u64,
    pub target_height: u64,
}

// =============================================================================
// ICODE READ MODEL
// =============================================================================

/// Deployed-code metadata was registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ICodeCreated {
    pub id: String,
    pub repository_name: String,
    pub git_url: String,
    pub path: String,
    pub commit_hash: String,
    pub version: Version,
}

/// Deployed-code status changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ICodeStatusChanged {
    pub id: String,
    pub status: ICodeStatus,
}

/// Deployed-code metadata was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ICodeDeleted {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ZERO_HASH;

    #[test]
    fn test_default_topics() {
        let event = DomainEvent::new(ICodeDeleted { id: "1".into() });
        assert_eq!(event.topic, topics::ICODE_DELETED);
        assert_eq!(event.aggregate_id, "1");
        assert_eq!(event.version, EVENT_VERSION);
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = DomainEvent::new(ICodeDeleted { id: "1".into() });
        let b = DomainEvent::new(ICodeDeleted { id: "1".into() });
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_sync_state_uses_fixed_aggregate() {
        let event = DomainEvent::new(SyncStateChanged {
            state: SyncState::Syncing,
            local_height: 0,
            target_height: 3,
        });
        assert_eq!(event.aggregate_id, BC_SYNC_STATE_ID);
        assert_eq!(event.topic, topics::SYNC_STATE);
    }

    #[test]
    fn test_block_events_keyed_by_hash() {
        let block = Block::new(1, ZERO_HASH, NodeId::new("a"), 1, vec![]);
        let event = DomainEvent::new(BlockValidated {
            block: block.clone(),
        });
        assert_eq!(event.aggregate_id, hex::encode(block.hash));
        assert_eq!(event.topic, topics::BLOCK_VALIDATED);
    }

    #[test]
    fn test_explicit_topic() {
        let event = DomainEvent::on_topic("icode.custom", ICodeDeleted { id: "9".into() });
        assert_eq!(event.topic, "icode.custom");
    }

    #[test]
    fn test_json_round_trip() {
        let event = DomainEvent::new(ICodeCreated {
            id: "1".into(),
            repository_name: "a".into(),
            git_url: "b".into(),
            path: "c".into(),
            commit_hash: "d".into(),
            version: Version::default(),
        });
        let json = serde_json::to_string(&event).unwrap();
        let decoded: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
