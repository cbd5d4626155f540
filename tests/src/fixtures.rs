//! Shared fixtures for the integration scenarios and benchmarks.

use std::time::Duration;

use shared_types::{Block, DomainEvent, ICodeCreated, NodeId, Version};

/// `genesis` followed by `len` blocks produced by `creator`.
pub fn chain(genesis: &Block, creator: &str, len: u64) -> Vec<Block> {
    let mut blocks = vec![genesis.clone()];
    for h in 1..=len {
        let parent = &blocks[blocks.len() - 1];
        let block = Block::new(
            h,
            parent.hash,
            NodeId::new(creator),
            parent.timestamp + 1,
            format!("tx-batch-{h}").into_bytes(),
        );
        blocks.push(block);
    }
    blocks
}

pub fn icode(id: &str, git_url: &str, commit_hash: &str) -> ICodeCreated {
    ICodeCreated {
        id: id.into(),
        repository_name: format!("repo-{id}"),
        git_url: git_url.into(),
        path: "/".into(),
        commit_hash: commit_hash.into(),
        version: Version::new(1, 0, 0),
    }
}

pub fn icode_created(id: &str, git_url: &str, commit_hash: &str) -> DomainEvent {
    DomainEvent::new(icode(id, git_url, commit_hash))
}

/// Poll `condition` every 5 ms until it holds or `timeout` passes.
pub async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
