//! # Block Sync Flows
//!
//! Peers announced on `node.*` are synced from; blocks gossiped on
//! `block.queued` are committed in height order whatever order they arrive in.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ic_03_blockchain_sync::{BlockRepository, InMemoryPeerNetwork, SyncControl};
    use node_runtime::{NodeConfig, NodeRuntime};
    use rand::seq::SliceRandom;
    use shared_bus::{EventPublisher, Subscription};
    use shared_types::{
        topics, Block, BlockQueued, DomainEvent, EventPayload, NodeCreated, NodeId, Peer,
        SyncState,
    };
    use tokio::time::timeout;

    use crate::fixtures::chain;

    const WAIT: Duration = Duration::from_secs(10);

    async fn started(config: NodeConfig, network: Arc<InMemoryPeerNetwork>) -> NodeRuntime {
        let mut runtime = NodeRuntime::with_network(config, network).unwrap();
        runtime.start().await.unwrap();
        runtime
    }

    async fn wait_for_height(runtime: &NodeRuntime, height: u64) {
        let sync = runtime.sync().unwrap();
        timeout(
            WAIT,
            sync.wait_until(|s| s.local_height == height && s.state == SyncState::Idle),
        )
        .await
        .expect("sync did not settle")
        .unwrap();
    }

    fn validated_heights(sub: &mut Subscription) -> Vec<u64> {
        let mut heights = Vec::new();
        while let Ok(Some(event)) = sub.try_recv() {
            if let EventPayload::BlockValidated(v) = event.payload {
                heights.push(v.block.height);
            }
        }
        heights
    }

    fn queued(block: &Block, source: &str) -> DomainEvent {
        DomainEvent::new(BlockQueued {
            block: block.clone(),
            source: NodeId::new(source),
        })
    }

    #[tokio::test]
    async fn test_converges_to_peer_at_height_three() {
        let config = NodeConfig::for_testing();
        let network = Arc::new(InMemoryPeerNetwork::new());
        network.set_chain("p1", chain(&config.genesis.block(), "p1", 3));
        let mut runtime = started(config, network).await;
        let mut validated = runtime.bus().subscribe(topics::BLOCK_VALIDATED).unwrap();

        runtime
            .bus()
            .publish(DomainEvent::new(NodeCreated {
                peer: Peer::new("p1", "10.0.0.1:7000"),
            }))
            .await;
        wait_for_height(&runtime, 3).await;

        assert_eq!(validated_heights(&mut validated), vec![1, 2, 3]);
        assert_eq!(runtime.container().chain.tip().unwrap().height, 3);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_gossip_out_of_order_commits_in_order() {
        let config = NodeConfig::for_testing();
        let mut blocks = chain(&config.genesis.block(), "leader", 12);
        blocks.remove(0);
        blocks.shuffle(&mut rand::thread_rng());

        let mut runtime = started(config, Arc::new(InMemoryPeerNetwork::new())).await;
        let mut validated = runtime.bus().subscribe(topics::BLOCK_VALIDATED).unwrap();

        for block in &blocks {
            runtime.bus().publish(queued(block, "leader")).await;
        }
        wait_for_height(&runtime, 12).await;

        assert_eq!(validated_heights(&mut validated), (1..=12).collect::<Vec<_>>());
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_rejected_block_never_committed() {
        let mut config = NodeConfig::for_testing();
        config.genesis.producers = vec![NodeId::new("leader")];
        let genesis = config.genesis.block();
        let forged = Block::new(
            1,
            genesis.hash,
            NodeId::new("mallory"),
            genesis.timestamp + 1,
            b"forged".to_vec(),
        );
        let honest = chain(&genesis, "leader", 1).remove(1);

        let mut runtime = started(config, Arc::new(InMemoryPeerNetwork::new())).await;
        let mut rejected = runtime.bus().subscribe(topics::BLOCK_REJECTED).unwrap();

        runtime.bus().publish(queued(&forged, "p9")).await;
        runtime.bus().publish(queued(&forged, "p9")).await;
        runtime.bus().publish(queued(&honest, "p1")).await;
        wait_for_height(&runtime, 1).await;

        let tip = runtime.container().chain.tip().unwrap();
        assert_eq!(tip.hash, honest.hash);

        let mut rejections = 0;
        while let Ok(Some(event)) = rejected.try_recv() {
            match event.payload {
                EventPayload::BlockRejected(r) => {
                    assert_eq!(r.hash, forged.hash);
                    assert_eq!(r.source, NodeId::new("p9"));
                    rejections += 1;
                }
                other => panic!("unexpected payload {other:?}"),
            }
        }
        assert_eq!(rejections, 1);
        // Height 1 is final now, so nothing is remembered for it.
        assert_eq!(runtime.sync().unwrap().status().rejected_blocks, 0);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreachable_peer_falls_back_to_other() {
        let config = NodeConfig::for_testing();
        let genesis = config.genesis.block();
        let network = Arc::new(InMemoryPeerNetwork::new());
        network.set_chain("a-down", chain(&genesis, "leader", 9));
        network.set_offline("a-down", true);
        network.set_chain("b-up", chain(&genesis, "leader", 4));
        let mut runtime = started(config, Arc::clone(&network)).await;

        for id in ["a-down", "b-up"] {
            runtime
                .bus()
                .publish(DomainEvent::new(NodeCreated {
                    peer: Peer::new(id, "10.0.0.2:7000"),
                }))
                .await;
        }
        wait_for_height(&runtime, 4).await;

        assert!(network.calls("a-down") >= 2);
        runtime.shutdown().await;
    }
}
