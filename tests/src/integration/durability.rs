//! # Durability
//!
//! Views and the committed chain survive a node restart on the file backend.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ic_02_api_gateway::ICodeQuery;
    use ic_03_blockchain_sync::{BlockRepository, SyncControl};
    use node_runtime::container::StorageBackend;
    use node_runtime::{NodeConfig, NodeRuntime};
    use shared_bus::EventPublisher;
    use shared_types::{BlockQueued, DomainEvent, NodeId, SyncState};
    use tokio::time::timeout;

    use crate::fixtures::{chain, icode_created};

    fn file_config(dir: &std::path::Path) -> NodeConfig {
        let mut config = NodeConfig::for_testing();
        config.storage.backend = StorageBackend::File;
        config.storage.data_dir = dir.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_views_and_chain_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(dir.path());
        let blocks = chain(&config.genesis.block(), "leader", 2);

        {
            let mut runtime = NodeRuntime::new(config.clone()).unwrap();
            runtime.start().await.unwrap();

            runtime
                .bus()
                .publish(icode_created("kept", "https://git/kept", "c0ffee"))
                .await;
            for block in &blocks[1..] {
                runtime
                    .bus()
                    .publish(DomainEvent::new(BlockQueued {
                        block: block.clone(),
                        source: NodeId::new("leader"),
                    }))
                    .await;
            }
            timeout(
                Duration::from_secs(5),
                runtime
                    .sync()
                    .unwrap()
                    .wait_until(|s| s.local_height == 2),
            )
            .await
            .expect("blocks not committed")
            .unwrap();

            runtime.shutdown().await;
        }

        let mut runtime = NodeRuntime::new(config).unwrap();
        assert_eq!(runtime.container().chain.tip().unwrap(), blocks[2]);
        assert_eq!(
            runtime.query().find_meta_by_id("kept").unwrap().commit_hash,
            "c0ffee"
        );
        assert_eq!(
            runtime.query().find_meta_by_url("https://git/kept").unwrap().id,
            "kept"
        );

        runtime.start().await.unwrap();
        let status = runtime.sync().unwrap().status();
        assert_eq!(status.local_height, 2);
        assert_eq!(status.state, SyncState::Idle);
        runtime.shutdown().await;
    }

    #[test]
    fn test_foreign_genesis_refused() {
        let dir = tempfile::tempdir().unwrap();
        drop(NodeRuntime::new(file_config(dir.path())).unwrap());

        let mut other = file_config(dir.path());
        other.genesis.timestamp = 1_700_000_000_000;
        assert!(NodeRuntime::new(other).is_err());
    }

    #[test]
    fn test_data_dir_locked_while_open() {
        let dir = tempfile::tempdir().unwrap();
        let _first = NodeRuntime::new(file_config(dir.path())).unwrap();
        assert!(NodeRuntime::new(file_config(dir.path())).is_err());
    }
}
