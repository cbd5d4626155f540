//! # ICode Projection Flows
//!
//! `icode.*` events published on the bus end up in the view store and are
//! readable through the query API.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use ic_02_api_gateway::ICodeQuery;
    use node_runtime::{NodeConfig, NodeRuntime};
    use shared_bus::EventPublisher;
    use shared_types::{
        topics, DomainEvent, ICodeCreated, ICodeDeleted, ICodeStatus, ICodeStatusChanged,
        Version,
    };

    use crate::fixtures::{eventually, icode, icode_created};

    const WAIT: Duration = Duration::from_secs(5);

    async fn started() -> NodeRuntime {
        let mut runtime = NodeRuntime::new(NodeConfig::for_testing()).unwrap();
        runtime.start().await.unwrap();
        runtime
    }

    #[tokio::test]
    async fn test_created_then_deleted_end_to_end() {
        let mut runtime = started().await;
        let query = runtime.query();

        runtime
            .bus()
            .publish(DomainEvent::on_topic(
                "icode.created",
                ICodeCreated {
                    id: "1".into(),
                    repository_name: "a".into(),
                    git_url: "b".into(),
                    path: "c".into(),
                    commit_hash: "d".into(),
                    version: Version::default(),
                },
            ))
            .await;

        assert!(eventually(WAIT, || query.find_all_meta().map_or(false, |all| all.len() == 1)).await);
        let all = query.find_all_meta().unwrap();
        assert_eq!(all[0].id, "1");
        assert_eq!(all[0].commit_hash, "d");
        assert_eq!(query.find_meta_by_url("b").unwrap().id, "1");

        runtime
            .bus()
            .publish(DomainEvent::on_topic(
                "icode.deleted",
                ICodeDeleted { id: "1".into() },
            ))
            .await;

        assert!(eventually(WAIT, || query.find_all_meta().map_or(false, |all| all.is_empty())).await);
        assert!(query.find_meta_by_id("1").unwrap_err().is_not_found());
        assert!(query.find_meta_by_url("b").unwrap_err().is_not_found());

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_redelivered_created_yields_single_record() {
        let mut runtime = started().await;
        let event = icode_created("7", "git@host:seven.git", "abc");

        runtime.bus().publish(event.clone()).await;
        runtime.bus().publish(event).await;
        // Same fact, new envelope.
        runtime
            .bus()
            .publish(icode_created("7", "git@host:seven.git", "abc"))
            .await;
        runtime.shutdown().await;

        let all = runtime.query().find_all_meta().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].commit_hash, "abc");
        assert_eq!(runtime.bus().dead_letter_count(), 0);
    }

    #[tokio::test]
    async fn test_status_change_before_create_lands_on_create() {
        let mut runtime = started().await;
        let query = runtime.query();
        let bus = runtime.bus().clone();

        bus.publish(DomainEvent::new(ICodeStatusChanged {
            id: "late".into(),
            status: ICodeStatus::Deployed,
        }))
        .await;
        bus.publish(icode_created("late", "https://git/late", "f00")).await;

        assert!(
            eventually(WAIT, || query
                .find_meta_by_id("late")
                .map_or(false, |m| m.status == ICodeStatus::Deployed))
            .await
        );
        assert_eq!(bus.dead_letter_count(), 0);

        runtime.shutdown().await;
        assert_eq!(
            query.find_meta_by_id("late").unwrap().status,
            ICodeStatus::Deployed
        );
    }

    #[tokio::test]
    async fn test_burst_beyond_queue_capacity_is_fully_projected() {
        let mut runtime = started().await;
        let query = runtime.query();
        let bus = runtime.bus().clone();

        // Past the queue of the test config, within its dead-letter capacity.
        for i in 0..120 {
            bus.publish(icode_created(
                &format!("burst-{i}"),
                &format!("https://git/burst-{i}"),
                "1",
            ))
            .await;
        }

        assert!(
            eventually(WAIT, || query
                .find_all_meta()
                .map_or(false, |all| all.len() == 120))
            .await
        );
        assert!(eventually(WAIT, || bus.dead_letter_count() == 0).await);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_git_url_rejected_at_write_time() {
        let mut runtime = started().await;
        let bus = runtime.bus().clone();

        bus.publish(icode_created("first", "https://git/shared", "1")).await;
        bus.publish(icode_created("second", "https://git/shared", "2")).await;
        assert!(eventually(WAIT, || bus.dead_letter_count() == 1).await);

        let query = runtime.query();
        assert_eq!(query.find_meta_by_url("https://git/shared").unwrap().id, "first");
        assert!(query.find_meta_by_id("second").unwrap_err().is_not_found());
        assert!(!bus.dead_letters()[0].recoverable);

        runtime.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publishers() {
        let mut runtime = started().await;
        let bus = Arc::new(runtime.bus().clone());

        let publishes = (0..50).map(|i| {
            let bus = Arc::clone(&bus);
            async move {
                let meta = icode(&format!("c{i}"), &format!("https://git/{i}"), "head");
                bus.publish(DomainEvent::on_topic(topics::ICODE_CREATED, meta))
                    .await
            }
        });
        let delivered = join_all(publishes).await;
        assert!(delivered.iter().all(|&n| n == 1));

        runtime.shutdown().await;
        let all = runtime.query().find_all_meta().unwrap();
        assert_eq!(all.len(), 50);
    }
}
