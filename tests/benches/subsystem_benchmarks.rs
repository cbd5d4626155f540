//! # ICode Node Benchmarks
//!
//! | Component | Operation |
//! |-----------|-----------|
//! | shared-bus | Publish fan-out to wildcard subscribers |
//! | ic-01 View Store | Save with secondary index, lookup by secondary key |
//! | ic-03 Block Sync | Validate and commit a gossiped chain |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

use ic_01_view_store::{InMemoryKVStore, ViewRepository, ViewStore};
use ic_02_api_gateway::ICodeMeta;
use ic_03_blockchain_sync::{
    AcceptAllValidator, InMemoryPeerNetwork, KvBlockRepository, SyncConfig, SyncMachine,
};
use ic_tests::fixtures::{chain, icode, icode_created};
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::{Block, BlockQueued, DomainEvent, NodeId};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

fn bench_bus_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-bus");
    let rt = runtime();

    for subscribers in [1usize, 8, 32] {
        let bus = InMemoryEventBus::with_capacity(1 << 16);
        let mut subs: Vec<_> = (0..subscribers)
            .map(|_| bus.subscribe("icode.*").expect("subscribe"))
            .collect();

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("publish_wildcard", subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    rt.block_on(bus.publish(icode_created("bench", "", "head")));
                    for sub in &mut subs {
                        black_box(sub.try_recv().ok());
                    }
                })
            },
        );
    }
    group.finish();
}

fn bench_view_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("ic-01-view-store");
    let repo: ViewRepository<ICodeMeta> = ViewRepository::new(Arc::new(InMemoryKVStore::new()));
    for i in 0..1_000 {
        let meta = ICodeMeta::from(icode(&format!("id-{i}"), &format!("https://git/{i}"), "head"));
        repo.save(&meta).expect("save");
    }

    let mut n = 0u64;
    group.bench_function("save_with_index", |b| {
        b.iter(|| {
            n += 1;
            let meta = ICodeMeta::from(icode("hot", &format!("https://git/hot-{n}"), "head"));
            repo.save(black_box(&meta)).expect("save");
        })
    });
    group.bench_function("find_by_secondary_key", |b| {
        b.iter(|| black_box(repo.find_by_secondary_key("https://git/500").expect("find")))
    });
    group.finish();
}

fn bench_block_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ic-03-blockchain-sync");
    group.measurement_time(Duration::from_secs(10));
    let rt = runtime();
    let genesis = Block::genesis(NodeId::new("genesis"), 0);
    let blocks = chain(&genesis, "leader", 256);

    group.throughput(Throughput::Elements(256));
    group.bench_function("commit_256_in_order", |b| {
        b.iter(|| {
            let repository = Arc::new(
                KvBlockRepository::open(Arc::new(InMemoryKVStore::new()), &genesis)
                    .expect("open"),
            );
            let mut machine = SyncMachine::new(
                SyncConfig::default(),
                repository,
                Arc::new(InMemoryPeerNetwork::new()),
                Arc::new(AcceptAllValidator),
                Arc::new(InMemoryEventBus::new()),
            )
            .expect("machine");
            rt.block_on(async {
                for block in &blocks[1..] {
                    let event = DomainEvent::new(BlockQueued {
                        block: block.clone(),
                        source: NodeId::new("leader"),
                    });
                    machine.on_event(&event).await;
                }
            });
            assert_eq!(machine.local_height(), 256);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_bus_fanout, bench_view_store, bench_block_commit);
criterion_main!(benches);
