//! End-to-end scenarios across the resource manager and content graph.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use pretty_assertions::assert_eq;
use rk_core::resource::FixedTelemetry;
use rk_core::{
    ComputeTarget, ContentGraph, GraphConfig, GraphSnapshot, GraphStore, ManualClock,
    MemoryMonitor, ResourceConfig, ResourceManager, SqliteGraphStore, StaticProbe, TabPriority,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn graph_survives_reopen_from_sqlite() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("knowledge.db");
    let clock = ManualClock::starting_now();

    let (n1, n2, before) = {
        let store = Arc::new(SqliteGraphStore::open(&path).unwrap());
        let graph =
            ContentGraph::open("user-1", store, GraphConfig::default(), Arc::new(clock.clone()))
                .unwrap();
        let n1 = graph
            .add_node("N1", "GPU acceleration improves battery life", "note")
            .unwrap();
        clock.advance(ChronoDuration::minutes(5));
        let n2 = graph
            .add_node("N2", "Battery saver reduces GPU usage", "page")
            .unwrap();
        graph.connect(&n1, &n2).unwrap();
        (n1, n2, graph.snapshot().unwrap())
    };

    let store = Arc::new(SqliteGraphStore::open(&path).unwrap());
    let graph =
        ContentGraph::open("user-1", store, GraphConfig::default(), Arc::new(clock)).unwrap();
    let after = graph.snapshot().unwrap();
    assert_eq!(after, before);

    let restored = graph.get_node(&n1).unwrap().unwrap();
    assert_eq!(restored.connections, vec![n2]);
    assert_eq!(restored.embedding, before.embeddings[&n1.to_string()]);
    assert_eq!(restored.created_at, before.nodes[&n1.to_string()].created_at);
}

#[test]
fn stats_count_each_bidirectional_link_twice() {
    let store = Arc::new(SqliteGraphStore::in_memory().unwrap());
    let graph = ContentGraph::new("user-1", store).unwrap();

    let ids: Vec<_> = (0..6)
        .map(|i| graph.add_node(format!("n{}", i), "body", "note").unwrap())
        .collect();
    let links = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 3)];
    for (a, b) in links {
        graph.connect(&ids[a], &ids[b]).unwrap();
    }

    let stats = graph.get_stats().unwrap();
    assert_eq!(stats.total_connections, 2 * links.len());
    assert_eq!(stats.type_distribution["note"], 6);
}

#[test]
fn unreadable_snapshot_starts_empty() {
    struct BrokenStore;

    impl GraphStore for BrokenStore {
        fn load(&self, _owner_id: &str) -> rk_core::Result<Option<GraphSnapshot>> {
            Err(rk_core::Error::Storage("corrupt".into()))
        }
        fn save(&self, _owner_id: &str, _snapshot: &GraphSnapshot) -> rk_core::Result<()> {
            Ok(())
        }
        fn remove(&self, _owner_id: &str) -> rk_core::Result<bool> {
            Ok(false)
        }
    }

    let graph = ContentGraph::new("user-1", Arc::new(BrokenStore)).unwrap();
    assert!(graph.is_empty().unwrap());
    graph.add_node("A", "still works", "note").unwrap();
    assert_eq!(graph.len().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn monitor_suspends_lru_tabs_until_resumed() {
    init_tracing();
    let clock = ManualClock::starting_now();
    let telemetry = Arc::new(FixedTelemetry::new(8_000, 7_000));
    let manager = Arc::new(
        ResourceManager::with_parts(
            ResourceConfig {
                monitor_interval_ms: 500,
                ..Default::default()
            },
            telemetry.clone(),
            Arc::new(StaticProbe::with_target(ComputeTarget::Npu)),
            Arc::new(clock.clone()),
        )
        .unwrap(),
    );

    for id in ["1", "2", "3", "4", "5"] {
        manager.create_tab_process(id, "https://x.test").unwrap();
        manager.set_tab_memory(id, 1_000).unwrap();
        clock.advance(ChronoDuration::seconds(1));
    }

    let monitor = MemoryMonitor::start(manager.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    // Pressure relieved before the next tick
    telemetry.set(8_000, 1_000);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert!(monitor.ticks() >= 2);

    let stats = manager.get_process_stats();
    assert_eq!(stats.suspended_tabs, 3);
    assert_eq!(stats.active_tabs, 2);
    assert_eq!(stats.compute_target, ComputeTarget::Npu);

    for id in ["1", "2", "3"] {
        let tab = manager.get_tab(id).unwrap();
        assert!(tab.suspended);
        assert_eq!(tab.priority, TabPriority::Low);
        assert_eq!(tab.memory_usage, 100);
    }

    assert!(manager.resume_tab("2"));
    let tab = manager.get_tab("2").unwrap();
    assert_eq!(tab.priority, TabPriority::High);

    monitor.shutdown().await.unwrap();
}
