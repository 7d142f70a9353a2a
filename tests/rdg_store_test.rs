//! Integration tests for the versioned graph store
//!
//! Covers the commit/load life cycle, version chains, commit atomicity,
//! lazy property loading and on-disk stores.

use samyama_rdg::blob::{BlobStore, LocalBlobStore, MemoryBlobStore};
use samyama_rdg::manifest::{file_name_for, MANIFEST_HEAD};
use samyama_rdg::{
    Column, EdgeShuffleTopology, EdgeSortKind, GraphTopology, LoadOptions, PropertyBatch, PropertyValue, Rdg,
    RdgConfig, RdgError, RdgLineage, RdgManifest,
};
use std::sync::Arc;

const URI: &str = "graphs/ring";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Node `i` connects to `(i + 1) % n`
fn ring(n: u32) -> GraphTopology {
    let edges: Vec<(u32, u32)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
    GraphTopology::from_edges(n as usize, &edges)
}

fn ring_rdg(store: Arc<MemoryBlobStore>) -> Rdg {
    let mut rdg = Rdg::create(store, URI, ring(10), RdgConfig::default()).unwrap();
    rdg.add_node_properties(
        PropertyBatch::new()
            .with_column("rank", Column::int64(0..10))
            .unwrap()
            .with_column("name", Column::string((0..10).map(|i| format!("n{}", i))))
            .unwrap(),
    )
    .unwrap();
    rdg.add_edge_properties(
        PropertyBatch::new()
            .with_column("weight", Column::float64((0..10).map(|i| i as f64 * 0.5)))
            .unwrap(),
    )
    .unwrap();
    rdg.mark_all_properties_persistent();
    rdg
}

#[test]
fn test_ring_topology() {
    let topology = ring(10);
    assert_eq!(topology.num_nodes(), 10);
    assert_eq!(topology.num_edges(), 10);
    for node in topology.all_nodes() {
        assert_eq!(topology.degree(node), 1);
    }

    // one edge per node: sorting by destination changes nothing
    let exec = samyama_rdg::Executor::single_threaded();
    let sorted = EdgeShuffleTopology::make(&exec, &topology, false, EdgeSortKind::ByDestId, None);
    assert_eq!(sorted.topology(), &topology);
}

#[test]
fn test_property_row_count_and_remove_restores_schema() {
    let mut rdg = Rdg::create(Arc::new(MemoryBlobStore::new()), URI, ring(10), RdgConfig::default()).unwrap();
    rdg.add_node_properties(PropertyBatch::new().with_column("base", Column::int64(0..10)).unwrap())
        .unwrap();
    let before = rdg.node_properties().names();

    let short = PropertyBatch::new().with_column("score", Column::int64(0..9)).unwrap();
    assert!(matches!(rdg.add_node_properties(short), Err(RdgError::InvalidArgument(_))));
    assert_eq!(rdg.node_properties().names(), before);

    let full = PropertyBatch::new().with_column("score", Column::int64(0..10)).unwrap();
    rdg.add_node_properties(full).unwrap();
    assert_eq!(rdg.node_properties().num_columns(), 2);

    rdg.remove_node_property("score").unwrap();
    assert_eq!(rdg.node_properties().names(), before);
    assert!(matches!(rdg.remove_node_property("score"), Err(RdgError::PropertyNotFound(_))));
}

#[tokio::test]
async fn test_commit_load_round_trip() {
    init_tracing();
    let store = Arc::new(MemoryBlobStore::new());
    let mut rdg = ring_rdg(store.clone());
    rdg.add_node_properties(PropertyBatch::new().with_column("scratch", Column::bool([true; 10])).unwrap())
        .unwrap();

    let v1 = rdg.commit(RdgLineage::with_command("import ring")).await.unwrap();
    assert_eq!(v1, 1);
    assert_eq!(rdg.version(), 1);
    // temporary columns survive in memory
    assert!(rdg.node_properties().contains("scratch"));

    let loaded = Rdg::load(store.clone(), URI, LoadOptions::head(), RdgConfig::default())
        .await
        .unwrap();
    assert_eq!(loaded.version(), 1);
    assert_eq!(loaded.manifest().previous_version, 0);
    assert_eq!(loaded.manifest().lineage.commands, vec!["import ring".to_string()]);
    assert!(loaded.manifest().commit_time.is_some());
    assert_eq!(loaded.topology(), rdg.topology());
    assert_eq!(loaded.node_properties().names(), vec!["rank".to_string(), "name".to_string()]);
    for name in ["rank", "name"] {
        assert_eq!(loaded.get_node_property(name).unwrap(), rdg.get_node_property(name).unwrap());
    }
    assert_eq!(loaded.get_edge_property("weight").unwrap(), rdg.get_edge_property("weight").unwrap());
    assert_eq!(
        loaded.get_node_property("name").unwrap().get(3),
        PropertyValue::String("n3".to_string())
    );
}

#[tokio::test]
async fn test_recommit_reuses_stored_blobs() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut rdg = ring_rdg(store.clone());
    rdg.commit(RdgLineage::new()).await.unwrap();

    let mut loaded = Rdg::load(store.clone(), URI, LoadOptions::head(), RdgConfig::default())
        .await
        .unwrap();
    let blobs_before = store.paths().len();
    let v2 = loaded.commit(RdgLineage::with_command("noop")).await.unwrap();
    assert_eq!(v2, 2);
    // only meta_2 is new; meta is replaced in place
    assert_eq!(store.paths().len(), blobs_before + 1);

    let v1 = RdgManifest::make_version(&*store, URI, 1).await.unwrap();
    let v2 = RdgManifest::make_version(&*store, URI, 2).await.unwrap();
    assert_eq!(v1.header, v2.header);
    assert_eq!(v2.previous_version, 1);
}

#[tokio::test]
async fn test_version_chain_and_explicit_version_load() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut rdg = ring_rdg(store.clone());
    rdg.commit(RdgLineage::new()).await.unwrap();

    rdg.upsert_node_properties(PropertyBatch::new().with_column("rank", Column::int64(100..110)).unwrap())
        .unwrap();
    let v2 = rdg.commit(RdgLineage::with_command("rerank")).await.unwrap();
    assert_eq!(v2, 2);

    assert_eq!(Rdg::list_versions(&*store, URI).await.unwrap(), vec![1, 2]);

    let old = Rdg::load(store.clone(), URI, LoadOptions::at_version(1), RdgConfig::default())
        .await
        .unwrap();
    assert_eq!(old.get_node_property("rank").unwrap().get(0), PropertyValue::Int64(0));

    let head = Rdg::load(store.clone(), URI, LoadOptions::head(), RdgConfig::default())
        .await
        .unwrap();
    assert_eq!(head.version(), 2);
    assert_eq!(head.get_node_property("rank").unwrap().get(0), PropertyValue::Int64(100));

    let missing = Rdg::load(store.clone(), URI, LoadOptions::at_version(7), RdgConfig::default()).await;
    assert!(matches!(missing, Err(RdgError::NotFound(_))));
}

#[tokio::test]
async fn test_commit_from_old_version_never_overwrites() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut rdg = ring_rdg(store.clone());
    for command in ["v1", "v2", "v3"] {
        rdg.commit(RdgLineage::with_command(command)).await.unwrap();
    }
    let meta_2 = store.get(&format!("{}/{}", URI, file_name_for(2))).await.unwrap();

    let mut old = Rdg::load(store.clone(), URI, LoadOptions::at_version(1), RdgConfig::default())
        .await
        .unwrap();
    old.upsert_node_properties(PropertyBatch::new().with_column("rank", Column::int64(50..60)).unwrap())
        .unwrap();
    let version = old.commit(RdgLineage::with_command("branch")).await.unwrap();
    assert_eq!(version, 4);
    assert_eq!(old.version(), 4);

    // existing versions are untouched and the head moves forward
    assert_eq!(
        store.get(&format!("{}/{}", URI, file_name_for(2))).await.unwrap(),
        meta_2
    );
    assert_eq!(Rdg::list_versions(&*store, URI).await.unwrap(), vec![1, 2, 3, 4]);
    let head = RdgManifest::make(&*store, URI).await.unwrap();
    assert_eq!((head.version, head.previous_version), (4, 1));
    assert_eq!(head.lineage, RdgLineage::with_command("branch"));

    let v2 = RdgManifest::make_version(&*store, URI, 2).await.unwrap();
    assert_eq!(v2.lineage, RdgLineage::with_command("v2"));
    let loaded = Rdg::load(store.clone(), URI, LoadOptions::head(), RdgConfig::default())
        .await
        .unwrap();
    assert_eq!(loaded.get_node_property("rank").unwrap().get(0), PropertyValue::Int64(50));
}

#[tokio::test]
async fn test_failed_commit_keeps_previous_head() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut rdg = ring_rdg(store.clone());
    rdg.commit(RdgLineage::new()).await.unwrap();
    let head_before = store.get(&format!("{}/{}", URI, MANIFEST_HEAD)).await.unwrap();

    rdg.add_node_properties(PropertyBatch::new().with_column("extra", Column::uint8([1; 10])).unwrap())
        .unwrap();
    rdg.mark_node_properties_persistent(&["extra"]).unwrap();
    store.fail_puts_matching("node-prop");
    assert!(rdg.commit(RdgLineage::new()).await.is_err());

    // the head is untouched and no meta_2 was published
    let head_after = store.get(&format!("{}/{}", URI, MANIFEST_HEAD)).await.unwrap();
    assert_eq!(head_before, head_after);
    assert_eq!(Rdg::list_versions(&*store, URI).await.unwrap(), vec![1]);
    assert_eq!(rdg.version(), 1);

    // retrying after the fault clears publishes version 2
    store.clear_failures();
    assert_eq!(rdg.commit(RdgLineage::new()).await.unwrap(), 2);
    let loaded = Rdg::load(store.clone(), URI, LoadOptions::head(), RdgConfig::default())
        .await
        .unwrap();
    assert_eq!(loaded.get_node_property("extra").unwrap().get(4), PropertyValue::UInt8(1));
}

#[tokio::test]
async fn test_lazy_property_loading() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut rdg = ring_rdg(store.clone());
    rdg.commit(RdgLineage::new()).await.unwrap();

    let options = LoadOptions::head()
        .with_node_properties(["rank"])
        .with_edge_properties(Vec::<String>::new());
    let mut partial = Rdg::load(store.clone(), URI, options, RdgConfig::default()).await.unwrap();

    assert!(partial.node_properties().is_loaded("rank"));
    assert!(matches!(partial.get_node_property("name"), Err(RdgError::PropertyNotLoaded(_))));
    assert!(matches!(partial.get_edge_property("weight"), Err(RdgError::PropertyNotLoaded(_))));

    partial.load_node_property("name").await.unwrap();
    assert_eq!(partial.get_node_property("name").unwrap().get(9), PropertyValue::String("n9".into()));

    partial.unload_node_property("name").unwrap();
    assert!(!partial.node_properties().is_loaded("name"));

    // unloaded columns are carried into the next version
    let v2 = partial.commit(RdgLineage::new()).await.unwrap();
    let full = Rdg::load(store.clone(), URI, LoadOptions::at_version(v2), RdgConfig::default())
        .await
        .unwrap();
    assert_eq!(full.get_edge_property("weight").unwrap(), rdg.get_edge_property("weight").unwrap());
    assert_eq!(full.node_properties().num_columns(), 2);
}

#[tokio::test]
async fn test_garbage_collection_keeps_live_versions() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut rdg = ring_rdg(store.clone());
    rdg.commit(RdgLineage::new()).await.unwrap();
    for round in 1..3 {
        rdg.upsert_node_properties(
            PropertyBatch::new()
                .with_column("rank", Column::int64((0..10).map(|i| i * round)))
                .unwrap(),
        )
        .unwrap();
        rdg.commit(RdgLineage::new()).await.unwrap();
    }
    assert_eq!(Rdg::list_versions(&*store, URI).await.unwrap(), vec![1, 2, 3]);

    // meta_1, meta_2 and two superseded rank columns
    let deleted = Rdg::collect_garbage(&*store, URI, 1).await.unwrap();
    assert_eq!(deleted, 4);
    assert_eq!(Rdg::list_versions(&*store, URI).await.unwrap(), vec![3]);

    let head = Rdg::load(store.clone(), URI, LoadOptions::head(), RdgConfig::default())
        .await
        .unwrap();
    assert_eq!(head.get_node_property("rank").unwrap().get(3), PropertyValue::Int64(6));
    assert!(store.paths().iter().any(|p| p.ends_with(&file_name_for(3))));
}

#[tokio::test]
async fn test_local_blob_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalBlobStore::new(dir.path()));

    let mut rdg = Rdg::create(store.clone(), URI, ring(10), RdgConfig::default()).unwrap();
    rdg.add_node_properties(
        PropertyBatch::new()
            .with_column("flag", Column::nullable_bool((0..10).map(|i| (i % 3 != 0).then_some(i % 2 == 0))))
            .unwrap(),
    )
    .unwrap();
    rdg.mark_node_properties_persistent(&["flag"]).unwrap();
    rdg.commit(RdgLineage::new()).await.unwrap();

    assert!(dir.path().join(URI).join(MANIFEST_HEAD).exists());
    assert!(dir.path().join(URI).join(file_name_for(1)).exists());

    let loaded = Rdg::load(store, URI, LoadOptions::head(), RdgConfig::default()).await.unwrap();
    let flag = loaded.get_node_property("flag").unwrap();
    assert_eq!(flag.get(0), PropertyValue::Null);
    assert_eq!(flag.get(2), PropertyValue::Bool(true));
    assert_eq!(flag.get(5), PropertyValue::Bool(false));
    assert_eq!(loaded.topology(), &ring(10));
}

#[tokio::test]
async fn test_load_missing_graph() {
    let store = Arc::new(MemoryBlobStore::new());
    let err = Rdg::load(store.clone(), "graphs/none", LoadOptions::head(), RdgConfig::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        Rdg::load(store, "", LoadOptions::head(), RdgConfig::default()).await,
        Err(RdgError::InvalidArgument(_))
    ));
}
