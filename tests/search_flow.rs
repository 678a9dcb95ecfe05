use std::sync::Arc;
use tiervec::partition::{FsPartitionStore, MemoryPartitionStore};
use tiervec::search::merge::{combine_tiered_results, CombineOptions};
use tiervec::search::{
    ColdVectorSearch, HotSearchResult, SearchConfig, SearchError, SearchOptions,
};
use tiervec::vector::{
    ClusterIndex, ClusterInfo, PartitionMetadata, SourceTable, Tier, VectorEntry, VectorMetadata,
};

fn entry(id: &str, embedding: Vec<f32>, ns: &str, entity_type: Option<&str>) -> VectorEntry {
    VectorEntry {
        id: id.to_string(),
        embedding,
        source_table: SourceTable::Things,
        source_rowid: 1,
        metadata: VectorMetadata {
            ns: ns.to_string(),
            entity_type: entity_type.map(str::to_string),
            text_content: Some(format!("text for {id}")),
        },
    }
}

fn partition_metadata(cluster_id: &str, count: usize, dim: usize) -> PartitionMetadata {
    PartitionMetadata {
        cluster_id: cluster_id.to_string(),
        vector_count: count,
        dimensionality: dim,
        compression_type: "none".to_string(),
        size_bytes: 0,
        created_at_ms: 1,
    }
}

fn two_cluster_index() -> ClusterIndex {
    ClusterIndex {
        version: 1,
        total_vectors: 4,
        built_at_ms: 1,
        clusters: vec![
            ClusterInfo {
                cluster_id: "c1".to_string(),
                centroid: vec![1.0, 0.0],
                vector_count: 2,
                partition_key: "partitions/c1".to_string(),
            },
            ClusterInfo {
                cluster_id: "c2".to_string(),
                centroid: vec![0.0, 1.0],
                vector_count: 2,
                partition_key: "partitions/c2".to_string(),
            },
        ],
    }
}

fn seeded_store() -> MemoryPartitionStore {
    let store = MemoryPartitionStore::new();
    store
        .put_partition(
            "partitions/c1",
            &partition_metadata("c1", 2, 2),
            &[
                entry("x-near", vec![1.0, 0.05], "default", Some("character")),
                entry("x-far", vec![0.7, 0.7], "default", Some("scene")),
            ],
        )
        .unwrap();
    store
        .put_partition(
            "partitions/c2",
            &partition_metadata("c2", 2, 2),
            &[
                entry("y-near", vec![0.05, 1.0], "default", None),
                entry("y-far", vec![0.6, 0.8], "other-ns", None),
            ],
        )
        .unwrap();
    store
}

fn engine_with(store: MemoryPartitionStore) -> ColdVectorSearch {
    ColdVectorSearch::new(Arc::new(store), two_cluster_index(), SearchConfig::default())
}

#[tokio::test]
async fn search_routes_scans_and_stamps_cluster_ids() {
    let engine = engine_with(seeded_store());
    let outcome = engine
        .search_with_metadata(SearchOptions {
            vector: vec![1.0, 0.0],
            limit: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(!outcome.results.is_empty());
    assert_eq!(outcome.results[0].id, "x-near");
    assert_eq!(outcome.results[0].cluster_id, "c1");
    assert_eq!(outcome.results[0].tier, Tier::Cold);
    for pair in outcome.results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    assert_eq!(
        outcome.metadata.clusters_searched,
        vec!["c1".to_string(), "c2".to_string()]
    );
    assert_eq!(outcome.metadata.total_vectors_scanned, 4);
    assert!(outcome.metadata.missing_partitions.is_empty());
}

#[tokio::test]
async fn missing_partition_degrades_instead_of_failing() {
    let store = MemoryPartitionStore::new();
    store
        .put_partition(
            "partitions/c1",
            &partition_metadata("c1", 1, 2),
            &[entry("x-near", vec![1.0, 0.05], "default", None)],
        )
        .unwrap();
    // c2 is referenced by the index but never stored
    let engine = engine_with(store);
    let outcome = engine
        .search_with_metadata(SearchOptions {
            vector: vec![0.7, 0.7],
            limit: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(!outcome.results.is_empty());
    assert_eq!(
        outcome.metadata.missing_partitions,
        vec!["partitions/c2".to_string()]
    );
    assert_eq!(outcome.metadata.clusters_searched, vec!["c1".to_string()]);
}

#[tokio::test]
async fn unreadable_partition_is_treated_as_missing() {
    let store = seeded_store();
    store.put_raw("partitions/c2", b"not a partition frame".to_vec());
    let engine = engine_with(store);
    let outcome = engine
        .search_with_metadata(SearchOptions {
            vector: vec![0.7, 0.7],
            limit: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(
        outcome.metadata.missing_partitions,
        vec!["partitions/c2".to_string()]
    );
    assert!(outcome
        .results
        .iter()
        .all(|hit| hit.cluster_id == "c1"));
}

#[tokio::test]
async fn ns_filter_applies_across_partitions() {
    let engine = engine_with(seeded_store());
    let results = engine
        .search(SearchOptions {
            vector: vec![0.5, 0.9],
            limit: Some(10),
            ns: Some("other-ns".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "y-far");
}

#[tokio::test]
async fn type_filter_applies_within_partition() {
    let engine = engine_with(seeded_store());
    let results = engine
        .search(SearchOptions {
            vector: vec![1.0, 0.0],
            limit: Some(10),
            entity_type: Some("scene".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "x-far");
}

#[tokio::test]
async fn limit_falls_back_to_config_default() {
    let store = MemoryPartitionStore::new();
    let vectors: Vec<VectorEntry> = (0..8)
        .map(|i| entry(&format!("v{i}"), vec![1.0, i as f32 * 0.01], "default", None))
        .collect();
    store
        .put_partition("partitions/c1", &partition_metadata("c1", 8, 2), &vectors)
        .unwrap();
    let index = ClusterIndex {
        version: 1,
        total_vectors: 8,
        built_at_ms: 1,
        clusters: vec![ClusterInfo {
            cluster_id: "c1".to_string(),
            centroid: vec![1.0, 0.0],
            vector_count: 8,
            partition_key: "partitions/c1".to_string(),
        }],
    };
    let config = SearchConfig {
        default_limit: 3,
        ..Default::default()
    };
    let engine = ColdVectorSearch::new(Arc::new(store), index, config);
    let results = engine
        .search(SearchOptions {
            vector: vec![1.0, 0.0],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn cluster_index_swap_is_picked_up() {
    let store = seeded_store();
    let engine = ColdVectorSearch::new(
        Arc::new(store),
        ClusterIndex::empty(),
        SearchConfig::default(),
    );
    let before = engine
        .search_with_metadata(SearchOptions {
            vector: vec![1.0, 0.0],
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(before.results.is_empty());
    assert!(before.metadata.clusters_searched.is_empty());

    engine.update_cluster_index(two_cluster_index());
    let after = engine
        .search_with_metadata(SearchOptions {
            vector: vec![1.0, 0.0],
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!after.results.is_empty());
    assert_eq!(engine.cluster_index().version, 1);
}

#[tokio::test]
async fn query_dimension_mismatch_is_a_hard_error() {
    let engine = engine_with(seeded_store());
    let err = engine
        .search(SearchOptions {
            vector: vec![1.0, 0.0, 0.0],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn cold_results_combine_with_hot_tier_input() {
    let engine = engine_with(seeded_store());
    let cold = engine
        .search(SearchOptions {
            vector: vec![1.0, 0.0],
            limit: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    let hot = vec![
        HotSearchResult {
            id: "x-near".to_string(),
            similarity: 0.99,
            entry: None,
        },
        HotSearchResult {
            id: "hot-only".to_string(),
            similarity: 0.4,
            entry: None,
        },
    ];
    let combined = combine_tiered_results(
        hot,
        cold.clone(),
        &CombineOptions {
            limit: 10,
            prefer_cold_similarity: true,
        },
    );
    let overlap = combined.iter().find(|hit| hit.id == "x-near").unwrap();
    let cold_score = cold
        .iter()
        .find(|hit| hit.id == "x-near")
        .unwrap()
        .similarity;
    assert_eq!(overlap.similarity, cold_score);
    assert_eq!(overlap.tier, Tier::Cold);
    assert!(combined.iter().any(|hit| hit.id == "hot-only"));
    let mut ids: Vec<&str> = combined.iter().map(|hit| hit.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), combined.len());
}

#[tokio::test]
async fn fs_store_serves_the_same_search_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsPartitionStore::open(dir.path()).unwrap();
    store
        .put_partition(
            "partitions/c1",
            &partition_metadata("c1", 1, 2),
            &[entry("x-near", vec![1.0, 0.05], "default", None)],
        )
        .unwrap();
    store.store_cluster_index(&two_cluster_index()).unwrap();

    let loaded = store.load_cluster_index().unwrap().unwrap();
    let engine = ColdVectorSearch::new(Arc::new(store), loaded, SearchConfig::default());
    let outcome = engine
        .search_with_metadata(SearchOptions {
            vector: vec![1.0, 0.0],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].id, "x-near");
    // c2 exists in the index but not on disk
    assert_eq!(
        outcome.metadata.missing_partitions,
        vec!["partitions/c2".to_string()]
    );
}
