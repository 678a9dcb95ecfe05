use super::router::{self, RouteOptions};
use super::scanner::{self, ScanOptions};
use super::{merge, ColdSearchResult, SearchError, SearchMetadata, SearchOptions, SearchOutcome};
use crate::config::Config;
use crate::partition::{codec, PartitionStore};
use crate::vector::ClusterIndex;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub max_clusters: usize,
    pub cluster_similarity_threshold: Option<f32>,
    pub default_limit: usize,
    pub simd_enabled: bool,
    /// Partition size at which the scanner goes parallel; `None` disables.
    pub parallel_scan_min: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_clusters: 8,
            cluster_similarity_threshold: None,
            default_limit: 10,
            simd_enabled: true,
            parallel_scan_min: Some(4096),
        }
    }
}

impl SearchConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_clusters: config.max_clusters.max(1),
            cluster_similarity_threshold: config
                .cluster_similarity_threshold
                .filter(|t| t.is_finite()),
            default_limit: config.default_limit.max(1),
            simd_enabled: config.simd_enabled,
            parallel_scan_min: config
                .parallel_scan
                .then_some(config.parallel_scan_min.max(2)),
        }
    }
}

/// Cold-tier search orchestrator: routes a query to the most promising
/// clusters, fetches and scans their partitions, and merges the per-partition
/// hits into one ranked list. Dependencies are injected at construction;
/// multiple instances coexist.
pub struct ColdVectorSearch {
    store: Arc<dyn PartitionStore>,
    index: RwLock<Arc<ClusterIndex>>,
    config: SearchConfig,
}

impl ColdVectorSearch {
    pub fn new(store: Arc<dyn PartitionStore>, index: ClusterIndex, config: SearchConfig) -> Self {
        Self {
            store,
            index: RwLock::new(Arc::new(index)),
            config,
        }
    }

    /// Swaps in a freshly rebuilt cluster index. In-flight searches keep the
    /// snapshot they already took; there is no torn state.
    pub fn update_cluster_index(&self, index: ClusterIndex) {
        *self.index.write() = Arc::new(index);
    }

    pub fn cluster_index(&self) -> Arc<ClusterIndex> {
        self.index.read().clone()
    }

    pub async fn search(
        &self,
        opts: SearchOptions,
    ) -> Result<Vec<ColdSearchResult>, SearchError> {
        Ok(self.search_with_metadata(opts).await?.results)
    }

    pub async fn search_with_metadata(
        &self,
        opts: SearchOptions,
    ) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();
        let limit = opts.limit.unwrap_or(self.config.default_limit).max(1);
        let max_clusters = opts.max_clusters.unwrap_or(self.config.max_clusters).max(1);
        let index = self.index.read().clone();

        let clusters = router::identify_relevant_clusters(
            &opts.vector,
            &index,
            &RouteOptions {
                max_clusters,
                similarity_threshold: self.config.cluster_similarity_threshold,
            },
            self.config.simd_enabled,
        )?;

        let scan_opts = ScanOptions {
            limit,
            ns: opts.ns.clone(),
            entity_type: opts.entity_type.clone(),
            simd_enabled: self.config.simd_enabled,
            parallel_min: self.config.parallel_scan_min,
        };

        let mut metadata = SearchMetadata::default();
        let mut per_partition = Vec::with_capacity(clusters.len());
        for cluster in &clusters {
            let bytes = match self.store.get(&cluster.partition_key).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    metadata.missing_partitions.push(cluster.partition_key.clone());
                    continue;
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        partition = %cluster.partition_key,
                        "partition fetch failed, degrading search"
                    );
                    metadata.missing_partitions.push(cluster.partition_key.clone());
                    continue;
                }
            };
            let partition = match codec::decode_partition(&bytes) {
                Ok(partition) => partition,
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        partition = %cluster.partition_key,
                        "partition unreadable, degrading search"
                    );
                    metadata.missing_partitions.push(cluster.partition_key.clone());
                    continue;
                }
            };
            metadata.clusters_searched.push(cluster.cluster_id.clone());
            metadata.total_vectors_scanned += partition.vectors.len();
            let mut hits =
                scanner::search_within_partition(&opts.vector, &partition.vectors, &scan_opts)?;
            for hit in &mut hits {
                hit.cluster_id = cluster.cluster_id.clone();
            }
            per_partition.push(hits);
        }

        let results = merge::merge_search_results(per_partition, limit);
        metadata.search_time_ms = started.elapsed().as_millis() as u64;
        Ok(SearchOutcome { results, metadata })
    }
}
