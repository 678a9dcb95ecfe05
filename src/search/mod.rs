pub mod engine;
pub mod merge;
pub mod router;
pub mod scanner;

pub use engine::{ColdVectorSearch, SearchConfig};

use crate::vector::{Tier, VectorEntry};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("query dimensionality {actual} does not match expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("partition store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// One cold-tier hit. `cluster_id` is stamped by the orchestrator; the
/// scanner leaves it empty.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ColdSearchResult {
    pub id: String,
    pub similarity: f32,
    pub entry: VectorEntry,
    pub tier: Tier,
    pub cluster_id: String,
}

/// A hit produced by the (external) hot tier, handed in for reconciliation.
/// The hot tier indexes reduced-dimensionality embeddings, so its entry is
/// optional and its similarity is approximate.
#[derive(Clone, Debug, PartialEq)]
pub struct HotSearchResult {
    pub id: String,
    pub similarity: f32,
    pub entry: Option<VectorEntry>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MergedSearchResult {
    pub id: String,
    pub similarity: f32,
    pub tier: Tier,
    pub cluster_id: Option<String>,
    pub entry: Option<VectorEntry>,
}

#[derive(Clone, Debug, Default)]
pub struct SearchOptions {
    pub vector: Vec<f32>,
    pub limit: Option<usize>,
    pub max_clusters: Option<usize>,
    pub ns: Option<String>,
    pub entity_type: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct SearchMetadata {
    pub clusters_searched: Vec<String>,
    pub total_vectors_scanned: usize,
    pub search_time_ms: u64,
    pub missing_partitions: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub results: Vec<ColdSearchResult>,
    pub metadata: SearchMetadata,
}

pub(crate) fn compare_scores_desc(a: f32, a_id: &str, b: f32, b_id: &str) -> Ordering {
    b.partial_cmp(&a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a_id.cmp(b_id))
}
