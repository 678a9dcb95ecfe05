use super::{compare_scores_desc, ColdSearchResult, SearchError};
use crate::vector::{simd, Tier, VectorEntry};
use rayon::prelude::*;

#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub limit: usize,
    pub ns: Option<String>,
    pub entity_type: Option<String>,
    pub simd_enabled: bool,
    /// Entry count at which the scan switches to rayon; `None` keeps it
    /// sequential.
    pub parallel_min: Option<usize>,
}

impl ScanOptions {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ns: None,
            entity_type: None,
            simd_enabled: true,
            parallel_min: None,
        }
    }
}

/// Brute-force similarity scan over one fetched partition. Filters on
/// ns/type equality, scores the rest, returns at most `limit` hits in
/// descending similarity order with `cluster_id` left for the caller.
pub fn search_within_partition(
    query: &[f32],
    vectors: &[VectorEntry],
    opts: &ScanOptions,
) -> Result<Vec<ColdSearchResult>, SearchError> {
    let passes = |entry: &&VectorEntry| -> bool {
        if let Some(ns) = &opts.ns {
            if entry.metadata.ns != *ns {
                return false;
            }
        }
        if let Some(entity_type) = &opts.entity_type {
            if entry.metadata.entity_type.as_deref() != Some(entity_type.as_str()) {
                return false;
            }
        }
        true
    };
    let score = |entry: &VectorEntry| -> Result<ColdSearchResult, SearchError> {
        if entry.embedding.len() != query.len() {
            return Err(SearchError::DimensionMismatch {
                expected: entry.embedding.len(),
                actual: query.len(),
            });
        }
        Ok(ColdSearchResult {
            id: entry.id.clone(),
            similarity: simd::cosine(query, &entry.embedding, opts.simd_enabled),
            entry: entry.clone(),
            tier: Tier::Cold,
            cluster_id: String::new(),
        })
    };

    let parallel = opts
        .parallel_min
        .is_some_and(|min| vectors.len() >= min.max(2));
    let mut scored: Vec<ColdSearchResult> = if parallel {
        vectors
            .par_iter()
            .filter(passes)
            .map(score)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vectors
            .iter()
            .filter(passes)
            .map(score)
            .collect::<Result<Vec<_>, _>>()?
    };

    scored.sort_by(|a, b| compare_scores_desc(a.similarity, &a.id, b.similarity, &b.id));
    scored.truncate(opts.limit);
    Ok(scored)
}
