use super::{compare_scores_desc, SearchError};
use crate::vector::{simd, ClusterIndex};

#[derive(Clone, Debug)]
pub struct RouteOptions {
    pub max_clusters: usize,
    pub similarity_threshold: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IdentifiedCluster {
    pub cluster_id: String,
    pub partition_key: String,
    pub similarity: f32,
    pub vector_count: usize,
}

/// Scores every centroid against the query, drops clusters under the
/// threshold when one is given, and returns at most `max_clusters` in
/// descending similarity order. An empty index yields an empty result.
pub fn identify_relevant_clusters(
    query: &[f32],
    index: &ClusterIndex,
    opts: &RouteOptions,
    simd_enabled: bool,
) -> Result<Vec<IdentifiedCluster>, SearchError> {
    let mut scored = Vec::with_capacity(index.clusters.len());
    for cluster in &index.clusters {
        if cluster.centroid.len() != query.len() {
            return Err(SearchError::DimensionMismatch {
                expected: cluster.centroid.len(),
                actual: query.len(),
            });
        }
        let similarity = simd::cosine(query, &cluster.centroid, simd_enabled);
        if let Some(threshold) = opts.similarity_threshold {
            if similarity < threshold {
                continue;
            }
        }
        scored.push(IdentifiedCluster {
            cluster_id: cluster.cluster_id.clone(),
            partition_key: cluster.partition_key.clone(),
            similarity,
            vector_count: cluster.vector_count,
        });
    }
    scored.sort_by(|a, b| compare_scores_desc(a.similarity, &a.cluster_id, b.similarity, &b.cluster_id));
    scored.truncate(opts.max_clusters);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::ClusterInfo;

    fn index_with(centroids: Vec<(&str, Vec<f32>)>) -> ClusterIndex {
        ClusterIndex {
            version: 1,
            total_vectors: centroids.len() as u64 * 100,
            built_at_ms: 1,
            clusters: centroids
                .into_iter()
                .map(|(id, centroid)| ClusterInfo {
                    cluster_id: id.to_string(),
                    centroid,
                    vector_count: 100,
                    partition_key: format!("partitions/{id}"),
                })
                .collect(),
        }
    }

    #[test]
    fn empty_index_yields_empty_result() {
        let opts = RouteOptions {
            max_clusters: 4,
            similarity_threshold: None,
        };
        let out =
            identify_relevant_clusters(&[1.0, 0.0], &ClusterIndex::empty(), &opts, true).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn orders_descending_and_caps_at_max_clusters() {
        let index = index_with(vec![
            ("far", vec![0.0, 1.0]),
            ("near", vec![1.0, 0.0]),
            ("mid", vec![1.0, 1.0]),
        ]);
        let opts = RouteOptions {
            max_clusters: 2,
            similarity_threshold: None,
        };
        let out = identify_relevant_clusters(&[1.0, 0.0], &index, &opts, true).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].cluster_id, "near");
        assert_eq!(out[1].cluster_id, "mid");
        assert!(out[0].similarity >= out[1].similarity);
    }

    #[test]
    fn threshold_drops_weak_clusters() {
        let index = index_with(vec![("near", vec![1.0, 0.0]), ("far", vec![0.0, 1.0])]);
        let opts = RouteOptions {
            max_clusters: 8,
            similarity_threshold: Some(0.5),
        };
        let out = identify_relevant_clusters(&[1.0, 0.0], &index, &opts, true).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cluster_id, "near");
        assert!(out.iter().all(|c| c.similarity >= 0.5));
    }

    #[test]
    fn dimension_mismatch_is_a_hard_error() {
        let index = index_with(vec![("a", vec![1.0, 0.0, 0.0])]);
        let opts = RouteOptions {
            max_clusters: 1,
            similarity_threshold: None,
        };
        let err = identify_relevant_clusters(&[1.0, 0.0], &index, &opts, true).unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn zero_query_scores_zero_everywhere() {
        let index = index_with(vec![("a", vec![1.0, 0.0])]);
        let opts = RouteOptions {
            max_clusters: 4,
            similarity_threshold: None,
        };
        let out = identify_relevant_clusters(&[0.0, 0.0], &index, &opts, true).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].similarity, 0.0);
    }
}
