use super::{compare_scores_desc, ColdSearchResult, HotSearchResult, MergedSearchResult};
use crate::vector::Tier;
use std::collections::HashMap;

/// Flattens per-partition result lists into one global top-`limit` list.
/// Dedupe keeps the first occurrence of an id, which after the descending
/// sort is the highest-similarity one.
pub fn merge_search_results(
    partition_results: Vec<Vec<ColdSearchResult>>,
    limit: usize,
) -> Vec<ColdSearchResult> {
    let mut all: Vec<ColdSearchResult> = partition_results.into_iter().flatten().collect();
    all.sort_by(|a, b| compare_scores_desc(a.similarity, &a.id, b.similarity, &b.id));
    let mut seen = std::collections::HashSet::with_capacity(all.len());
    all.retain(|hit| seen.insert(hit.id.clone()));
    all.truncate(limit);
    all
}

#[derive(Clone, Debug)]
pub struct CombineOptions {
    pub limit: usize,
    /// Cold storage holds the full-precision embedding; when set, a cold
    /// score wins over the hot tier's approximate score for the same id.
    pub prefer_cold_similarity: bool,
}

/// Combines a caller-supplied hot-tier result list with the cold-tier list.
/// No id appears twice in the output; the precision-preference flag alone
/// decides which tier's score wins on overlap; ids present in only one tier
/// are never dropped.
pub fn combine_tiered_results(
    hot_results: Vec<HotSearchResult>,
    cold_results: Vec<ColdSearchResult>,
    opts: &CombineOptions,
) -> Vec<MergedSearchResult> {
    let mut cold_by_id: HashMap<String, ColdSearchResult> =
        HashMap::with_capacity(cold_results.len());
    for hit in cold_results {
        match cold_by_id.get(&hit.id) {
            Some(existing) if existing.similarity >= hit.similarity => {}
            _ => {
                cold_by_id.insert(hit.id.clone(), hit);
            }
        }
    }

    let mut combined = Vec::with_capacity(hot_results.len() + cold_by_id.len());
    for hot_hit in hot_results {
        // overlapping ids consume the cold hit either way; the flag only
        // picks whose score survives
        match cold_by_id.remove(&hot_hit.id) {
            Some(cold_hit) if opts.prefer_cold_similarity => {
                combined.push(MergedSearchResult {
                    id: cold_hit.id,
                    similarity: cold_hit.similarity,
                    tier: cold_hit.tier,
                    cluster_id: Some(cold_hit.cluster_id),
                    entry: Some(cold_hit.entry),
                });
            }
            _ => {
                combined.push(MergedSearchResult {
                    id: hot_hit.id,
                    similarity: hot_hit.similarity,
                    tier: Tier::Hot,
                    cluster_id: None,
                    entry: hot_hit.entry,
                });
            }
        }
    }
    for (_, cold_hit) in cold_by_id {
        combined.push(MergedSearchResult {
            id: cold_hit.id,
            similarity: cold_hit.similarity,
            tier: cold_hit.tier,
            cluster_id: Some(cold_hit.cluster_id),
            entry: Some(cold_hit.entry),
        });
    }

    combined.sort_by(|a, b| compare_scores_desc(a.similarity, &a.id, b.similarity, &b.id));
    combined.truncate(opts.limit);
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{SourceTable, VectorEntry, VectorMetadata};
    use std::collections::HashSet;

    fn cold(id: &str, similarity: f32, cluster_id: &str) -> ColdSearchResult {
        ColdSearchResult {
            id: id.to_string(),
            similarity,
            entry: VectorEntry {
                id: id.to_string(),
                embedding: vec![1.0, 0.0],
                source_table: SourceTable::Things,
                source_rowid: 1,
                metadata: VectorMetadata {
                    ns: "default".to_string(),
                    entity_type: None,
                    text_content: None,
                },
            },
            tier: Tier::Cold,
            cluster_id: cluster_id.to_string(),
        }
    }

    fn hot(id: &str, similarity: f32) -> HotSearchResult {
        HotSearchResult {
            id: id.to_string(),
            similarity,
            entry: None,
        }
    }

    #[test]
    fn merge_dedupes_by_id_keeping_highest() {
        let lists = vec![
            vec![cold("a", 0.9, "c1"), cold("b", 0.5, "c1")],
            vec![cold("a", 0.7, "c2"), cold("c", 0.6, "c2")],
        ];
        let out = merge_search_results(lists, 10);
        let ids: Vec<&str> = out.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert_eq!(out[0].similarity, 0.9);
        assert_eq!(out[0].cluster_id, "c1");
    }

    #[test]
    fn merge_respects_limit() {
        let lists = vec![vec![
            cold("a", 0.9, "c1"),
            cold("b", 0.8, "c1"),
            cold("c", 0.7, "c1"),
        ]];
        let out = merge_search_results(lists, 2);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn merge_of_empty_lists_is_empty() {
        assert!(merge_search_results(vec![vec![], vec![]], 5).is_empty());
    }

    #[test]
    fn prefer_cold_takes_cold_score_exactly_once() {
        let out = combine_tiered_results(
            vec![hot("a", 0.95), hot("b", 0.6)],
            vec![cold("a", 0.82, "c1"), cold("c", 0.4, "c2")],
            &CombineOptions {
                limit: 10,
                prefer_cold_similarity: true,
            },
        );
        let ids: HashSet<&str> = out.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids.len(), out.len(), "no id may appear twice");
        let a = out.iter().find(|hit| hit.id == "a").unwrap();
        assert_eq!(a.similarity, 0.82);
        assert_eq!(a.tier, Tier::Cold);
        assert_eq!(a.cluster_id.as_deref(), Some("c1"));
        assert!(a.entry.is_some());
    }

    #[test]
    fn hot_wins_by_default_and_cold_is_not_double_counted() {
        let out = combine_tiered_results(
            vec![hot("a", 0.95)],
            vec![cold("a", 0.82, "c1")],
            &CombineOptions {
                limit: 10,
                prefer_cold_similarity: false,
            },
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].similarity, 0.95);
        assert_eq!(out[0].tier, Tier::Hot);
    }

    #[test]
    fn single_tier_ids_are_never_dropped() {
        let out = combine_tiered_results(
            vec![hot("hot-only", 0.3)],
            vec![cold("cold-only", 0.9, "c1")],
            &CombineOptions {
                limit: 10,
                prefer_cold_similarity: true,
            },
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "cold-only");
        assert_eq!(out[1].id, "hot-only");
    }

    #[test]
    fn combine_respects_limit_after_sorting() {
        let out = combine_tiered_results(
            vec![hot("a", 0.1), hot("b", 0.9)],
            vec![cold("c", 0.5, "c1")],
            &CombineOptions {
                limit: 2,
                prefer_cold_similarity: false,
            },
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "b");
        assert_eq!(out[1].id, "c");
    }
}
