//! Ranking-metric calculator.
//!
//! Pure functions over per-phrase retrieval outcomes: expected rank, Top-K
//! accuracy, MRR, nDCG@5, and average top-1 similarity. All metrics treat a
//! missing expected chunk (rank `None`) as a zero contribution.

use std::collections::BTreeMap;

use crate::types::{CategoryBreakdown, PhraseDetail, RetrievedChunk, RunMetrics};

/// 1-based position of the expected chunk in a ranked retrieval result,
/// `None` if it is not present.
pub fn expected_rank(retrieved: &[RetrievedChunk]) -> Option<usize> {
    retrieved.iter().position(|chunk| chunk.is_expected).map(|position| position + 1)
}

/// Aggregate per-phrase outcomes into run-level metrics.
///
/// Every phrase counts toward every denominator: a phrase with zero
/// retrieved results contributes 0 to the similarity sum and a miss to all
/// rank-based metrics. Returns all-zero metrics for an empty input.
///
/// `avg_similarity` averages the similarity of each phrase's *top-ranked*
/// chunk, whether or not that chunk is the expected one — it measures
/// retrieval confidence, not correctness.
pub fn aggregate(details: &[PhraseDetail]) -> RunMetrics {
    if details.is_empty() {
        return RunMetrics::default();
    }

    let mut total_similarity = 0.0;
    let mut hits_1 = 0usize;
    let mut hits_3 = 0usize;
    let mut hits_5 = 0usize;
    let mut total_reciprocal_rank = 0.0;
    let mut total_ndcg = 0.0;

    for detail in details {
        if let Some(rank) = detail.expected_rank {
            if rank <= 1 {
                hits_1 += 1;
            }
            if rank <= 3 {
                hits_3 += 1;
            }
            if rank <= 5 {
                hits_5 += 1;
            }
            total_reciprocal_rank += 1.0 / rank as f64;
            total_ndcg += 1.0 / ((rank + 1) as f64).log2();
        }

        if let Some(top) = detail.retrieved_chunks.first() {
            total_similarity += top.similarity as f64;
        }
    }

    let n = details.len() as f64;
    RunMetrics {
        avg_similarity: total_similarity / n,
        top_k_accuracy_1: hits_1 as f64 / n,
        top_k_accuracy_3: hits_3 as f64 / n,
        top_k_accuracy_5: hits_5 as f64 / n,
        mrr_score: total_reciprocal_rank / n,
        ndcg_score: total_ndcg / n,
    }
}

/// Recompute metrics per category label.
///
/// Phrases without a category are excluded from the breakdown (they still
/// count toward the overall metrics). Returns `None` when no phrase carries
/// a category.
pub fn category_breakdown(details: &[PhraseDetail]) -> Option<BTreeMap<String, CategoryBreakdown>> {
    let mut by_category: BTreeMap<String, Vec<PhraseDetail>> = BTreeMap::new();
    for detail in details {
        if let Some(category) = &detail.category {
            by_category.entry(category.clone()).or_default().push(detail.clone());
        }
    }

    if by_category.is_empty() {
        return None;
    }

    Some(
        by_category
            .into_iter()
            .map(|(category, subset)| {
                let breakdown = CategoryBreakdown {
                    total_phrases: subset.len(),
                    metrics: aggregate(&subset),
                };
                (category, breakdown)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieved(count: usize, expected_at: Option<usize>) -> Vec<RetrievedChunk> {
        (0..count)
            .map(|i| RetrievedChunk {
                chunk_index: i,
                content: format!("chunk {i}"),
                source_title: "Test".to_string(),
                similarity: 0.9 - 0.1 * i as f32,
                is_expected: expected_at == Some(i),
            })
            .collect()
    }

    fn detail(expected_at: Option<usize>, category: Option<&str>) -> PhraseDetail {
        let retrieved_chunks = retrieved(5, expected_at);
        let expected_rank = expected_rank(&retrieved_chunks);
        PhraseDetail {
            phrase: "query".to_string(),
            category: category.map(str::to_string),
            expected_chunk: None,
            retrieved_chunks,
            expected_rank,
            is_hit: expected_rank.is_some(),
        }
    }

    #[test]
    fn rank_is_one_based_and_bounded() {
        for position in 0..5 {
            let chunks = retrieved(5, Some(position));
            let rank = expected_rank(&chunks).unwrap();
            assert_eq!(rank, position + 1);
            assert!((1..=5).contains(&rank));
        }
        assert_eq!(expected_rank(&retrieved(5, None)), None);
        assert_eq!(expected_rank(&[]), None);
    }

    #[test]
    fn is_hit_matches_rank_presence() {
        let hit = detail(Some(2), None);
        assert!(hit.is_hit && hit.expected_rank == Some(3));
        let miss = detail(None, None);
        assert!(!miss.is_hit && miss.expected_rank.is_none());
    }

    #[test]
    fn hit_at_rank_one_contributes_fully() {
        // Expected chunk at position 1 of 5: rank 1, MRR 1.0, nDCG 1.0
        let metrics = aggregate(&[detail(Some(0), None)]);
        assert_eq!(metrics.top_k_accuracy_1, 1.0);
        assert_eq!(metrics.top_k_accuracy_3, 1.0);
        assert_eq!(metrics.top_k_accuracy_5, 1.0);
        assert_eq!(metrics.mrr_score, 1.0);
        assert!((metrics.ndcg_score - 1.0).abs() < 1e-9);
        assert!((metrics.avg_similarity - 0.9).abs() < 1e-6);
    }

    #[test]
    fn miss_contributes_zero_everywhere() {
        // Expected chunk absent from all 5 retrieved
        let metrics = aggregate(&[detail(None, None)]);
        assert_eq!(metrics.top_k_accuracy_1, 0.0);
        assert_eq!(metrics.top_k_accuracy_3, 0.0);
        assert_eq!(metrics.top_k_accuracy_5, 0.0);
        assert_eq!(metrics.mrr_score, 0.0);
        assert_eq!(metrics.ndcg_score, 0.0);
        // Top-1 similarity still contributes — confidence, not correctness
        assert!((metrics.avg_similarity - 0.9).abs() < 1e-6);
    }

    #[test]
    fn mrr_contribution_is_reciprocal_rank() {
        let rank_2 = aggregate(&[detail(Some(1), None)]);
        assert!((rank_2.mrr_score - 0.5).abs() < 1e-9);
        let rank_3 = aggregate(&[detail(Some(2), None)]);
        assert!((rank_3.mrr_score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn ndcg_contribution_is_log_discounted() {
        let rank_2 = aggregate(&[detail(Some(1), None)]);
        assert!((rank_2.ndcg_score - 1.0 / 3.0f64.log2()).abs() < 1e-9);
        assert!((rank_2.ndcg_score - 0.6309).abs() < 1e-4);
    }

    #[test]
    fn top_k_accuracy_is_monotonic() {
        let details =
            vec![detail(Some(0), None), detail(Some(2), None), detail(Some(4), None), detail(None, None)];
        let metrics = aggregate(&details);
        assert!(metrics.top_k_accuracy_1 <= metrics.top_k_accuracy_3);
        assert!(metrics.top_k_accuracy_3 <= metrics.top_k_accuracy_5);
        assert_eq!(metrics.top_k_accuracy_1, 0.25);
        assert_eq!(metrics.top_k_accuracy_3, 0.5);
        assert_eq!(metrics.top_k_accuracy_5, 0.75);
    }

    #[test]
    fn phrase_with_no_results_counts_as_miss() {
        let empty = PhraseDetail {
            phrase: "query".to_string(),
            category: None,
            expected_chunk: None,
            retrieved_chunks: Vec::new(),
            expected_rank: None,
            is_hit: false,
        };
        let metrics = aggregate(&[empty, detail(Some(0), None)]);
        assert_eq!(metrics.top_k_accuracy_5, 0.5);
        // The empty phrase contributes 0 similarity but still counts in n
        assert!((metrics.avg_similarity - 0.45).abs() < 1e-6);
    }

    #[test]
    fn empty_input_yields_zero_metrics() {
        assert_eq!(aggregate(&[]), RunMetrics::default());
    }

    #[test]
    fn breakdown_groups_by_category_and_skips_unlabeled() {
        let details = vec![
            detail(Some(0), Some("grammar")),
            detail(None, Some("grammar")),
            detail(Some(0), Some("vocab")),
            detail(Some(0), None),
        ];
        let breakdown = category_breakdown(&details).unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown["grammar"].total_phrases, 2);
        assert_eq!(breakdown["grammar"].metrics.top_k_accuracy_1, 0.5);
        assert_eq!(breakdown["vocab"].total_phrases, 1);
        assert_eq!(breakdown["vocab"].metrics.top_k_accuracy_1, 1.0);
    }

    #[test]
    fn breakdown_is_absent_without_categories() {
        assert!(category_breakdown(&[detail(Some(0), None)]).is_none());
    }
}
