//! Property tests for metric aggregation.

use embeval_eval::{PhraseDetail, RetrievedChunk, metrics};
use proptest::prelude::*;

/// Build a phrase detail whose expected chunk sits at the given 0-based
/// retrieved position (`None` for a miss).
fn detail(expected_at: Option<usize>, top_similarity: f32) -> PhraseDetail {
    let retrieved_chunks: Vec<RetrievedChunk> = (0..5)
        .map(|i| RetrievedChunk {
            chunk_index: i,
            content: format!("chunk {i}"),
            source_title: "Prop".to_string(),
            similarity: top_similarity - 0.05 * i as f32,
            is_expected: expected_at == Some(i),
        })
        .collect();
    let expected_rank = metrics::expected_rank(&retrieved_chunks);
    PhraseDetail {
        phrase: "query".to_string(),
        category: None,
        expected_chunk: None,
        retrieved_chunks,
        expected_rank,
        is_hit: expected_rank.is_some(),
    }
}

fn arb_detail() -> impl Strategy<Value = PhraseDetail> {
    (proptest::option::of(0usize..5), 0.0f32..1.0f32)
        .prop_map(|(expected_at, similarity)| detail(expected_at, similarity))
}

/// **Property: Top-K monotonicity and metric bounds.**
/// *For any* multiset of per-phrase outcomes, aggregated metrics SHALL
/// satisfy `topK1 <= topK3 <= topK5` and every rank-based metric SHALL lie
/// in `[0, 1]`.
mod prop_metric_bounds {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn top_k_is_monotonic_and_bounded(
            details in proptest::collection::vec(arb_detail(), 1..40),
        ) {
            let m = metrics::aggregate(&details);

            prop_assert!(m.top_k_accuracy_1 <= m.top_k_accuracy_3);
            prop_assert!(m.top_k_accuracy_3 <= m.top_k_accuracy_5);

            for value in [
                m.top_k_accuracy_1,
                m.top_k_accuracy_3,
                m.top_k_accuracy_5,
                m.mrr_score,
                m.ndcg_score,
            ] {
                prop_assert!((0.0..=1.0).contains(&value), "metric out of range: {value}");
            }

            // MRR never exceeds nDCG: 1/r <= 1/log2(r+1) for r >= 1
            prop_assert!(m.mrr_score <= m.ndcg_score + 1e-9);
        }

        #[test]
        fn per_phrase_contributions_match_formulas(
            expected_at in proptest::option::of(0usize..5),
        ) {
            let m = metrics::aggregate(&[detail(expected_at, 0.9)]);
            match expected_at {
                Some(position) => {
                    let rank = (position + 1) as f64;
                    prop_assert!((m.mrr_score - 1.0 / rank).abs() < 1e-9);
                    prop_assert!((m.ndcg_score - 1.0 / (rank + 1.0).log2()).abs() < 1e-9);
                }
                None => {
                    prop_assert_eq!(m.mrr_score, 0.0);
                    prop_assert_eq!(m.ndcg_score, 0.0);
                }
            }
        }
    }
}
