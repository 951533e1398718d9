//! Property tests for chunking budgets and retrieval ordering.

use embeval_rag::chunking::estimate_tokens;
use embeval_rag::{Chunk, ChunkConfig, ChunkStrategy, SimilarityRetriever, SourceDocument, chunker_for};
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = (String, Vec<f32>)> {
    ("[a-z ]{5,30}", arb_normalized_embedding(dim))
}

fn as_chunks(raw: Vec<(String, Vec<f32>)>) -> Vec<Chunk> {
    raw.into_iter()
        .enumerate()
        .map(|(i, (text, embedding))| Chunk {
            id: format!("doc_1_{i}"),
            document_id: "doc_1".to_string(),
            chunk_index: i,
            token_count: estimate_tokens(&text),
            text,
            source_title: "Prop".to_string(),
            embedding,
        })
        .collect()
}

/// **Property: retrieval ordering and bound.**
/// *For any* candidate set and query embedding, retrieval SHALL return
/// results ordered by descending cosine similarity, and the number of
/// results SHALL be at most `top_n` and at most the candidate count.
mod prop_retrieval_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_n(
            raw in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_n in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let candidates = as_chunks(raw);
            let count = candidates.len();

            let results = rt.block_on(async {
                let retriever = SimilarityRetriever::new().with_top_n(top_n);
                retriever.retrieve("query", &query, &candidates).await.unwrap()
            });

            prop_assert!(results.len() <= top_n);
            prop_assert!(results.len() <= count);

            for window in results.windows(2) {
                prop_assert!(
                    window[0].similarity >= window[1].similarity,
                    "results not in descending order: {} < {}",
                    window[0].similarity,
                    window[1].similarity,
                );
            }
        }
    }
}

/// **Property: chunk token budget.**
/// *For any* input text and valid `(size, overlap, strategy)` configuration,
/// every produced chunk SHALL have an estimated token count of at most
/// `chunk_size`, and chunk indices SHALL be consecutive from 0.
mod prop_chunk_budget {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn every_chunk_fits_the_token_budget(
            text in "[a-zA-ZäöüÄÖÜß .!?\n]{0,2000}",
            size in 10usize..200,
            overlap_fraction in 0usize..100,
            strategy_index in 0usize..3,
        ) {
            let overlap = size * overlap_fraction / 200; // always < size
            let strategy = ChunkStrategy::ALL[strategy_index];
            let config = ChunkConfig { chunk_size: size, chunk_overlap: overlap, strategy };

            let document = SourceDocument {
                id: "doc_1".to_string(),
                title: "Prop".to_string(),
                text,
            };
            let chunks = chunker_for(&config).chunk(&document);

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.chunk_index, i);
                prop_assert!(
                    chunk.token_count <= size,
                    "chunk {} has {} tokens > {}",
                    i,
                    chunk.token_count,
                    size,
                );
            }
        }
    }
}
