//! # Grid Search Demo
//!
//! Sweeps chunking configurations over a small in-memory corpus and prints
//! the event stream, ending with the recommended configuration.
//!
//! Uses a deterministic bag-of-words `MockEmbeddingProvider` so it runs
//! with **zero API keys**.
//!
//! Run: `cargo run --bin grid_search_demo`

use std::sync::Arc;

use futures::StreamExt;

use embeval_eval::{
    CancelToken, EvalEvent, Evaluator, GridParams, GridSearch, InMemoryDocumentStore,
    InMemoryRunStore, RunStore, TestPhrase,
};
use embeval_rag::{ChunkStrategy, EmbeddingProvider, SourceDocument};

// ---------------------------------------------------------------------------
// MockEmbeddingProvider — deterministic bag-of-words embeddings for demos
// ---------------------------------------------------------------------------

struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> embeval_rag::Result<Vec<f32>> {
        // Each word bumps a hashed dimension, so texts sharing vocabulary
        // land close together under cosine similarity.
        let mut embedding = vec![0.0f32; self.dimensions];
        for word in text.to_lowercase().split_whitespace() {
            let hash =
                word.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            embedding[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        // L2-normalise so cosine similarity is just the dot product.
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -- 1. Build the corpus and ground truth ------------------------------
    let documents = vec![
        SourceDocument {
            id: "doc_rust".to_string(),
            title: "Rust Notes".to_string(),
            text: "Ownership rules govern how memory is freed without a garbage collector. \
                   Borrowing lets functions read data without taking ownership of it. \
                   Lifetimes describe how long references remain valid across scopes. \
                   Pattern matching destructures enums into their component values."
                .to_string(),
        },
        SourceDocument {
            id: "doc_cooking".to_string(),
            title: "Cooking Notes".to_string(),
            text: "Caramelizing onions slowly coaxes out their natural sweetness. \
                   Deglazing the pan captures browned bits into a rich sauce. \
                   Resting roasted meat redistributes juices before carving. \
                   Blanching vegetables locks in color before a quick saute."
                .to_string(),
        },
    ];

    let phrases = vec![
        TestPhrase {
            id: "p1".to_string(),
            phrase: "how does ownership free memory".to_string(),
            expected_content:
                "Ownership rules govern how memory is freed without a garbage collector."
                    .to_string(),
            category: Some("rust".to_string()),
        },
        TestPhrase {
            id: "p2".to_string(),
            phrase: "resting meat juices carving".to_string(),
            expected_content: "Resting roasted meat redistributes juices before carving."
                .to_string(),
            category: Some("cooking".to_string()),
        },
        TestPhrase {
            id: "p3".to_string(),
            phrase: "lifetimes references scopes".to_string(),
            expected_content: "Lifetimes describe how long references remain valid across scopes."
                .to_string(),
            category: Some("rust".to_string()),
        },
    ];

    // -- 2. Assemble the orchestrator --------------------------------------
    let evaluator = Arc::new(
        Evaluator::builder()
            .model_id("mock-model")
            .embedding_provider(Arc::new(MockEmbeddingProvider::new(128)))
            .document_store(Arc::new(InMemoryDocumentStore::new(documents)))
            .phrases(phrases)
            .build()?,
    );
    let run_store = Arc::new(InMemoryRunStore::new());
    let run_store_dyn: Arc<dyn RunStore> = run_store.clone();
    let search = GridSearch::new(evaluator, run_store_dyn);

    // -- 3. Sweep and print the event stream -------------------------------
    let params = GridParams {
        chunk_sizes: vec![30, 60, 120],
        chunk_overlaps: vec![0, 10],
        strategies: vec![ChunkStrategy::Sentence, ChunkStrategy::Recursive],
    };

    let mut events = search.stream(params, CancelToken::new());
    while let Some(event) = events.next().await {
        match &event {
            EvalEvent::Config { current, total, chunk_size, chunk_overlap, strategy } => {
                println!("[{current}/{total}] {chunk_size}t / {chunk_overlap}o / {strategy}");
            }
            EvalEvent::Progress { message, .. } => println!("    {message}"),
            EvalEvent::Result { result } => {
                println!(
                    "    top1={:.2} top5={:.2} mrr={:.3} ndcg={:.3} ({} chunks)",
                    result.metrics.top_k_accuracy_1,
                    result.metrics.top_k_accuracy_5,
                    result.metrics.mrr_score,
                    result.metrics.ndcg_score,
                    result.total_chunks,
                );
            }
            EvalEvent::Complete { data } => {
                if let Some(recommendation) = &data.recommendation {
                    println!(
                        "\nRecommended: {}t / {}o / {} (run {})",
                        recommendation.chunk_size,
                        recommendation.chunk_overlap,
                        recommendation.strategy,
                        recommendation.run_id,
                    );
                }
            }
            EvalEvent::Error { message } => println!("    error: {message}"),
        }
    }

    println!("Stored runs: {}", run_store.len().await);
    Ok(())
}
