//! Data types for test phrases, per-phrase outcomes, and evaluation runs.
//!
//! Wire-visible types serialize with camelCase field names to match the
//! streaming protocol consumed by UI clients.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use embeval_rag::{ChunkConfig, ChunkStrategy};
use serde::{Deserialize, Serialize};

/// A natural-language query with known-correct ground truth.
///
/// The ground truth is carried as `expected_content`, a snippet of source
/// text; before each evaluation it is mapped onto the chunk that best
/// contains it for the configuration under test (chunk boundaries move when
/// the chunking configuration changes). Immutable from the evaluator's
/// perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestPhrase {
    /// Unique identifier for the phrase.
    pub id: String,
    /// The query text.
    pub phrase: String,
    /// The source-text snippet the retriever is expected to find.
    pub expected_content: String,
    /// Optional category label for per-category metric breakdowns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// The expected chunk for a phrase, resolved against one chunking
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedChunk {
    /// 0-based index of the chunk within its document.
    pub chunk_index: usize,
    /// The chunk text.
    pub content: String,
    /// Title of the chunk's source document.
    pub source_title: String,
}

/// A retrieved chunk annotated with its similarity and whether it is the
/// phrase's expected chunk. Transient — produced per phrase per
/// configuration, never persisted standalone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedChunk {
    /// 0-based index of the chunk within its document.
    pub chunk_index: usize,
    /// The chunk text.
    pub content: String,
    /// Title of the chunk's source document.
    pub source_title: String,
    /// Cosine similarity to the query embedding.
    pub similarity: f32,
    /// Whether this chunk is the phrase's expected chunk.
    pub is_expected: bool,
}

/// Per-phrase evaluation outcome: the ranked top-5 retrieved chunks and
/// where (if anywhere) the expected chunk landed.
///
/// Invariant: `is_hit == expected_rank.is_some()` at the fixed cutoff of 5.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhraseDetail {
    /// The query text.
    pub phrase: String,
    /// Category label, if the phrase carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The expected chunk under this configuration, if it resolved.
    pub expected_chunk: Option<ExpectedChunk>,
    /// The ranked retrieved chunks, best similarity first, length ≤ 5.
    pub retrieved_chunks: Vec<RetrievedChunk>,
    /// 1-based rank of the expected chunk among the retrieved results,
    /// `None` if absent from the top-5 window.
    pub expected_rank: Option<usize>,
    /// Whether the expected chunk appeared in the top-5.
    pub is_hit: bool,
}

/// Aggregated retrieval-quality metrics for one evaluated configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// Mean similarity of the **top-ranked** retrieved chunk per phrase —
    /// a measure of retrieval confidence, deliberately decoupled from
    /// correctness. A wrong top-1 result still contributes its (high)
    /// similarity; do not read this as an accuracy signal.
    pub avg_similarity: f64,
    /// Fraction of phrases whose expected chunk ranked first.
    pub top_k_accuracy_1: f64,
    /// Fraction of phrases whose expected chunk ranked in the top 3.
    pub top_k_accuracy_3: f64,
    /// Fraction of phrases whose expected chunk ranked in the top 5.
    pub top_k_accuracy_5: f64,
    /// Mean reciprocal rank: mean of `1/rank`, misses contribute 0.
    pub mrr_score: f64,
    /// Mean of `1/log2(rank + 1)`, misses contribute 0.
    pub ndcg_score: f64,
}

/// Metrics recomputed over the subset of phrases sharing a category label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    /// Number of phrases in this category.
    pub total_phrases: usize,
    /// The category-scoped metrics.
    #[serde(flatten)]
    pub metrics: RunMetrics,
}

/// The persisted aggregate result of evaluating one configuration against
/// the full test-phrase set. Immutable after creation; the run store is
/// append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvalRun {
    /// Unique run identifier.
    pub id: String,
    /// The embedding model evaluated.
    pub model_id: String,
    /// The reranker applied, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reranker_id: Option<String>,
    /// Matryoshka truncation dimension, if one was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matryoshka_dim: Option<usize>,
    /// The chunking configuration evaluated.
    pub chunk_size: usize,
    /// Overlap of the chunking configuration evaluated.
    pub chunk_overlap: usize,
    /// Strategy of the chunking configuration evaluated.
    pub strategy: ChunkStrategy,
    /// Aggregated metrics over all evaluated phrases.
    #[serde(flatten)]
    pub metrics: RunMetrics,
    /// Number of chunks produced by this configuration.
    pub total_chunks: usize,
    /// Number of phrases evaluated.
    pub total_phrases: usize,
    /// Per-category metrics, present when at least one phrase carries a
    /// category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_breakdown: Option<BTreeMap<String, CategoryBreakdown>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl EvalRun {
    /// The chunking configuration this run evaluated.
    pub fn config(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            strategy: self.strategy,
        }
    }
}

/// One finished configuration within a sweep, as carried by `result` and
/// `complete` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridResult {
    /// The evaluated configuration.
    pub config: ChunkConfig,
    /// Aggregated metrics.
    pub metrics: RunMetrics,
    /// Identifier of the associated [`EvalRun`].
    pub run_id: String,
    /// Number of chunks produced by this configuration.
    pub total_chunks: usize,
    /// Number of phrases evaluated.
    pub total_phrases: usize,
    /// Per-phrase outcomes.
    pub details: Vec<PhraseDetail>,
}

/// The configuration selected as best by the sweep's tie-break rule.
///
/// Derived from completed results, never stored independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Recommended chunk size in tokens.
    pub chunk_size: usize,
    /// Recommended overlap in tokens.
    pub chunk_overlap: usize,
    /// Recommended strategy.
    pub strategy: ChunkStrategy,
    /// Metrics of the winning configuration.
    pub metrics: RunMetrics,
    /// Identifier of the winning configuration's persisted [`EvalRun`].
    pub run_id: String,
}
