//! Similarity retrieval over an in-memory candidate set.
//!
//! [`SimilarityRetriever`] ranks candidate chunks by cosine similarity to a
//! query embedding, optionally truncating both sides to a Matryoshka prefix
//! dimension first, and optionally reordering a shortlist with a
//! [`Reranker`] before cutting to `top_n`.

use std::sync::Arc;

use tracing::debug;

use crate::document::{Chunk, ScoredChunk};
use crate::error::Result;
use crate::reranker::Reranker;

/// Default number of results returned per query.
pub const DEFAULT_TOP_N: usize = 5;

/// Default similarity shortlist size fed to the reranker.
///
/// Large enough to leave the reranker room above `top_n`.
pub const DEFAULT_SHORTLIST: usize = 20;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude. Mismatched lengths are
/// compared over the shorter prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Ranks candidate chunks by cosine similarity to a query embedding.
///
/// Ranking is descending by similarity with ties broken by original
/// candidate order (stable sort), so results are deterministic for fixed
/// inputs.
pub struct SimilarityRetriever {
    top_n: usize,
    shortlist: usize,
    matryoshka_dim: Option<usize>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl Default for SimilarityRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityRetriever {
    /// Create a retriever returning the top [`DEFAULT_TOP_N`] results.
    pub fn new() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            shortlist: DEFAULT_SHORTLIST,
            matryoshka_dim: None,
            reranker: None,
        }
    }

    /// Set the number of results to return.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Set the similarity shortlist size handed to the reranker.
    pub fn with_shortlist(mut self, shortlist: usize) -> Self {
        self.shortlist = shortlist;
        self
    }

    /// Truncate query and candidate embeddings to a Matryoshka prefix
    /// dimension before computing similarity.
    ///
    /// Has no effect when the dimension is at or above the embeddings'
    /// native length.
    pub fn with_matryoshka_dim(mut self, dim: Option<usize>) -> Self {
        self.matryoshka_dim = dim;
        self
    }

    /// Set an optional reranker applied to the similarity shortlist.
    pub fn with_reranker(mut self, reranker: Option<Arc<dyn Reranker>>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Retrieve the top-N candidates for a query.
    ///
    /// `query_text` is only consulted by the reranker; ranking itself uses
    /// `query_embedding`. Returns an empty `Vec` (not an error) when
    /// `candidates` is empty. The `similarity` on each result is always the
    /// cosine similarity from the initial ranking, even after reranking.
    pub async fn retrieve(
        &self,
        query_text: &str,
        query_embedding: &[f32],
        candidates: &[Chunk],
    ) -> Result<Vec<ScoredChunk>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.truncated(query_embedding);

        let mut scored: Vec<ScoredChunk> = candidates
            .iter()
            .map(|chunk| ScoredChunk {
                similarity: cosine_similarity(query, self.truncated(&chunk.embedding)),
                chunk: chunk.clone(),
            })
            .collect();

        // Stable sort keeps candidate order on ties
        scored.sort_by(|a, b| {
            b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal)
        });

        let Some(reranker) = &self.reranker else {
            scored.truncate(self.top_n);
            return Ok(scored);
        };

        // Rerank a similarity shortlist, then cut to top_n. Membership is
        // fixed by the shortlist; the reranker only changes order.
        scored.truncate(self.shortlist.max(self.top_n));
        let texts: Vec<&str> = scored.iter().map(|s| s.chunk.text.as_str()).collect();
        let order = reranker.rerank(query_text, &texts).await?;
        debug!(shortlist = texts.len(), reranked = order.len(), "applied reranker");

        let mut taken = vec![false; scored.len()];
        let mut reordered = Vec::with_capacity(scored.len());
        for index in order {
            if index < scored.len() && !taken[index] {
                taken[index] = true;
                reordered.push(scored[index].clone());
            }
        }
        // Candidates the reranker omitted keep their similarity order
        for (index, result) in scored.into_iter().enumerate() {
            if !taken[index] {
                reordered.push(result);
            }
        }

        reordered.truncate(self.top_n);
        Ok(reordered)
    }

    fn truncated<'a>(&self, embedding: &'a [f32]) -> &'a [f32] {
        match self.matryoshka_dim {
            Some(dim) if dim < embedding.len() => &embedding[..dim],
            _ => embedding,
        }
    }
}
