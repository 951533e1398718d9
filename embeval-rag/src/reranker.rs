//! Reranker trait for reordering a similarity-ranked shortlist.

use async_trait::async_trait;

use crate::error::Result;

/// A reranker that reorders candidate documents for a query.
///
/// Implementations can use cross-encoder models, LLM-based scoring, or
/// other strategies to improve precision beyond initial vector similarity.
/// Reranking changes order only: the returned indices refer to positions in
/// the given `documents` slice, best first.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank candidate documents given the original query.
    ///
    /// Returns indices into `documents` in the new order, best first.
    /// Indices that are out of range or duplicated are ignored by callers;
    /// candidates the reranker omits keep their original relative order
    /// behind the reranked ones.
    async fn rerank(&self, query: &str, documents: &[&str]) -> Result<Vec<usize>>;
}

/// A no-op reranker that keeps the original order.
///
/// Useful as a default when no reranking is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(&self, _query: &str, documents: &[&str]) -> Result<Vec<usize>> {
        Ok((0..documents.len()).collect())
    }
}
