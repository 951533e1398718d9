//! Data types for source documents, chunks, and scored search results.

use serde::{Deserialize, Serialize};

/// A source document containing raw text and a display title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    /// Unique identifier for the document.
    pub id: String,
    /// Human-readable title, carried through to retrieved chunks.
    pub title: String,
    /// The raw text content of the document.
    pub text: String,
}

/// A contiguous span of a [`SourceDocument`]'s text.
///
/// Chunks are created fresh for every chunking configuration under test;
/// the embedding vector is empty until the pipeline attaches one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, generated as `{document_id}_{chunk_index}`.
    pub id: String,
    /// The ID of the parent [`SourceDocument`].
    pub document_id: String,
    /// 0-based position of this chunk within its document.
    pub chunk_index: usize,
    /// The text content of the chunk.
    pub text: String,
    /// Estimated token count of `text` (see [`crate::chunking::estimate_tokens`]).
    pub token_count: usize,
    /// Title of the parent document.
    pub source_title: String,
    /// The vector embedding for this chunk's text. Empty until embedded.
    pub embedding: Vec<f32>,
}

/// A [`Chunk`] paired with its cosine similarity to a query embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query embedding (higher is more relevant).
    ///
    /// This value is always the similarity from the initial vector search,
    /// even when a reranker has reordered the results.
    pub similarity: f32,
}
