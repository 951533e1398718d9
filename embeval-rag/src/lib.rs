//! Retrieval substrate for the embeval workspace.
//!
//! This crate provides the building blocks the evaluation engine ranks and
//! measures: document chunking strategies, the embedding-provider and
//! reranker seams, and cosine-similarity retrieval with optional Matryoshka
//! dimension truncation.
//!
//! # Example
//!
//! ```rust,ignore
//! use embeval_rag::{ChunkConfig, ChunkStrategy, SimilarityRetriever, chunker_for};
//!
//! let config = ChunkConfig::builder()
//!     .chunk_size(300)
//!     .chunk_overlap(60)
//!     .strategy(ChunkStrategy::Sentence)
//!     .build()?;
//! let chunks = chunker_for(&config).chunk(&document);
//!
//! let retriever = SimilarityRetriever::new().with_matryoshka_dim(Some(256));
//! let results = retriever.retrieve("query", &query_embedding, &chunks).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod reranker;
pub mod retriever;

pub use chunking::{
    Chunker, ParagraphChunker, RecursiveChunker, SentenceChunker, chunker_for, estimate_tokens,
};
pub use config::{ChunkConfig, ChunkConfigBuilder, ChunkStrategy};
pub use document::{Chunk, ScoredChunk, SourceDocument};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use reranker::{NoOpReranker, Reranker};
pub use retriever::{SimilarityRetriever, cosine_similarity};
