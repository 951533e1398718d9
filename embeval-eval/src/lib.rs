//! Retrieval-quality evaluation engine.
//!
//! Given a set of test phrases with known expected content, this crate
//! computes retrieval metrics (Top-K accuracy, MRR, nDCG, average
//! similarity) across chunking configurations and embedding models, and
//! performs a grid search over the configuration space to recommend the
//! best configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use embeval_eval::{Evaluator, GridParams, GridSearch, CancelToken, InMemoryRunStore};
//! use embeval_rag::ChunkStrategy;
//! use futures::StreamExt;
//!
//! let evaluator = Arc::new(
//!     Evaluator::builder()
//!         .model_id("nomic-embed-text")
//!         .embedding_provider(provider)
//!         .document_store(documents)
//!         .phrases(phrases)
//!         .build()?,
//! );
//! let search = GridSearch::new(evaluator, Arc::new(InMemoryRunStore::new()));
//!
//! let params = GridParams {
//!     chunk_sizes: vec![100, 200, 300],
//!     chunk_overlaps: vec![0, 30, 60],
//!     strategies: vec![ChunkStrategy::Sentence],
//! };
//! let mut events = search.stream(params, CancelToken::new());
//! while let Some(event) = events.next().await {
//!     // forward to the UI
//! }
//! ```

pub mod cancel;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod grid;
pub mod inmemory;
pub mod matching;
pub mod metrics;
pub mod store;
pub mod types;

pub use cancel::CancelToken;
pub use error::{EvalError, Result};
pub use evaluator::{EvalOutcome, Evaluator, EvaluatorBuilder, ProgressSink};
pub use events::{CompletePayload, EvalEvent, EvalPhase};
pub use grid::{GridParams, GridSearch, enumerate_configs, pick_recommendation};
pub use inmemory::{InMemoryDocumentStore, InMemoryRunStore};
pub use store::{DocumentStore, RunStore};
pub use types::{
    CategoryBreakdown, EvalRun, ExpectedChunk, GridResult, PhraseDetail, Recommendation,
    RetrievedChunk, RunMetrics, TestPhrase,
};
