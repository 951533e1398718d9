//! Error types for the `embeval-eval` crate.

use embeval_rag::RagError;
use thiserror::Error;

/// Errors that can occur while evaluating retrieval configurations.
#[derive(Debug, Error)]
pub enum EvalError {
    /// No test phrase could be mapped to an expected chunk for this
    /// configuration.
    #[error("no test phrases with a mappable expected chunk")]
    NoPhrases,

    /// The evaluation was cancelled by the caller.
    #[error("evaluation cancelled")]
    Cancelled,

    /// An error occurred in the document store backend.
    #[error("document store error: {0}")]
    DocumentStore(String),

    /// An error occurred in the run store backend.
    #[error("run store error: {0}")]
    RunStore(String),

    /// An error propagated from the retrieval substrate (embedding
    /// provider, reranker, configuration).
    #[error(transparent)]
    Rag(#[from] RagError),
}

/// A convenience result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
