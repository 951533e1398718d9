//! Storage traits for source documents and evaluation runs.

use async_trait::async_trait;
use embeval_rag::SourceDocument;

use crate::error::Result;
use crate::types::EvalRun;

/// Read access to the source-document corpus.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return all source documents, in a stable order.
    async fn documents(&self) -> Result<Vec<SourceDocument>>;
}

/// Append-only storage for [`EvalRun`]s.
///
/// Runs are never mutated after creation — this subsystem only creates runs
/// and lists them for historical comparison.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persist a run, returning its identifier.
    async fn create(&self, run: EvalRun) -> Result<String>;

    /// List runs for a model, newest first.
    async fn list_by_model(&self, model_id: &str) -> Result<Vec<EvalRun>>;
}
