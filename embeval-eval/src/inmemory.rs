//! In-memory document and run stores.
//!
//! Backed by `tokio::sync::RwLock` so they can be shared across request
//! handlers. Suitable for development, testing, and single-process
//! deployments.

use async_trait::async_trait;
use embeval_rag::SourceDocument;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::store::{DocumentStore, RunStore};
use crate::types::EvalRun;

/// An in-memory [`DocumentStore`] over a fixed corpus.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<Vec<SourceDocument>>,
}

impl InMemoryDocumentStore {
    /// Create a store seeded with the given documents.
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self { documents: RwLock::new(documents) }
    }

    /// Add a document to the corpus.
    pub async fn add(&self, document: SourceDocument) {
        self.documents.write().await.push(document);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn documents(&self) -> Result<Vec<SourceDocument>> {
        Ok(self.documents.read().await.clone())
    }
}

/// An in-memory, append-only [`RunStore`].
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: RwLock<Vec<EvalRun>>,
}

impl InMemoryRunStore {
    /// Create a new empty run store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored runs.
    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Whether the store holds no runs.
    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn create(&self, run: EvalRun) -> Result<String> {
        let id = run.id.clone();
        self.runs.write().await.push(run);
        Ok(id)
    }

    async fn list_by_model(&self, model_id: &str) -> Result<Vec<EvalRun>> {
        let runs = self.runs.read().await;
        let mut matching: Vec<EvalRun> =
            runs.iter().filter(|run| run.model_id == model_id).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}
