//! Server configuration and shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use embeval_eval::{
    DocumentStore, InMemoryDocumentStore, InMemoryRunStore, RunStore, TestPhrase,
};
use embeval_rag::SourceDocument;

/// An embedding model known to the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Identifier used in query parameters and recorded on runs.
    pub id: String,
    /// Model name as known to the serving endpoint.
    pub name: String,
    /// OpenAI-compatible base URL, e.g. `http://localhost:1234/v1`.
    pub provider_url: String,
    /// Native embedding dimensionality.
    pub dimensions: usize,
    /// Optional bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// A reranker model known to the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankerConfig {
    /// Identifier used in query parameters and recorded on runs.
    pub id: String,
    /// Chat model name used for relevance scoring.
    pub name: String,
    /// OpenAI-compatible base URL.
    pub provider_url: String,
    /// Optional bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// On-disk server configuration (JSON).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Embedding models available for evaluation.
    pub models: Vec<ModelConfig>,
    /// Reranker models available for evaluation.
    #[serde(default)]
    pub rerankers: Vec<RerankerConfig>,
    /// The source-document corpus.
    pub documents: Vec<SourceDocument>,
    /// The test-phrase ground truth.
    pub phrases: Vec<TestPhrase>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// Shared application state.
pub struct AppState {
    /// Models by id.
    pub models: HashMap<String, ModelConfig>,
    /// Rerankers by id.
    pub rerankers: HashMap<String, RerankerConfig>,
    /// The document corpus.
    pub documents: Arc<dyn DocumentStore>,
    /// The test phrases.
    pub phrases: Vec<TestPhrase>,
    /// Append-only run history.
    pub run_store: Arc<dyn RunStore>,
}

impl AppState {
    /// Build the state from a parsed configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            models: config.models.into_iter().map(|m| (m.id.clone(), m)).collect(),
            rerankers: config.rerankers.into_iter().map(|r| (r.id.clone(), r)).collect(),
            documents: Arc::new(InMemoryDocumentStore::new(config.documents)),
            phrases: config.phrases,
            run_store: Arc::new(InMemoryRunStore::new()),
        }
    }
}
