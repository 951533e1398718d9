//! HTTP embedding provider and LLM reranker for OpenAI-compatible servers.
//!
//! This module is only available when the `http` feature is enabled. It
//! targets OpenAI-compatible endpoints (`/v1/embeddings`,
//! `/v1/chat/completions`) as served by LM Studio, Ollama's compatibility
//! layer, and hosted APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::reranker::Reranker;

/// The default base URL (LM Studio's local server).
const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// Uses `reqwest` to call `{base_url}/embeddings` directly, with native
/// batching.
///
/// # Configuration
///
/// - `base_url` – server base, e.g. `http://localhost:1234/v1`.
/// - `model` – model name as known to the server.
/// - `dimensions` – native output dimensionality.
/// - `request_dimensions` – optional Matryoshka truncation requested from
///   the API (servers that support it return prefix-truncated vectors).
/// - `api_key` – optional bearer token; local servers usually need none.
///
/// # Example
///
/// ```rust,ignore
/// use embeval_rag::http::HttpEmbeddingProvider;
///
/// let provider = HttpEmbeddingProvider::new("http://localhost:1234/v1", "nomic-embed-text", 768);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl HttpEmbeddingProvider {
    /// Create a new provider for the given server, model, and native
    /// dimensionality.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        let mut base_url = base_url.into();
        if base_url.is_empty() {
            base_url = DEFAULT_BASE_URL.to_string();
        }
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            dimensions,
            request_dimensions: None,
        }
    }

    /// Set a bearer token for authenticated servers.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Request Matryoshka-truncated output dimensions from the API.
    ///
    /// This also updates the value returned by
    /// [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: self.model.clone(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            model = %self.model,
            batch_size = texts.len(),
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let mut request =
            self.client.post(format!("{}/embeddings", self.base_url)).json(&request_body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(model = %self.model, error = %e, "embedding request failed");
            RagError::EmbeddingError {
                provider: self.model.clone(),
                message: format!("request failed: {e}"),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(model = %self.model, %status, "embedding API error");
            return Err(RagError::EmbeddingError {
                provider: self.model.clone(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(model = %self.model, error = %e, "failed to parse embedding response");
            RagError::EmbeddingError {
                provider: self.model.clone(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── LLM reranker ───────────────────────────────────────────────────

const RERANK_SYSTEM_PROMPT: &str = "You are a relevance scoring system. Rate how relevant a \
document is to a given query on a scale from 0 to 10, where 0 means completely irrelevant and 10 \
means perfectly relevant. Respond with ONLY a single number (0-10), nothing else.";

/// A [`Reranker`] that scores each (query, document) pair with a chat model.
///
/// Every document is scored on a 0–10 relevance scale via an
/// OpenAI-compatible `/chat/completions` endpoint; results are ordered by
/// descending score. A failed or unparseable scoring call counts as score 0
/// rather than failing the whole rerank.
pub struct LlmReranker {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl LlmReranker {
    /// Create a new reranker for the given server and chat model.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
        }
    }

    /// Set a bearer token for authenticated servers.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    async fn score_document(&self, query: &str, document: &str) -> Result<f32> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: RERANK_SYSTEM_PROMPT.to_string() },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Query: {query}\n\nDocument: {document}\n\nRelevance score (0-10):"
                    ),
                },
            ],
            temperature: 0.0,
            max_tokens: 10,
        };

        let mut request =
            self.client.post(format!("{}/chat/completions", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| RagError::RerankerError {
            reranker: self.model.clone(),
            message: format!("request failed: {e}"),
        })?;

        if !response.status().is_success() {
            return Err(RagError::RerankerError {
                reranker: self.model.clone(),
                message: format!("API returned {}", response.status()),
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| RagError::RerankerError {
            reranker: self.model.clone(),
            message: format!("failed to parse response: {e}"),
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        Ok(parse_score(&content))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Parse a numeric score (0–10) from model output, clamping to range.
/// Falls back to 0 if no number is found.
fn parse_score(text: &str) -> f32 {
    let mut number = String::new();
    for c in text.trim().chars() {
        if c.is_ascii_digit() || (c == '.' && number.contains(|d: char| d.is_ascii_digit())) {
            number.push(c);
        } else if !number.is_empty() {
            break;
        }
    }
    number.parse::<f32>().map(|s| s.clamp(0.0, 10.0)).unwrap_or(0.0)
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(&self, query: &str, documents: &[&str]) -> Result<Vec<usize>> {
        let mut scores = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            let score = match self.score_document(query, document).await {
                Ok(score) => score,
                Err(e) => {
                    warn!(index, error = %e, "scoring failed, counting as 0");
                    0.0
                }
            };
            scores.push((index, score));
        }

        // Descending by score; ties keep original order
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scores.into_iter().map(|(index, _)| index).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_score_extracts_leading_number() {
        assert_eq!(parse_score("7"), 7.0);
        assert_eq!(parse_score(" 8.5 out of 10"), 8.5);
        assert_eq!(parse_score("Score: none"), 0.0);
        assert_eq!(parse_score("15"), 10.0);
    }
}
