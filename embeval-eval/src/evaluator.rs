//! Single-configuration evaluator.
//!
//! The [`Evaluator`] coordinates one configuration's full evaluation:
//! chunk every source document, embed chunks and phrases, retrieve the
//! top-5 chunks per phrase, and aggregate ranking metrics. Construct one
//! via [`Evaluator::builder()`].

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use embeval_rag::{
    Chunk, ChunkConfig, EmbeddingProvider, Reranker, SimilarityRetriever, chunker_for,
    retriever::DEFAULT_SHORTLIST,
};

use crate::cancel::CancelToken;
use crate::error::{EvalError, Result};
use crate::events::{EvalPhase, ProgressNote};
use crate::matching::{MIN_MATCH_SCORE, find_best_chunk_match};
use crate::metrics;
use crate::store::DocumentStore;
use crate::types::{EvalRun, ExpectedChunk, PhraseDetail, RetrievedChunk, TestPhrase};

/// Number of texts embedded per provider call.
///
/// A throughput choice, not a correctness contract.
const BATCH_SIZE: usize = 50;

/// Number of results retrieved per phrase.
const TOP_K: usize = 5;

/// Progress side channel for a running evaluation.
///
/// Sends are best-effort: once the receiving end is gone (e.g. the consumer
/// dropped the event stream), notes are silently discarded.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressNote>>,
}

impl ProgressSink {
    /// Create a sink/receiver pair.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressNote>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards every note.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit a progress note.
    pub fn send(&self, phase: EvalPhase, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressNote { phase, message: message.into() });
        }
    }
}

/// The outcome of evaluating one configuration.
///
/// The run is returned transiently — persisting it is the caller's choice
/// (grid search persists only the winning configuration).
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    /// The aggregate run record, not yet persisted.
    pub run: EvalRun,
    /// Per-phrase outcomes, in phrase order.
    pub details: Vec<PhraseDetail>,
}

/// Evaluates chunking configurations for one embedding model.
///
/// Owns no mutable state across evaluations: each call chunk-and-embeds a
/// fresh candidate set, so concurrent evaluations of different
/// configurations never interfere (the embedding provider's rate limit is
/// the only shared resource).
pub struct Evaluator {
    model_id: String,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    document_store: Arc<dyn DocumentStore>,
    phrases: Vec<TestPhrase>,
    reranker: Option<Arc<dyn Reranker>>,
    reranker_id: Option<String>,
    matryoshka_dim: Option<usize>,
}

impl Evaluator {
    /// Create a new [`EvaluatorBuilder`].
    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::default()
    }

    /// The model id this evaluator scores.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Evaluate one chunking configuration.
    ///
    /// Emits progress notes into `progress` and honors `cancel` between
    /// suspension points. On success returns the (unpersisted) run and
    /// per-phrase details.
    ///
    /// # Errors
    ///
    /// - [`EvalError::NoPhrases`] if no phrase maps onto a chunk of this
    ///   configuration
    /// - [`EvalError::Cancelled`] if the token was cancelled
    /// - [`EvalError::Rag`] on embedding-provider or reranker failures
    pub async fn evaluate(
        &self,
        config: &ChunkConfig,
        progress: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<EvalOutcome> {
        progress.send(EvalPhase::Pending, "starting evaluation...");
        match self.run_phases(config, progress, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(EvalError::Cancelled) => Err(EvalError::Cancelled),
            Err(e) => {
                progress.send(EvalPhase::Failed, format!("evaluation failed: {e}"));
                Err(e)
            }
        }
    }

    async fn run_phases(
        &self,
        config: &ChunkConfig,
        progress: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<EvalOutcome> {
        // 1. Chunk every source document
        progress.send(EvalPhase::Chunking, "chunking source documents...");
        let documents = self.document_store.documents().await?;
        cancel.check()?;

        let chunker = chunker_for(config);
        let mut chunks: Vec<Chunk> = Vec::new();
        for document in &documents {
            chunks.extend(chunker.chunk(document));
        }
        progress.send(EvalPhase::Chunking, format!("created {} chunks", chunks.len()));

        // 2. Map phrase ground truth onto this configuration's chunks
        let mapped = self.map_phrases(&chunks);
        let unmapped = self.phrases.len() - mapped.len();
        if mapped.is_empty() {
            return Err(EvalError::NoPhrases);
        }
        if unmapped > 0 {
            progress.send(
                EvalPhase::Chunking,
                format!("mapped {} phrases, {unmapped} unmapped", mapped.len()),
            );
        } else {
            progress.send(EvalPhase::Chunking, format!("mapped {} phrases", mapped.len()));
        }

        // 3. Embed chunks, then phrases, in batches
        for batch_start in (0..chunks.len()).step_by(BATCH_SIZE) {
            cancel.check()?;
            let batch_end = (batch_start + BATCH_SIZE).min(chunks.len());
            let texts: Vec<&str> =
                chunks[batch_start..batch_end].iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedding_provider.embed_batch(&texts).await?;
            for (chunk, embedding) in chunks[batch_start..batch_end].iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }
            progress.send(
                EvalPhase::Embedding,
                format!("embedded chunks {batch_end}/{}", chunks.len()),
            );
        }

        let mut phrase_embeddings: Vec<Vec<f32>> = Vec::with_capacity(mapped.len());
        for batch in mapped.chunks(BATCH_SIZE) {
            cancel.check()?;
            let texts: Vec<&str> = batch.iter().map(|(p, _)| p.phrase.as_str()).collect();
            phrase_embeddings.extend(self.embedding_provider.embed_batch(&texts).await?);
            progress.send(
                EvalPhase::Embedding,
                format!("embedded phrases {}/{}", phrase_embeddings.len(), mapped.len()),
            );
        }

        // 4. Retrieve top-5 per phrase and score
        let retriever = SimilarityRetriever::new()
            .with_top_n(TOP_K)
            .with_shortlist(DEFAULT_SHORTLIST)
            .with_matryoshka_dim(self.matryoshka_dim)
            .with_reranker(self.reranker.clone());

        let mut details: Vec<PhraseDetail> = Vec::with_capacity(mapped.len());
        for (i, ((phrase, expected_id), embedding)) in
            mapped.iter().zip(&phrase_embeddings).enumerate()
        {
            cancel.check()?;
            let results = retriever.retrieve(&phrase.phrase, embedding, &chunks).await?;

            let retrieved_chunks: Vec<RetrievedChunk> = results
                .iter()
                .map(|scored| RetrievedChunk {
                    chunk_index: scored.chunk.chunk_index,
                    content: scored.chunk.text.clone(),
                    source_title: scored.chunk.source_title.clone(),
                    similarity: scored.similarity,
                    is_expected: scored.chunk.id == *expected_id,
                })
                .collect();

            let expected_rank = metrics::expected_rank(&retrieved_chunks);
            let expected_chunk = chunks.iter().find(|c| &c.id == expected_id).map(|c| {
                ExpectedChunk {
                    chunk_index: c.chunk_index,
                    content: c.text.clone(),
                    source_title: c.source_title.clone(),
                }
            });

            details.push(PhraseDetail {
                phrase: phrase.phrase.clone(),
                category: phrase.category.clone(),
                expected_chunk,
                retrieved_chunks,
                expected_rank,
                is_hit: expected_rank.is_some(),
            });

            if (i + 1) % 5 == 0 || i + 1 == mapped.len() {
                progress.send(
                    EvalPhase::RetrievingAndScoring,
                    format!("scored {}/{} phrases", i + 1, mapped.len()),
                );
            }
        }

        // 5. Aggregate
        let run_metrics = metrics::aggregate(&details);
        let category_breakdown = metrics::category_breakdown(&details);

        let run = EvalRun {
            id: Uuid::new_v4().to_string(),
            model_id: self.model_id.clone(),
            reranker_id: self.reranker_id.clone(),
            matryoshka_dim: self.matryoshka_dim,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            strategy: config.strategy,
            metrics: run_metrics,
            total_chunks: chunks.len(),
            total_phrases: details.len(),
            category_breakdown,
            created_at: Utc::now(),
        };

        info!(
            run.id = %run.id,
            model.id = %self.model_id,
            config = %config.label(),
            top1 = run.metrics.top_k_accuracy_1,
            mrr = run.metrics.mrr_score,
            "evaluated configuration"
        );
        progress.send(EvalPhase::Done, "evaluation complete");

        Ok(EvalOutcome { run, details })
    }

    /// Resolve each phrase's expected content against the given chunks.
    ///
    /// Phrases scoring below [`MIN_MATCH_SCORE`] are excluded from this
    /// configuration's evaluation.
    fn map_phrases<'a>(&'a self, chunks: &[Chunk]) -> Vec<(&'a TestPhrase, String)> {
        let mut mapped = Vec::with_capacity(self.phrases.len());
        for phrase in &self.phrases {
            match find_best_chunk_match(&phrase.expected_content, chunks) {
                Some(m) if m.score >= MIN_MATCH_SCORE => {
                    mapped.push((phrase, chunks[m.index].id.clone()));
                }
                _ => {
                    warn!(phrase.id = %phrase.id, "no chunk matched the expected content");
                }
            }
        }
        mapped
    }
}

/// Builder for constructing an [`Evaluator`].
///
/// `model_id`, `embedding_provider`, `document_store`, and `phrases` are
/// required; reranker and Matryoshka dimension are optional.
#[derive(Default)]
pub struct EvaluatorBuilder {
    model_id: Option<String>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    document_store: Option<Arc<dyn DocumentStore>>,
    phrases: Option<Vec<TestPhrase>>,
    reranker: Option<Arc<dyn Reranker>>,
    reranker_id: Option<String>,
    matryoshka_dim: Option<usize>,
}

impl EvaluatorBuilder {
    /// Set the embedding-model identifier recorded on runs.
    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the source-document store.
    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    /// Set the test phrases to evaluate against.
    pub fn phrases(mut self, phrases: Vec<TestPhrase>) -> Self {
        self.phrases = Some(phrases);
        self
    }

    /// Set an optional reranker (with the id recorded on runs).
    pub fn reranker(mut self, id: impl Into<String>, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self.reranker_id = Some(id.into());
        self
    }

    /// Truncate embeddings to a Matryoshka prefix dimension during retrieval.
    pub fn matryoshka_dim(mut self, dim: Option<usize>) -> Self {
        self.matryoshka_dim = dim;
        self
    }

    /// Build the [`Evaluator`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Rag`] with a configuration error if any
    /// required field is missing.
    pub fn build(self) -> Result<Evaluator> {
        use embeval_rag::RagError;

        let model_id = self
            .model_id
            .ok_or_else(|| RagError::ConfigError("model_id is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let document_store = self
            .document_store
            .ok_or_else(|| RagError::ConfigError("document_store is required".to_string()))?;
        let phrases =
            self.phrases.ok_or_else(|| RagError::ConfigError("phrases are required".to_string()))?;

        Ok(Evaluator {
            model_id,
            embedding_provider,
            document_store,
            phrases,
            reranker: self.reranker,
            reranker_id: self.reranker_id,
            matryoshka_dim: self.matryoshka_dim,
        })
    }
}
