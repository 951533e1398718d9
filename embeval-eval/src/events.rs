//! Streamed evaluation events.
//!
//! The orchestrator produces a lazy, finite, non-restartable sequence of
//! these discriminated-union events. The transport encoding (SSE, chunked
//! HTTP) is the server's concern; on the wire each event serializes with a
//! `type` discriminator and camelCase payload fields.

use serde::{Deserialize, Serialize};

use embeval_rag::ChunkStrategy;

use crate::types::{GridResult, Recommendation};

/// The phase a single-configuration evaluation is in.
///
/// `Failed` is reachable from any phase (e.g. an embedding-provider error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalPhase {
    /// Queued, not started.
    Pending,
    /// Splitting source documents into chunks.
    Chunking,
    /// Embedding chunks and phrases.
    Embedding,
    /// Retrieving top-5 per phrase and computing metrics.
    RetrievingAndScoring,
    /// Finished successfully.
    Done,
    /// Aborted by an error.
    Failed,
}

/// A progress note emitted by the evaluator while a configuration runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressNote {
    /// The phase the evaluator is in.
    pub phase: EvalPhase,
    /// Human-readable progress message.
    pub message: String,
}

/// One event in a sweep's (or single evaluation's) output stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EvalEvent {
    /// About to evaluate a configuration.
    #[serde(rename_all = "camelCase")]
    Config {
        /// 1-based index of this configuration in the sweep.
        current: usize,
        /// Total number of configurations in the sweep.
        total: usize,
        /// Chunk size under test.
        chunk_size: usize,
        /// Chunk overlap under test.
        chunk_overlap: usize,
        /// Strategy under test.
        strategy: ChunkStrategy,
    },

    /// Sub-step progress within a configuration.
    #[serde(rename_all = "camelCase")]
    Progress {
        /// Human-readable progress message.
        message: String,
        /// Evaluation phase, included for single-evaluation streams.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<EvalPhase>,
    },

    /// One configuration finished.
    #[serde(rename_all = "camelCase")]
    Result {
        /// The finished configuration and its outcome.
        #[serde(flatten)]
        result: GridResult,
    },

    /// The sweep finished.
    Complete {
        /// All per-configuration results plus the recommendation.
        data: CompletePayload,
    },

    /// A configuration (or the whole sweep) failed.
    Error {
        /// Actionable error message.
        message: String,
    },
}

/// Payload of the terminal `complete` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    /// All successfully evaluated configurations, in enumeration order.
    pub results: Vec<GridResult>,
    /// The winning configuration, `None` for single-evaluation streams.
    pub recommendation: Option<Recommendation>,
}
