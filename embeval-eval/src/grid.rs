//! Grid-search orchestrator.
//!
//! Enumerates the Cartesian product of chunk sizes × overlaps × strategies
//! (minus invalid combinations), evaluates each configuration in a stable
//! order, streams progress as [`EvalEvent`]s, and selects a winning
//! configuration by a deterministic tie-break rule.
//!
//! This is a fan-out/fan-in batch runner over a finite parameter space with
//! per-configuration isolation: one failing configuration produces an
//! `error` event and the sweep continues.

use std::sync::Arc;

use futures::stream::BoxStream;
use tracing::{info, warn};

use embeval_rag::{ChunkConfig, ChunkStrategy};

use crate::cancel::CancelToken;
use crate::error::EvalError;
use crate::evaluator::{EvalOutcome, Evaluator, ProgressSink};
use crate::events::{CompletePayload, EvalEvent, ProgressNote};
use crate::store::RunStore;
use crate::types::{EvalRun, GridResult, Recommendation};

/// Message emitted when the parameter space contains no valid configuration.
pub const NO_VALID_CONFIGS: &str =
    "no valid configurations: every overlap must be smaller than its chunk size";

/// Message emitted when every configuration errored.
pub const ALL_CONFIGS_FAILED: &str = "all configurations failed";

/// Message emitted when the caller cancelled the sweep.
pub const SWEEP_CANCELLED: &str = "sweep cancelled";

/// Axes of the configuration space to sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridParams {
    /// Candidate chunk sizes in tokens.
    pub chunk_sizes: Vec<usize>,
    /// Candidate overlaps in tokens.
    pub chunk_overlaps: Vec<usize>,
    /// Candidate strategies.
    pub strategies: Vec<ChunkStrategy>,
}

/// Enumerate the valid configurations of a parameter space.
///
/// Sizes and overlaps are sorted ascending and deduplicated; strategies
/// keep their given order (deduplicated). Tuples with `overlap >= size` are
/// filtered out. The result order — by size, then overlap, then strategy —
/// is the sweep's enumeration order and the final tie-break.
pub fn enumerate_configs(params: &GridParams) -> Vec<ChunkConfig> {
    let mut sizes: Vec<usize> = params.chunk_sizes.iter().copied().filter(|s| *s > 0).collect();
    sizes.sort_unstable();
    sizes.dedup();

    let mut overlaps: Vec<usize> = params.chunk_overlaps.clone();
    overlaps.sort_unstable();
    overlaps.dedup();

    let mut strategies: Vec<ChunkStrategy> = Vec::new();
    for strategy in &params.strategies {
        if !strategies.contains(strategy) {
            strategies.push(*strategy);
        }
    }

    let mut configs = Vec::new();
    for &size in &sizes {
        for &overlap in &overlaps {
            // Skip invalid configs where overlap >= chunk size
            if overlap >= size {
                continue;
            }
            for &strategy in &strategies {
                configs.push(ChunkConfig { chunk_size: size, chunk_overlap: overlap, strategy });
            }
        }
    }
    configs
}

/// Select the recommendation from completed results.
///
/// Tie-break chain: highest top-1 accuracy, then highest MRR, then smallest
/// chunk size; remaining ties resolve to the first result in enumeration
/// order (the sort is stable).
pub fn pick_recommendation(results: &[GridResult]) -> Option<Recommendation> {
    let mut ranked: Vec<&GridResult> = results.iter().collect();
    ranked.sort_by(|a, b| {
        b.metrics
            .top_k_accuracy_1
            .partial_cmp(&a.metrics.top_k_accuracy_1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.metrics
                    .mrr_score
                    .partial_cmp(&a.metrics.mrr_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.config.chunk_size.cmp(&b.config.chunk_size))
    });

    ranked.first().map(|best| Recommendation {
        chunk_size: best.config.chunk_size,
        chunk_overlap: best.config.chunk_overlap,
        strategy: best.config.strategy,
        metrics: best.metrics.clone(),
        run_id: best.run_id.clone(),
    })
}

/// The grid-search orchestrator.
///
/// Drives a sequence of single-configuration evaluations over an
/// [`Evaluator`] and persists the winning configuration's run to the
/// [`RunStore`]. Stateless between invocations; each call owns its
/// cancellation token and event stream.
pub struct GridSearch {
    evaluator: Arc<Evaluator>,
    run_store: Arc<dyn RunStore>,
}

impl GridSearch {
    /// Create a new orchestrator.
    pub fn new(evaluator: Arc<Evaluator>, run_store: Arc<dyn RunStore>) -> Self {
        Self { evaluator, run_store }
    }

    /// Run the sweep, returning a lazy stream of [`EvalEvent`]s.
    ///
    /// Configurations run sequentially in enumeration order, so emitted
    /// events are deterministic and attributable by configuration index.
    /// The stream ends with a `complete` event (or an `error` event when no
    /// configuration succeeded). Cancelling the token — or dropping the
    /// stream — aborts the sweep without persisting partial state;
    /// already-completed results remain valid.
    pub fn stream(&self, params: GridParams, cancel: CancelToken) -> BoxStream<'static, EvalEvent> {
        let evaluator = Arc::clone(&self.evaluator);
        let run_store = Arc::clone(&self.run_store);

        let stream = async_stream::stream! {
            let configs = enumerate_configs(&params);
            if configs.is_empty() {
                yield EvalEvent::Error { message: NO_VALID_CONFIGS.to_string() };
                return;
            }

            let total = configs.len();
            info!(total, model.id = %evaluator.model_id(), "starting grid search");

            let mut completed: Vec<(GridResult, EvalRun)> = Vec::new();
            let mut cancelled = false;

            for (index, config) in configs.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }

                yield EvalEvent::Config {
                    current: index + 1,
                    total,
                    chunk_size: config.chunk_size,
                    chunk_overlap: config.chunk_overlap,
                    strategy: config.strategy,
                };

                let label = config.label();
                let (sink, mut notes) = ProgressSink::channel();
                let mut evaluation =
                    Box::pin(evaluator.evaluate(&config, &sink, &cancel));

                let outcome = loop {
                    tokio::select! {
                        biased;
                        note = notes.recv() => {
                            if let Some(ProgressNote { message, .. }) = note {
                                yield EvalEvent::Progress {
                                    message: format!("{label} — {message}"),
                                    step: None,
                                };
                            }
                        }
                        result = &mut evaluation => {
                            while let Ok(ProgressNote { message, .. }) = notes.try_recv() {
                                yield EvalEvent::Progress {
                                    message: format!("{label} — {message}"),
                                    step: None,
                                };
                            }
                            break result;
                        }
                    }
                };

                match outcome {
                    Ok(EvalOutcome { run, details }) => {
                        let result = GridResult {
                            config,
                            metrics: run.metrics.clone(),
                            run_id: run.id.clone(),
                            total_chunks: run.total_chunks,
                            total_phrases: run.total_phrases,
                            details,
                        };
                        yield EvalEvent::Result { result: result.clone() };
                        completed.push((result, run));
                    }
                    Err(EvalError::Cancelled) => {
                        cancelled = true;
                        break;
                    }
                    Err(e) => {
                        warn!(config = %label, error = %e, "configuration failed, sweep continues");
                        yield EvalEvent::Error { message: format!("{label}: {e}") };
                    }
                }
            }

            if cancelled {
                info!(completed = completed.len(), "grid search cancelled");
                yield EvalEvent::Error { message: SWEEP_CANCELLED.to_string() };
                return;
            }

            if completed.is_empty() {
                yield EvalEvent::Error { message: ALL_CONFIGS_FAILED.to_string() };
                return;
            }

            let results: Vec<GridResult> =
                completed.iter().map(|(result, _)| result.clone()).collect();
            let recommendation = pick_recommendation(&results);

            // Persist only the winning configuration's run
            if let Some(recommendation) = &recommendation {
                let winning = completed
                    .iter()
                    .find(|(result, _)| result.run_id == recommendation.run_id)
                    .map(|(_, run)| run.clone());
                if let Some(run) = winning {
                    if let Err(e) = run_store.create(run).await {
                        yield EvalEvent::Error { message: format!("failed to persist run: {e}") };
                        return;
                    }
                }
            }

            info!(results = results.len(), "grid search complete");
            yield EvalEvent::Complete {
                data: CompletePayload { results, recommendation },
            };
        };

        Box::pin(stream)
    }

    /// Evaluate a single configuration, returning a lazy stream of
    /// [`EvalEvent`]s.
    ///
    /// Unlike a sweep, the run is always persisted on success. The stream
    /// carries `progress` events with phase detail, one `result` event, and
    /// a terminal `complete` event with no recommendation.
    pub fn evaluate_stream(
        &self,
        config: ChunkConfig,
        cancel: CancelToken,
    ) -> BoxStream<'static, EvalEvent> {
        let evaluator = Arc::clone(&self.evaluator);
        let run_store = Arc::clone(&self.run_store);

        let stream = async_stream::stream! {
            yield EvalEvent::Config {
                current: 1,
                total: 1,
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
                strategy: config.strategy,
            };

            let (sink, mut notes) = ProgressSink::channel();
            let mut evaluation = Box::pin(evaluator.evaluate(&config, &sink, &cancel));

            let outcome = loop {
                tokio::select! {
                    biased;
                    note = notes.recv() => {
                        if let Some(note) = note {
                            yield EvalEvent::Progress {
                                message: note.message,
                                step: Some(note.phase),
                            };
                        }
                    }
                    result = &mut evaluation => {
                        while let Ok(note) = notes.try_recv() {
                            yield EvalEvent::Progress {
                                message: note.message,
                                step: Some(note.phase),
                            };
                        }
                        break result;
                    }
                }
            };

            match outcome {
                Ok(EvalOutcome { run, details }) => {
                    if let Err(e) = run_store.create(run.clone()).await {
                        yield EvalEvent::Error { message: format!("failed to persist run: {e}") };
                        return;
                    }
                    let result = GridResult {
                        config,
                        metrics: run.metrics.clone(),
                        run_id: run.id.clone(),
                        total_chunks: run.total_chunks,
                        total_phrases: run.total_phrases,
                        details,
                    };
                    yield EvalEvent::Result { result: result.clone() };
                    yield EvalEvent::Complete {
                        data: CompletePayload { results: vec![result], recommendation: None },
                    };
                }
                Err(EvalError::Cancelled) => {
                    yield EvalEvent::Error { message: "evaluation cancelled".to_string() };
                }
                Err(e) => {
                    yield EvalEvent::Error { message: e.to_string() };
                }
            }
        };

        Box::pin(stream)
    }
}
