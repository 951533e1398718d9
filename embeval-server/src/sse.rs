//! HTTP handlers: SSE evaluation streams and run history.
//!
//! Events are encoded as `data: <json>\n\n` frames with a `type`
//! discriminator (see [`embeval_eval::EvalEvent`]). A client disconnect
//! drops the stream, which cooperatively cancels the in-flight sweep at its
//! next suspension point.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::info;

use embeval_eval::{CancelToken, EvalEvent, EvalRun, Evaluator, GridParams, GridSearch};
use embeval_rag::http::{HttpEmbeddingProvider, LlmReranker};
use embeval_rag::{ChunkConfig, ChunkStrategy};

use crate::state::AppState;

type ApiError = (StatusCode, String);

/// Query parameters for `/api/grid-search`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSearchQuery {
    model_id: String,
    #[serde(default)]
    reranker_id: Option<String>,
    #[serde(default)]
    matryoshka_dim: Option<usize>,
    /// Comma-separated token sizes, defaults to `100,200,300,500`.
    #[serde(default)]
    chunk_sizes: Option<String>,
    /// Comma-separated overlaps, defaults to `0,30,60`.
    #[serde(default)]
    chunk_overlaps: Option<String>,
    /// Comma-separated strategies, defaults to `sentence`.
    #[serde(default)]
    strategies: Option<String>,
}

/// Query parameters for `/api/evaluate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateQuery {
    model_id: String,
    #[serde(default)]
    reranker_id: Option<String>,
    #[serde(default)]
    matryoshka_dim: Option<usize>,
    #[serde(default)]
    chunk_size: Option<usize>,
    #[serde(default)]
    chunk_overlap: Option<usize>,
    #[serde(default)]
    strategy: Option<String>,
}

/// Query parameters for `/api/runs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunsQuery {
    model_id: String,
}

/// Parse a comma-separated list of unsigned integers, keeping entries the
/// filter accepts.
pub(crate) fn parse_number_list(raw: &str, keep: impl Fn(usize) -> bool) -> Vec<usize> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<usize>().ok())
        .filter(|n| keep(*n))
        .collect()
}

/// Parse a comma-separated list of strategies.
pub(crate) fn parse_strategies(raw: &str) -> Result<Vec<ChunkStrategy>, String> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.parse::<ChunkStrategy>().map_err(|e| e.to_string()))
        .collect()
}

/// Assemble the grid-search orchestrator for one request.
fn build_search(
    state: &AppState,
    model_id: &str,
    reranker_id: Option<&str>,
    matryoshka_dim: Option<usize>,
) -> Result<GridSearch, ApiError> {
    let model = state
        .models
        .get(model_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown model '{model_id}'")))?;

    let mut provider =
        HttpEmbeddingProvider::new(&model.provider_url, &model.name, model.dimensions);
    if let Some(api_key) = &model.api_key {
        provider = provider.with_api_key(api_key);
    }

    let mut builder = Evaluator::builder()
        .model_id(&model.id)
        .embedding_provider(Arc::new(provider))
        .document_store(Arc::clone(&state.documents))
        .phrases(state.phrases.clone())
        .matryoshka_dim(matryoshka_dim);

    if let Some(reranker_id) = reranker_id {
        let reranker = state
            .rerankers
            .get(reranker_id)
            .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown reranker '{reranker_id}'")))?;
        let mut llm = LlmReranker::new(&reranker.provider_url, &reranker.name);
        if let Some(api_key) = &reranker.api_key {
            llm = llm.with_api_key(api_key);
        }
        builder = builder.reranker(&reranker.id, Arc::new(llm));
    }

    let evaluator = builder
        .build()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(GridSearch::new(Arc::new(evaluator), Arc::clone(&state.run_store)))
}

fn into_sse(
    events: futures::stream::BoxStream<'static, EvalEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = events.map(|event| {
        let frame = match Event::default().json_data(&event) {
            Ok(frame) => frame,
            Err(_) => Event::default().data("{\"type\":\"error\",\"message\":\"encoding failed\"}"),
        };
        Ok(frame)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `GET /api/grid-search` — sweep the configuration space, streaming events.
pub async fn grid_search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GridSearchQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let chunk_sizes = parse_number_list(
        query.chunk_sizes.as_deref().unwrap_or("100,200,300,500"),
        |n| n > 0,
    );
    let chunk_overlaps =
        parse_number_list(query.chunk_overlaps.as_deref().unwrap_or("0,30,60"), |_| true);
    let strategies = parse_strategies(query.strategies.as_deref().unwrap_or("sentence"))
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    if chunk_sizes.is_empty() || strategies.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "chunkSizes and strategies must not be empty".to_string(),
        ));
    }

    let search = build_search(
        &state,
        &query.model_id,
        query.reranker_id.as_deref(),
        query.matryoshka_dim,
    )?;

    info!(
        model.id = %query.model_id,
        sizes = chunk_sizes.len(),
        overlaps = chunk_overlaps.len(),
        strategies = strategies.len(),
        "starting grid search request"
    );

    let params = GridParams { chunk_sizes, chunk_overlaps, strategies };
    Ok(into_sse(search.stream(params, CancelToken::new())))
}

/// `GET /api/evaluate` — evaluate a single configuration, streaming events.
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EvaluateQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let strategy = query
        .strategy
        .as_deref()
        .unwrap_or("sentence")
        .parse::<ChunkStrategy>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let config = ChunkConfig::builder()
        .chunk_size(query.chunk_size.unwrap_or(300))
        .chunk_overlap(query.chunk_overlap.unwrap_or(60))
        .strategy(strategy)
        .build()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let search = build_search(
        &state,
        &query.model_id,
        query.reranker_id.as_deref(),
        query.matryoshka_dim,
    )?;

    info!(model.id = %query.model_id, config = %config.label(), "starting evaluation request");

    Ok(into_sse(search.evaluate_stream(config, CancelToken::new())))
}

/// `GET /api/runs` — run history for a model, newest first.
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<EvalRun>>, ApiError> {
    if !state.models.contains_key(&query.model_id) {
        return Err((StatusCode::NOT_FOUND, format!("unknown model '{}'", query.model_id)));
    }
    let runs = state
        .run_store
        .list_by_model(&query.model_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(runs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_list_parsing_filters_and_skips_garbage() {
        assert_eq!(parse_number_list("100,200,300", |n| n > 0), vec![100, 200, 300]);
        assert_eq!(parse_number_list("0,30,abc,60", |_| true), vec![0, 30, 60]);
        assert_eq!(parse_number_list("0,100", |n| n > 0), vec![100]);
        assert_eq!(parse_number_list(" 50 , 60 ", |_| true), vec![50, 60]);
    }

    #[test]
    fn strategy_list_parsing_rejects_unknown_names() {
        assert_eq!(
            parse_strategies("sentence,recursive").unwrap(),
            vec![ChunkStrategy::Sentence, ChunkStrategy::Recursive]
        );
        assert!(parse_strategies("sentence,semantic").is_err());
    }
}
