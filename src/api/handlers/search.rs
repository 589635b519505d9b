//! Synchronous search handlers.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::types::{AppError, Result, SearchRequest, SearchResponse, SourceDoc};
use crate::AppState;

fn default_keyword_limit() -> usize {
    10
}

/// Query parameters for the keyword-only search endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct KeywordSearchQuery {
    /// The query string.
    pub q: String,
    /// Maximum number of results.
    #[serde(default = "default_keyword_limit")]
    pub limit: usize,
}

/// Hybrid search: parallel vector and lexical retrieval, fused, gated.
///
/// Returns the ranked sources only; the streaming WebSocket variant also
/// generates an answer over them.
#[utoipa::path(
    post,
    path = "/api/v1/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Ranked sources", body = SearchResponse),
        (status = 400, description = "Empty query"),
        (status = 502, description = "Both retrieval legs unavailable")
    ),
    tag = "search"
)]
pub async fn search(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    let retrieval = state
        .search
        .retrieve(&payload.query, payload.limit, payload.lang)
        .await?;

    let results: Vec<SourceDoc> = retrieval.sources.into_iter().map(Into::into).collect();
    let duration_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        query_lang = %retrieval.query_lang,
        results = results.len(),
        duration_ms,
        "Search completed"
    );

    Ok(Json(SearchResponse {
        total: results.len(),
        results,
        duration_ms,
    }))
}

/// Lexical-only search over the boosted fields.
#[utoipa::path(
    get,
    path = "/api/v1/search/keyword",
    params(KeywordSearchQuery),
    responses(
        (status = 200, description = "Ranked sources", body = SearchResponse),
        (status = 400, description = "Empty query")
    ),
    tag = "search"
)]
pub async fn keyword_search(
    State(state): State<AppState>,
    Query(query): Query<KeywordSearchQuery>,
) -> Result<Json<SearchResponse>> {
    if query.q.trim().is_empty() {
        return Err(AppError::Validation("Query must not be empty".to_string()));
    }
    let start = Instant::now();

    let ranked = state.search.keyword_search(&query.q, query.limit).await?;
    let results: Vec<SourceDoc> = ranked.into_iter().map(Into::into).collect();

    Ok(Json(SearchResponse {
        total: results.len(),
        results,
        duration_ms: start.elapsed().as_millis() as u64,
    }))
}
