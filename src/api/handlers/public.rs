//! Unauthenticated read-only mirror.
//!
//! Mirrors listing, detail, and search for callers without accounts.
//! Internal error details never leak through this namespace: every error
//! is rewritten to its public message before serialization.

use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::store::LexicalStore;
use crate::types::{AppError, Article, SearchRequest, SearchResponse, SourceDoc};
use crate::AppState;

fn default_list_limit() -> usize {
    20
}

/// Query parameters for the public article listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PublicListQuery {
    /// Maximum number of articles, newest first.
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

/// Rewrite an error for unauthenticated consumers.
fn redact(error: AppError) -> Response {
    let status = error.status_code();
    let body = serde_json::json!({ "error": error.public_message() });
    (status, Json(body)).into_response()
}

/// Recent articles, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/public/articles",
    params(PublicListQuery),
    responses((status = 200, description = "Recent articles", body = Vec<Article>)),
    tag = "public"
)]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<PublicListQuery>,
) -> Response {
    match state.lexical.list_recent(query.limit).await {
        Ok(articles) => Json(articles).into_response(),
        Err(e) => redact(e),
    }
}

/// Fetch an article by id.
#[utoipa::path(
    get,
    path = "/api/v1/public/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "The article", body = Article),
        (status = 404, description = "No such article")
    ),
    tag = "public"
)]
pub async fn get_article(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.lexical.get(&id).await {
        Ok(Some(article)) => Json(article).into_response(),
        Ok(None) => redact(AppError::NotFound(format!("Article {} not found", id))),
        Err(e) => redact(e),
    }
}

/// Hybrid search for unauthenticated callers.
#[utoipa::path(
    post,
    path = "/api/v1/public/search",
    request_body = SearchRequest,
    responses((status = 200, description = "Ranked sources", body = SearchResponse)),
    tag = "public"
)]
pub async fn search(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Response {
    let start = Instant::now();
    match state
        .search
        .retrieve(&payload.query, payload.limit, payload.lang)
        .await
    {
        Ok(retrieval) => {
            let results: Vec<SourceDoc> = retrieval.sources.into_iter().map(Into::into).collect();
            Json(SearchResponse {
                total: results.len(),
                results,
                duration_ms: start.elapsed().as_millis() as u64,
            })
            .into_response()
        }
        Err(e) => redact(e),
    }
}
