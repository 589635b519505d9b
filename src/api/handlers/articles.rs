//! Article handlers: registration, retrieval, listing, deletion, bulk.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::middleware::AuthUser;
use crate::store::{summary_point_id, title_point_id, LexicalStore, VectorStore};
use crate::types::{
    AddArticleRequest, AppError, Article, BulkIngestRequest, BulkIngestResponse, IngestAck, Result,
};
use crate::AppState;

/// Date-range filter for the caller's article listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListArticlesQuery {
    /// Only articles created at or after this RFC-3339 instant.
    pub from: Option<DateTime<Utc>>,
    /// Only articles created at or before this RFC-3339 instant.
    pub to: Option<DateTime<Utc>>,
}

/// Register a new article.
///
/// Runs the full ingestion pipeline synchronously. Returns 201 with the
/// assigned id, or 200 echoing the existing id when the title probe finds
/// a duplicate.
#[utoipa::path(
    post,
    path = "/api/v1/articles",
    request_body = AddArticleRequest,
    responses(
        (status = 201, description = "Article registered", body = IngestAck),
        (status = 200, description = "Duplicate suppressed, existing id returned", body = IngestAck),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "A required backing service is unavailable")
    ),
    tag = "articles",
    security(("bearer" = []))
)]
pub async fn add_article(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<AddArticleRequest>,
) -> Result<(StatusCode, Json<IngestAck>)> {
    let ack = state.ingest.ingest(payload, &claims.sub, None).await?;
    let status = if ack.is_duplicate() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ack)))
}

/// Fetch an article by id.
#[utoipa::path(
    get,
    path = "/api/v1/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "The article", body = Article),
        (status = 404, description = "No such article")
    ),
    tag = "articles",
    security(("bearer" = []))
)]
pub async fn get_article(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Article>> {
    let article = state
        .lexical
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;
    Ok(Json(article))
}

/// List the caller's own articles, newest first, optionally bounded by
/// creation date.
#[utoipa::path(
    get,
    path = "/api/v1/articles",
    params(ListArticlesQuery),
    responses(
        (status = 200, description = "The caller's articles", body = Vec<Article>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "articles",
    security(("bearer" = []))
)]
pub async fn list_articles(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(query): Query<ListArticlesQuery>,
) -> Result<Json<Vec<Article>>> {
    let articles = state
        .lexical
        .list_by_registrar(&claims.sub, query.from, query.to)
        .await?;
    Ok(Json(articles))
}

/// Delete an article. Only the original registrar may do this.
///
/// The lexical record goes first; the two vector points are deleted
/// best-effort afterwards, and a failure there is logged rather than
/// surfaced, since read-repair can reconcile orphaned points later.
#[utoipa::path(
    delete,
    path = "/api/v1/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Caller is not the registrar"),
        (status = 404, description = "No such article")
    ),
    tag = "articles",
    security(("bearer" = []))
)]
pub async fn delete_article(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let article = state
        .lexical
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

    if article.registrar != claims.sub {
        return Err(AppError::Permission(
            "Only the registrar may delete an article".to_string(),
        ));
    }

    state.lexical.delete(&id).await?;

    for point_id in [title_point_id(&id), summary_point_id(&id)] {
        if let Err(e) = state.vector.delete(&point_id).await {
            tracing::warn!(point_id = %point_id, error = %e, "Vector point delete failed");
        }
    }

    tracing::info!(article_id = %id, registrar = %claims.sub, "Article deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Register a batch of articles.
///
/// Items run through the same pipeline with bounded concurrency; the
/// result array is ordered by input index regardless of completion order.
#[utoipa::path(
    post,
    path = "/api/v1/articles/bulk",
    request_body = BulkIngestRequest,
    responses(
        (status = 200, description = "Per-item results", body = BulkIngestResponse),
        (status = 400, description = "Empty batch"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "articles",
    security(("bearer" = []))
)]
pub async fn bulk_ingest(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<BulkIngestRequest>,
) -> Result<Json<BulkIngestResponse>> {
    if payload.articles.is_empty() {
        return Err(AppError::Validation(
            "Bulk request must contain at least one article".to_string(),
        ));
    }
    let response = state
        .ingest
        .ingest_bulk(payload.articles, &claims.sub, None)
        .await;
    Ok(Json(response))
}
