//! Core types used throughout the Librarium server.
//!
//! This module contains the common data structures used for:
//! - Article records and search hits
//! - API requests and responses
//! - Session events (the WebSocket wire protocol)
//! - Authentication
//! - Error handling

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::lang::Lang;

// ============= Article Types =============

/// An article in the corpus.
///
/// The authoritative record lives in the lexical store; the two derived
/// embeddings (`<id>_title`, `<id>_summary`) live in the vector store.
/// Articles are never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Article {
    /// Opaque identifier assigned by the lexical store on first write.
    pub id: String,
    /// Detected content language.
    pub lang: Lang,
    /// Article title. Never empty.
    pub title: String,
    /// Original author, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// LLM-generated English summary of the content.
    pub summary: String,
    /// Full article text. Never empty.
    pub content: String,
    /// Comma-split, trimmed keyword tags.
    pub tags: Vec<String>,
    /// Source URL, if the article was imported from the web.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    /// Creation timestamp (supplied or ingest wall clock).
    pub created_date: DateTime<Utc>,
    /// Username of the submitter. Only the registrar may delete.
    pub registrar: String,
}

/// Provenance of a search hit: which retrieval signal(s) produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HitSource {
    /// Found by vector (semantic) search only.
    Vector,
    /// Found by lexical (BM25) search only.
    Keyword,
    /// Found by both; score is the weighted blend.
    Hybrid,
}

impl std::fmt::Display for HitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
            Self::Hybrid => "hybrid",
        };
        write!(f, "{}", name)
    }
}

/// A ranked source document returned by retrieval and cited by the answer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourceDoc {
    /// Article id.
    pub id: String,
    /// Article title.
    pub title: String,
    /// Article summary.
    pub summary: String,
    /// Article language.
    pub lang: Lang,
    /// Author, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Source URL, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    /// Final fused (and relevance-adjusted) score in [0, 1].
    pub score: f32,
    /// Which retrieval signal(s) produced this hit.
    pub source: HitSource,
}

// ============= Ingest API Types =============

/// Request to register a new article.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddArticleRequest {
    /// Article title. Required, non-empty.
    pub title: String,
    /// Full article text. Required, non-empty.
    pub content: String,
    /// Original author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Source URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    /// RFC-3339 creation timestamp. Defaults to ingest wall clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

/// Acknowledgement for a completed (or deduplicated) ingest.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestAck {
    /// Id of the stored (or pre-existing duplicate) article.
    pub id: String,
    /// Human-readable status; begins with "Duplicate" on dedup suppression.
    pub message: String,
}

impl IngestAck {
    /// True if this ack reports duplicate suppression rather than a new write.
    pub fn is_duplicate(&self) -> bool {
        self.message.starts_with("Duplicate")
    }
}

/// Request to register several articles in one batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkIngestRequest {
    /// Articles to ingest, processed with bounded concurrency.
    pub articles: Vec<AddArticleRequest>,
}

/// Outcome of a single item in a bulk ingest.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkItemResult {
    /// Position of this item in the request array.
    pub index: usize,
    /// Title of the submitted article (echoed for correlation).
    pub title: String,
    /// Whether ingestion succeeded.
    pub success: bool,
    /// Assigned article id on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Error description on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for a bulk ingest. `results` is ordered by input index
/// regardless of completion order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkIngestResponse {
    /// Per-item outcomes, `results[i].index == i`.
    pub results: Vec<BulkItemResult>,
    /// Number of successful items.
    pub success_count: usize,
    /// Number of failed items.
    pub error_count: usize,
}

// ============= Search API Types =============

fn default_search_limit() -> usize {
    10
}

/// Request for a hybrid search (and, over WebSocket, a streamed answer).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// Natural-language query in any supported language.
    pub query: String,
    /// Maximum number of sources to return.
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    /// Restrict vector search to a single language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<Lang>,
}

/// Response for a synchronous search.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    /// Ranked, gated sources.
    pub results: Vec<SourceDoc>,
    /// Number of results.
    pub total: usize,
    /// Query processing time in milliseconds.
    pub duration_ms: u64,
}

// ============= Session Events =============

/// Progress of a multi-step operation, as delivered to WebSocket clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgressUpdate {
    /// Name of the step about to run.
    pub step: String,
    /// 1-based index of the step.
    pub progress: usize,
    /// Total number of steps.
    pub total: usize,
    /// `progress / total` as a percentage.
    pub percent: f32,
}

impl ProgressUpdate {
    /// Build an update for step `progress` of `total`.
    pub fn new(step: impl Into<String>, progress: usize, total: usize) -> Self {
        Self {
            step: step.into(),
            progress,
            total,
            percent: if total == 0 {
                0.0
            } else {
                progress as f32 / total as f32 * 100.0
            },
        }
    }
}

/// Typed event delivered over a session transport.
///
/// Framed on the wire as `{"type": ..., "data": ...}`. Ordering contract per
/// session: `sources` precedes every `answer` chunk, and exactly one of
/// `done`/`error` terminates the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SessionEvent {
    /// Phase announcement ("searching", "generating", ...).
    Status(String),
    /// Ingestion step progress.
    Progress(ProgressUpdate),
    /// The fused-and-gated source list. Emitted exactly once per query.
    Sources(Vec<SourceDoc>),
    /// One incremental answer chunk; concatenation is the full answer.
    Answer(String),
    /// Terminal acknowledgement of a successful ingest.
    Success(IngestAck),
    /// Terminal failure.
    Error(String),
    /// Terminal success marker. Nothing follows.
    Done,
}

// ============= Authentication Types =============

/// Request payload for user login.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Account username (the registrar identity).
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Request payload for user registration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Username for the new account.
    pub username: String,
    /// Password for the new account.
    pub password: String,
}

/// Response containing authentication tokens.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token for API authentication.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: String,
    /// Time in seconds until the access token expires.
    pub expires_in: i64,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the username, which is also the registrar identity.
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: usize,
    /// Issued at time (Unix timestamp).
    pub iat: usize,
}

// ============= Error Types =============

/// Application-wide error type.
///
/// Kinds follow the propagation policy: `Validation`/`Auth`/`NotFound`/
/// `Permission` surface to the client immediately; `UpstreamDegraded` is
/// logged and the degraded path continues; `UpstreamUnavailable` and
/// `Timeout` abort the operation when they hit the critical path.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Ill-formed request (empty title/content/query, bad date format).
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Missing or invalid credentials for a protected operation.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Requested article (or other resource) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not the original registrar.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// A required backing store or the LLM runtime is down.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// An optional collaborator failed; the degraded path was taken.
    #[error("Upstream degraded: {0}")]
    UpstreamDegraded(String),

    /// A sub-operation exceeded its budget.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invariant violation or unparseable upstream response.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error kind.
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Permission(_) => StatusCode::FORBIDDEN,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamDegraded(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show unauthenticated, read-only consumers.
    ///
    /// `Internal` and `UpstreamDegraded` contents are never leaked verbatim
    /// through the public namespace.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "internal error".to_string(),
            AppError::UpstreamDegraded(_) => "temporarily degraded".to_string(),
            other => other.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// A specialized Result type for Librarium operations.
pub type Result<T> = std::result::Result<T, AppError>;
