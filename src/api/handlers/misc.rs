//! Health and capability endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::lang::Lang;
use crate::llm::LlmClient;
use crate::store::{LexicalStore, VectorStore};
use crate::types::Result;
use crate::AppState;

/// Health report across the backing services.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when everything answers, "degraded" otherwise.
    pub status: String,
    /// Whether the LLM runtime responded to a probe.
    pub llm_runtime: bool,
    /// Number of indexed articles.
    pub articles: usize,
    /// Number of stored embedding points.
    pub vector_points: usize,
}

/// Supported query/ingest languages.
#[derive(Debug, Serialize, ToSchema)]
pub struct LanguagesResponse {
    /// ISO 639-1 codes, in a stable order.
    pub languages: Vec<&'static str>,
}

/// Health probe fan-out over the adapters.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Health report", body = HealthResponse)),
    tag = "misc"
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let llm_runtime = state.llm.health().await.is_ok();
    let articles = state.lexical.count().await.unwrap_or(0);
    let vector_points = state.vector.count().await.unwrap_or(0);

    Ok(Json(HealthResponse {
        status: if llm_runtime { "ok" } else { "degraded" }.to_string(),
        llm_runtime,
        articles,
        vector_points,
    }))
}

/// The eight supported language codes.
#[utoipa::path(
    get,
    path = "/api/v1/languages",
    responses((status = 200, description = "Supported languages", body = LanguagesResponse)),
    tag = "misc"
)]
pub async fn languages() -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: Lang::all().iter().map(|lang| lang.as_str()).collect(),
    })
}
