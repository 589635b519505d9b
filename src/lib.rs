//! # Librarium - retrieval-augmented article QA server
//!
//! Librarium answers natural-language questions over a corpus of
//! user-contributed articles. A query in any of eight languages fans out
//! to parallel vector and BM25 searches, the two rankings are fused and
//! relevance-gated, and an LLM streams an answer grounded in the surviving
//! sources over a WebSocket session.
//!
//! ## Subsystems
//!
//! - [`ingest`] - the eight-step article ingestion pipeline with duplicate
//!   suppression, progress reporting, and bounded-concurrency bulk mode
//! - [`search`] - hybrid retrieval: score fusion and the LLM relevance gate
//! - [`answer`] - language-keyed prompt assembly and answer streaming
//! - [`api`] - the REST and WebSocket surface under `/api/v1`
//! - [`store`] - lexical (BM25) and vector store adapters
//! - [`llm`] - the LLM runtime adapter (Ollama)
//! - [`lang`] - deterministic eight-language detection
//!
//! ## Quick start (library usage)
//!
//! ```rust,ignore
//! use librarium::{app, AppState, Config};
//! use librarium::llm::OllamaClient;
//! use librarium::store::{InMemoryLexicalStore, InMemoryVectorStore};
//! use std::sync::Arc;
//!
//! let config = Config::from_env();
//! let llm = Arc::new(OllamaClient::new(
//!     &config.llm.ollama_url,
//!     config.llm.chat_model.clone(),
//!     config.llm.embedding_model.clone(),
//!     librarium::config::EMBEDDING_DIMENSIONS,
//! )?);
//! let state = AppState::new(
//!     config,
//!     llm,
//!     Arc::new(InMemoryLexicalStore::new()),
//!     Arc::new(InMemoryVectorStore::new(librarium::config::EMBEDDING_DIMENSIONS)),
//! );
//! let router = app(state);
//! ```
//!
//! Every adapter is a trait held as `Arc<dyn ...>`, so tests swap in
//! scripted LLMs and fresh stores without touching the wiring.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Answer composition and streaming.
pub mod answer;
/// HTTP API handlers and routes.
pub mod api;
/// JWT authentication.
pub mod auth;
/// Environment-driven configuration.
pub mod config;
/// Article ingestion pipeline.
pub mod ingest;
/// Language detection.
pub mod lang;
/// LLM runtime adapters.
pub mod llm;
/// Hybrid retrieval engine.
pub mod search;
/// Backing-store adapters.
pub mod store;
/// Core types (records, events, errors).
pub mod types;

// Re-export commonly used types
pub use answer::AnswerComposer;
pub use config::Config;
pub use ingest::IngestPipeline;
pub use lang::Lang;
pub use llm::{LlmClient, OllamaClient};
pub use search::SearchService;
pub use store::{InMemoryLexicalStore, InMemoryVectorStore, LexicalStore, VectorStore};
pub use types::{AppError, Result};

use std::sync::Arc;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{AuthService, UserRegistry};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,
    /// LLM runtime adapter.
    pub llm: Arc<dyn LlmClient>,
    /// Lexical store adapter (authoritative article records).
    pub lexical: Arc<dyn LexicalStore>,
    /// Vector store adapter (derived embeddings).
    pub vector: Arc<dyn VectorStore>,
    /// Hybrid retrieval engine.
    pub search: Arc<SearchService>,
    /// Ingestion pipeline.
    pub ingest: Arc<IngestPipeline>,
    /// Answer composer.
    pub composer: Arc<AnswerComposer>,
    /// JWT service.
    pub auth: Arc<AuthService>,
    /// User and refresh-session registry.
    pub users: Arc<UserRegistry>,
}

impl AppState {
    /// Wire the application from its adapters.
    pub fn new(
        config: Config,
        llm: Arc<dyn LlmClient>,
        lexical: Arc<dyn LexicalStore>,
        vector: Arc<dyn VectorStore>,
    ) -> Self {
        let search = Arc::new(SearchService::new(
            Arc::clone(&llm),
            Arc::clone(&lexical),
            Arc::clone(&vector),
            config.fusion,
            config.relevance,
        ));
        let ingest = Arc::new(IngestPipeline::new(
            Arc::clone(&llm),
            Arc::clone(&lexical),
            Arc::clone(&vector),
            config.ingest,
        ));
        let composer = Arc::new(AnswerComposer::new(Arc::clone(&llm)));
        let auth = Arc::new(AuthService::new(
            config.auth.jwt_secret.clone(),
            config.auth.jwt_access_expiry,
            config.auth.jwt_refresh_expiry,
        ));

        Self {
            config: Arc::new(config),
            llm,
            lexical,
            vector,
            search,
            ingest,
            composer,
            auth,
            users: Arc::new(UserRegistry::new()),
        }
    }
}

/// Build the full application router with middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api::routes::create_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
