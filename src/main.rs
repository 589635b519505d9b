//! Librarium server binary.
//!
//! Wires the Ollama runtime and the in-memory stores into the application
//! and serves the API. For library usage, import from the `librarium`
//! crate instead.

use std::sync::Arc;

use librarium::config::EMBEDDING_DIMENSIONS;
use librarium::llm::OllamaClient;
use librarium::store::{InMemoryLexicalStore, InMemoryVectorStore};
use librarium::{app, AppState, Config, LlmClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Librarium");

    let config = Config::from_env();

    let llm = Arc::new(OllamaClient::new(
        &config.llm.ollama_url,
        config.llm.chat_model.clone(),
        config.llm.embedding_model.clone(),
        EMBEDDING_DIMENSIONS,
    )?);
    tracing::info!(
        ollama_url = %config.llm.ollama_url,
        chat_model = %config.llm.chat_model,
        embedding_model = %config.llm.embedding_model,
        "LLM runtime configured"
    );

    let lexical = Arc::new(InMemoryLexicalStore::new());
    let vector = Arc::new(InMemoryVectorStore::new(EMBEDDING_DIMENSIONS));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, llm, lexical, vector);

    if state.llm.health().await.is_err() {
        tracing::warn!("LLM runtime is not reachable; ingestion and answering will fail until it is");
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
