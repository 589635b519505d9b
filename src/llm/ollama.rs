//! Ollama LLM client implementation.
//!
//! Connects to a local or remote Ollama server for chat generation,
//! token streaming, and embedding generation.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest},
    Ollama,
};

use crate::llm::client::{strict_prompt, ChunkStream, LlmClient};
use crate::types::{AppError, Result};

/// Ollama-backed [`LlmClient`].
///
/// One instance is shared by all sessions; `ollama_rs::Ollama` is an
/// HTTP-client wrapper and safe for concurrent use.
pub struct OllamaClient {
    client: Ollama,
    chat_model: String,
    embedding_model: String,
    dimensions: usize,
}

impl OllamaClient {
    /// Create a client for the given base URL and models.
    ///
    /// `dimensions` is the expected embedding width; responses of any other
    /// width are rejected as internal errors.
    pub fn new(
        base_url: &str,
        chat_model: String,
        embedding_model: String,
        dimensions: usize,
    ) -> Result<Self> {
        let (host, port) = normalize_base_url(base_url)?;
        Ok(Self {
            client: Ollama::new(host, port),
            chat_model,
            embedding_model,
            dimensions,
        })
    }
}

/// Normalize a configured URL into the (scheme+host, port) pair
/// `ollama_rs::Ollama::new` expects.
///
/// `Ollama::new` parses its host argument with reqwest's `IntoUrl`; a bare
/// "localhost" (no scheme) panics with `RelativeUrlWithoutBase`, so accept
/// forms like "http://localhost:11434", "localhost:11434", "localhost", and
/// "localhost:11434/api" (path ignored) and always emit an absolute URL.
fn normalize_base_url(base_url: &str) -> Result<(String, u16)> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "OLLAMA_URL is empty; expected something like http://localhost:11434".to_string(),
        ));
    }

    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);

    let host_port = without_scheme
        .split(&['/', '?', '#'][..])
        .next()
        .unwrap_or("localhost:11434");

    let (host, port) = if let Some(colon_idx) = host_port.rfind(':') {
        let h = &host_port[..colon_idx];
        let p = host_port[colon_idx + 1..].parse::<u16>().map_err(|_| {
            AppError::Validation(format!(
                "Invalid OLLAMA_URL port in '{}'; expected e.g. http://localhost:11434",
                base_url
            ))
        })?;
        (h.to_string(), p)
    } else {
        (host_port.to_string(), 11434)
    };

    Ok((format!("http://{}", host), port))
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let messages = vec![ChatMessage::user(strict_prompt(prompt))];
        let request = ChatMessageRequest::new(self.chat_model.clone(), messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }

    async fn stream(&self, prompt: &str) -> Result<ChunkStream> {
        let messages = vec![ChatMessage::user(strict_prompt(prompt))];
        let request = ChatMessageRequest::new(self.chat_model.clone(), messages);

        let mut stream_response = self
            .client
            .send_chat_messages_stream(request)
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Ollama stream error: {}", e)))?;

        let output_stream = stream! {
            while let Some(chunk_result) = stream_response.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let content = chunk.message.content;
                        if !content.is_empty() {
                            yield Ok(content);
                        }
                    }
                    Err(_) => {
                        yield Err(AppError::UpstreamUnavailable(
                            "Ollama stream chunk error".to_string(),
                        ));
                        break;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(output_stream)))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Ollama embeddings error: {}", e)))?;

        let embedding = response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Ollama returned no embedding".to_string()))?;

        if embedding.len() != self.dimensions {
            return Err(AppError::Internal(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    async fn health(&self) -> Result<()> {
        self.client
            .list_local_models()
            .await
            .map(|_| ())
            .map_err(|e| AppError::UpstreamUnavailable(format!("Ollama unreachable: {}", e)))
    }

    fn model_name(&self) -> &str {
        &self.chat_model
    }
}
