//! Mock implementations for testing.
//!
//! Provides a scripted LLM client and state-wiring helpers shared across
//! the integration test files. The mock routes by prompt shape (summary /
//! tags / relevance / answer) instead of call order, so tests stay robust
//! when a code path adds or drops a call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use librarium::config::EMBEDDING_DIMENSIONS;
use librarium::llm::client::ChunkStream;
use librarium::llm::LlmClient;
use librarium::store::{InMemoryLexicalStore, InMemoryVectorStore};
use librarium::types::{AppError, Result};
use librarium::{AppState, Config};

/// A deterministic unit vector along one axis, for controllable cosine
/// geometry in tests.
pub fn axis_vec(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIMENSIONS];
    v[axis % EMBEDDING_DIMENSIONS] = 1.0;
    v
}

/// A vector between two axes: `cos(angle)` toward `a`, `sin(angle)`
/// toward `b`. Cosine similarity against `axis_vec(a)` is `cos(angle)`.
pub fn angled_vec(a: usize, b: usize, cos_a: f32) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIMENSIONS];
    v[a % EMBEDDING_DIMENSIONS] = cos_a;
    v[b % EMBEDDING_DIMENSIONS] = (1.0 - cos_a * cos_a).sqrt();
    v
}

/// Deterministic fallback embedding derived from the text bytes. The same
/// text always maps to the same unit vector, so re-embedding a title
/// yields cosine 1.0 against its stored point.
fn hashed_vec(text: &str) -> Vec<f32> {
    let mut hash: u64 = 1469598103934665603;
    for byte in text.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    axis_vec((hash % EMBEDDING_DIMENSIONS as u64) as usize)
}

/// Scripted LLM client.
///
/// Generation is routed by prompt shape; embeddings come from a seeded
/// text → vector map with a deterministic hashed fallback.
pub struct MockLlm {
    summary_response: String,
    tags_response: String,
    /// `None` makes relevance scoring fail, which exercises the gate's
    /// fail-open path and leaves fused scores untouched.
    relevance_response: Option<String>,
    answer_chunks: Vec<String>,
    embeddings: Mutex<HashMap<String, Vec<f32>>>,
    fail_generate: bool,
    fail_embed: bool,
    fail_stream: bool,
    generate_calls: Mutex<Vec<String>>,
    stream_calls: Mutex<Vec<String>>,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            summary_response: "Generated summary".to_string(),
            tags_response: "alpha, beta".to_string(),
            relevance_response: None,
            answer_chunks: vec!["Answer ".to_string(), "text".to_string()],
            embeddings: Mutex::new(HashMap::new()),
            fail_generate: false,
            fail_embed: false,
            fail_stream: false,
            generate_calls: Mutex::new(Vec::new()),
            stream_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary_response = summary.to_string();
        self
    }

    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags_response = tags.to_string();
        self
    }

    pub fn with_relevance(mut self, response: &str) -> Self {
        self.relevance_response = Some(response.to_string());
        self
    }

    pub fn with_answer_chunks(mut self, chunks: &[&str]) -> Self {
        self.answer_chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Seed an exact-text embedding.
    pub fn with_embedding(self, text: &str, vector: Vec<f32>) -> Self {
        self.embeddings
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
        self
    }

    pub fn failing_generate(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    pub fn failing_embed(mut self) -> Self {
        self.fail_embed = true;
        self
    }

    pub fn failing_stream(mut self) -> Self {
        self.fail_stream = true;
        self
    }

    /// Prompts seen by `generate`, in call order.
    pub fn generate_calls(&self) -> Vec<String> {
        self.generate_calls.lock().unwrap().clone()
    }

    /// Prompts seen by `stream`, in call order.
    pub fn stream_calls(&self) -> Vec<String> {
        self.stream_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_calls.lock().unwrap().push(prompt.to_string());

        if self.fail_generate {
            return Err(AppError::UpstreamUnavailable(
                "Mock LLM failure".to_string(),
            ));
        }

        if prompt.contains("Summarize") {
            Ok(self.summary_response.clone())
        } else if prompt.contains("keywords") {
            Ok(self.tags_response.clone())
        } else if prompt.contains("Document1") || prompt.contains("relevant") {
            self.relevance_response.clone().ok_or_else(|| {
                AppError::UpstreamUnavailable("Mock relevance unavailable".to_string())
            })
        } else {
            Ok("Mock response".to_string())
        }
    }

    async fn stream(&self, prompt: &str) -> Result<ChunkStream> {
        self.stream_calls.lock().unwrap().push(prompt.to_string());

        if self.fail_stream {
            return Err(AppError::UpstreamUnavailable(
                "Mock stream failure".to_string(),
            ));
        }
        let chunks: Vec<Result<String>> = self.answer_chunks.iter().cloned().map(Ok).collect();
        Ok(Box::new(Box::pin(stream::iter(chunks))))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail_embed {
            return Err(AppError::UpstreamUnavailable(
                "Mock embed failure".to_string(),
            ));
        }
        let seeded = self.embeddings.lock().unwrap().get(text).cloned();
        Ok(seeded.unwrap_or_else(|| hashed_vec(text)))
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// Wire an `AppState` around a mock LLM and fresh in-memory stores.
pub fn test_state(llm: Arc<MockLlm>) -> AppState {
    AppState::new(
        Config::default(),
        llm,
        Arc::new(InMemoryLexicalStore::new()),
        Arc::new(InMemoryVectorStore::new(EMBEDDING_DIMENSIONS)),
    )
}
