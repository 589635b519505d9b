//! LLM runtime adapters.
//!
//! The core consumes the LLM runtime through the [`LlmClient`] trait:
//! one-shot generation, token-streamed generation, embedding generation,
//! and a health probe. The one concrete implementation talks to Ollama;
//! tests swap in scripted mocks.

/// The `LlmClient` trait and prompt preamble handling.
pub mod client;
/// Ollama-backed implementation of [`LlmClient`].
pub mod ollama;

pub use client::{strict_prompt, LlmClient, STRICT_OUTPUT_PREAMBLE};
pub use ollama::OllamaClient;
