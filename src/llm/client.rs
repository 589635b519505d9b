//! LLM client abstraction.
//!
//! All generation goes through [`LlmClient`], which the rest of the system
//! holds as `Arc<dyn LlmClient>`. Implementations must be safe for
//! concurrent use; the server shares one client across all sessions.

use async_trait::async_trait;
use futures::Stream;

use crate::types::Result;

/// Instruction prepended to every generation prompt.
///
/// The runtime must emit only the requested content: no preambles, no
/// "Here is...", no meta-commentary about the task. Summaries, tag lists,
/// relevance scores and answers are all parsed or forwarded verbatim, so
/// commentary would corrupt downstream consumers.
pub const STRICT_OUTPUT_PREAMBLE: &str = "You must output only the requested content. \
Do not add explanations, preambles, meta-commentary, or any text that was not asked for.";

/// Wrap a prompt with the strict-output preamble.
pub fn strict_prompt(prompt: &str) -> String {
    format!("{}\n\n{}", STRICT_OUTPUT_PREAMBLE, prompt)
}

/// A boxed, pinned chunk stream as returned by [`LlmClient::stream`].
pub type ChunkStream = Box<dyn Stream<Item = Result<String>> + Send + Unpin>;

/// Unified interface to the LLM runtime.
///
/// Implementations wrap every generation prompt with
/// [`STRICT_OUTPUT_PREAMBLE`] before dispatch.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for a prompt and return the full text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate a completion, yielding incremental chunks in order.
    ///
    /// The stream ends when generation completes or the consumer drops it;
    /// dropping the stream abandons the in-flight call.
    async fn stream(&self, prompt: &str) -> Result<ChunkStream>;

    /// Produce a dense embedding for a text fragment.
    ///
    /// Callers pass retrieval prefixes (`"query: "`, `"passage: "`)
    /// themselves; the client embeds the text as given.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Probe whether the runtime is reachable.
    async fn health(&self) -> Result<()>;

    /// The generation model identifier.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_prompt_prepends_preamble() {
        let wrapped = strict_prompt("Summarize this article.");
        assert!(wrapped.starts_with(STRICT_OUTPUT_PREAMBLE));
        assert!(wrapped.ends_with("Summarize this article."));
    }
}
