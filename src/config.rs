//! Environment-driven configuration.
//!
//! Every tuning knob has a default matching production behavior, so the
//! server starts with no configuration at all. A `.env` file is honored
//! when present.

use std::time::Duration;

use serde::Deserialize;

use crate::ingest::IngestConfig;
use crate::search::{FusionConfig, RelevanceConfig};

/// Embedding width. Fixed by the multilingual paraphrase model; both
/// stores and the LLM adapter validate against it.
pub const EMBEDDING_DIMENSIONS: usize = 768;

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address and port.
    pub server: ServerConfig,
    /// LLM runtime endpoint and model names.
    pub llm: LlmConfig,
    /// JWT settings.
    pub auth: AuthConfig,
    /// Fusion tuning.
    pub fusion: FusionConfig,
    /// Relevance-gate tuning.
    pub relevance: RelevanceConfig,
    /// Ingestion tuning.
    pub ingest: IngestConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

/// LLM runtime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL.
    pub ollama_url: String,
    /// Model used for generation (summaries, tags, relevance, answers).
    pub chat_model: String,
    /// Model used for embeddings; must produce 768-d vectors.
    pub embedding_model: String,
}

/// Authentication settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret.
    pub jwt_secret: String,
    /// Access-token validity in seconds.
    pub jwt_access_expiry: i64,
    /// Refresh-token validity in seconds.
    pub jwt_refresh_expiry: i64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        // A random secret keeps development servers working, but sessions
        // will not survive a restart.
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            use rand::Rng;
            let secret: String = rand::rng()
                .sample_iter(&rand::distr::Alphanumeric)
                .take(32)
                .map(char::from)
                .collect();
            tracing::warn!(
                "JWT_SECRET not set, using randomly generated secret (not suitable for production)"
            );
            secret
        });

        let fusion_defaults = FusionConfig::default();
        let relevance_defaults = RelevanceConfig::default();
        let ingest_defaults = IngestConfig::default();

        Self {
            server: ServerConfig {
                host: env_or("HOST", "127.0.0.1".to_string()),
                port: env_or("PORT", 8080),
            },
            llm: LlmConfig {
                ollama_url: env_or("OLLAMA_URL", "http://localhost:11434".to_string()),
                chat_model: env_or("CHAT_MODEL", "llama3.2".to_string()),
                embedding_model: env_or(
                    "EMBEDDING_MODEL",
                    "paraphrase-multilingual".to_string(),
                ),
            },
            auth: AuthConfig {
                jwt_secret,
                jwt_access_expiry: env_or("JWT_ACCESS_EXPIRY", 900),
                jwt_refresh_expiry: env_or("JWT_REFRESH_EXPIRY", 604800),
            },
            fusion: FusionConfig {
                vector_weight: env_or("FUSION_VECTOR_WEIGHT", fusion_defaults.vector_weight),
                lexical_weight: env_or("FUSION_LEXICAL_WEIGHT", fusion_defaults.lexical_weight),
                single_source_penalty: env_or(
                    "FUSION_SINGLE_SOURCE_PENALTY",
                    fusion_defaults.single_source_penalty,
                ),
                min_score: env_or("FUSION_MIN_SCORE", fusion_defaults.min_score),
                sigmoid_k: env_or("NORMALIZATION_SIGMOID_K", fusion_defaults.sigmoid_k),
                sigmoid_x0: env_or("NORMALIZATION_SIGMOID_X0", fusion_defaults.sigmoid_x0),
                title_boost: env_or("VECTOR_TITLE_BOOST", fusion_defaults.title_boost),
            },
            relevance: RelevanceConfig {
                threshold: env_or("RELEVANCE_THRESHOLD", relevance_defaults.threshold),
                weight: env_or("RELEVANCE_WEIGHT", relevance_defaults.weight),
            },
            ingest: IngestConfig {
                dedup_threshold: env_or(
                    "DEDUP_TITLE_THRESHOLD",
                    ingest_defaults.dedup_threshold,
                ),
                summary_timeout: env_secs("TIMEOUT_SUMMARY_SECS", ingest_defaults.summary_timeout),
                tags_timeout: env_secs("TIMEOUT_TAGS_SECS", ingest_defaults.tags_timeout),
                embedding_timeout: env_secs(
                    "TIMEOUT_EMBEDDING_SECS",
                    ingest_defaults.embedding_timeout,
                ),
                bulk_item_timeout: env_secs(
                    "TIMEOUT_BULK_ITEM_SECS",
                    ingest_defaults.bulk_item_timeout,
                ),
                bulk_max_concurrent: env_or(
                    "BULK_MAX_CONCURRENT",
                    ingest_defaults.bulk_max_concurrent,
                ),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            llm: LlmConfig {
                ollama_url: "http://localhost:11434".to_string(),
                chat_model: "llama3.2".to_string(),
                embedding_model: "paraphrase-multilingual".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "development-secret-change-in-production".to_string(),
                jwt_access_expiry: 900,
                jwt_refresh_expiry: 604800,
            },
            fusion: FusionConfig::default(),
            relevance: RelevanceConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_values() {
        let config = Config::default();
        assert_eq!(config.fusion.vector_weight, 0.6);
        assert_eq!(config.fusion.lexical_weight, 0.4);
        assert_eq!(config.fusion.single_source_penalty, 0.75);
        assert_eq!(config.fusion.min_score, 0.35);
        assert_eq!(config.fusion.sigmoid_k, 0.65);
        assert_eq!(config.fusion.sigmoid_x0, 20.0);
        assert_eq!(config.fusion.title_boost, 1.2);
        assert_eq!(config.ingest.dedup_threshold, 0.95);
        assert_eq!(config.relevance.threshold, 5.0);
        assert_eq!(config.relevance.weight, 0.3);
        assert_eq!(config.ingest.bulk_max_concurrent, 1);
        assert_eq!(config.ingest.summary_timeout, Duration::from_secs(180));
        assert_eq!(config.ingest.tags_timeout, Duration::from_secs(180));
        assert_eq!(config.ingest.embedding_timeout, Duration::from_secs(120));
        assert_eq!(config.ingest.bulk_item_timeout, Duration::from_secs(600));
        assert_eq!(EMBEDDING_DIMENSIONS, 768);
    }
}
