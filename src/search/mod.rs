//! Hybrid retrieval engine.
//!
//! A query fans out to the vector and lexical stores in parallel, the two
//! hit sets are fused into one ranking, and an LLM relevance gate prunes
//! weak candidates. Submodules:
//!
//! - [`fusion`] - score-space fusion and quality gating
//! - [`relevance`] - LLM relevance scoring with fail-open semantics

/// Score fusion and quality gating.
pub mod fusion;
/// LLM relevance gate.
pub mod relevance;

use std::sync::Arc;

use crate::lang::{self, Lang};
use crate::llm::LlmClient;
use crate::store::{LexicalStore, VectorStore};
use crate::types::{AppError, Article, HitSource, Result, SourceDoc};

pub use fusion::{FusedHit, FusionConfig};
pub use relevance::{RelevanceConfig, RelevanceGate};

/// A retrieval candidate: the hydrated article plus its fused score.
#[derive(Debug, Clone)]
pub struct RankedArticle {
    /// The full article record.
    pub article: Article,
    /// Fused (and possibly relevance-adjusted) score in [0, 1].
    pub score: f32,
    /// Which retrieval signal(s) produced the hit.
    pub source: HitSource,
}

impl From<RankedArticle> for SourceDoc {
    fn from(ranked: RankedArticle) -> Self {
        SourceDoc {
            id: ranked.article.id,
            title: ranked.article.title,
            summary: ranked.article.summary,
            lang: ranked.article.lang,
            author: ranked.article.author,
            original_url: ranked.article.original_url,
            score: ranked.score,
            source: ranked.source,
        }
    }
}

/// Outcome of a retrieval: the detected query language and the surviving
/// sources in rank order.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Language detected from the query text.
    pub query_lang: Lang,
    /// Fused, gated, relevance-adjusted sources.
    pub sources: Vec<RankedArticle>,
}

/// The retrieval engine. One instance is shared across all sessions.
pub struct SearchService {
    llm: Arc<dyn LlmClient>,
    lexical: Arc<dyn LexicalStore>,
    vector: Arc<dyn VectorStore>,
    fusion: FusionConfig,
    gate: RelevanceGate,
}

impl SearchService {
    /// Wire a retrieval engine from its collaborators.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        lexical: Arc<dyn LexicalStore>,
        vector: Arc<dyn VectorStore>,
        fusion: FusionConfig,
        relevance: RelevanceConfig,
    ) -> Self {
        let gate = RelevanceGate::new(Arc::clone(&llm), relevance);
        Self {
            llm,
            lexical,
            vector,
            fusion,
            gate,
        }
    }

    /// Run the full hybrid retrieval for a query.
    ///
    /// Either search leg may fail without taking the query down: the other
    /// leg's results are fused alone and the failure is logged. Only when
    /// both legs fail does retrieval abort.
    pub async fn retrieve(
        &self,
        query: &str,
        limit: usize,
        lang_filter: Option<Lang>,
    ) -> Result<Retrieval> {
        if query.trim().is_empty() {
            return Err(AppError::Validation("Query must not be empty".to_string()));
        }
        let query_lang = lang::detect(query);

        // Over-fetch both legs: vector points collapse 2-per-article and
        // fusion retains 2N articles before the gate.
        let vector_k = limit * 4;
        let lexical_k = limit * 2;

        let (vector_leg, lexical_leg) = tokio::join!(
            self.vector_leg(query, vector_k, lang_filter),
            self.lexical_leg(query, lexical_k),
        );

        let (vector_hits, lexical_hits) = match (vector_leg, lexical_leg) {
            (Err(v), Err(l)) => {
                return Err(AppError::UpstreamUnavailable(format!(
                    "Both search legs failed: vector: {}; lexical: {}",
                    v, l
                )));
            }
            (vector, lexical) => (
                vector.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Vector leg failed; continuing lexical-only");
                    Vec::new()
                }),
                lexical.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Lexical leg failed; continuing vector-only");
                    Vec::new()
                }),
            ),
        };

        let collapsed = fusion::collapse_vector_hits(&vector_hits, limit, &self.fusion);
        let fused = fusion::fuse(&collapsed, &lexical_hits, limit, &self.fusion);

        let candidates = self.hydrate(fused).await?;
        let sources = self.gate.filter(query, query_lang, candidates).await;

        Ok(Retrieval {
            query_lang,
            sources,
        })
    }

    /// Lexical-only search, normalized into [0, 1] for a uniform surface.
    pub async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<RankedArticle>> {
        if query.trim().is_empty() {
            return Err(AppError::Validation("Query must not be empty".to_string()));
        }
        let hits = self.lexical.search(query, limit).await?;
        let fused: Vec<FusedHit> = hits
            .iter()
            .map(|hit| FusedHit {
                id: hit.id.clone(),
                score: fusion::normalize_bm25(hit.score, &self.fusion),
                source: HitSource::Keyword,
            })
            .collect();
        self.hydrate(fused).await
    }

    async fn vector_leg(
        &self,
        query: &str,
        k: usize,
        lang_filter: Option<Lang>,
    ) -> Result<Vec<crate::store::VectorHit>> {
        let embedding = self.llm.embed(&format!("query: {}", query)).await?;
        self.vector.search(&embedding, k, lang_filter).await
    }

    async fn lexical_leg(&self, query: &str, k: usize) -> Result<Vec<crate::store::LexicalHit>> {
        self.lexical.search(query, k).await
    }

    /// Fetch the article records behind fused hits, preserving rank order.
    /// Hits whose article vanished between search and hydration are
    /// dropped.
    async fn hydrate(&self, fused: Vec<FusedHit>) -> Result<Vec<RankedArticle>> {
        let ids: Vec<String> = fused.iter().map(|hit| hit.id.clone()).collect();
        let articles = self.lexical.get_many(&ids).await?;

        let by_id: std::collections::HashMap<String, Article> = articles
            .into_iter()
            .map(|article| (article.id.clone(), article))
            .collect();

        Ok(fused
            .into_iter()
            .filter_map(|hit| {
                by_id.get(&hit.id).cloned().map(|article| RankedArticle {
                    article,
                    score: hit.score,
                    source: hit.source,
                })
            })
            .collect())
    }
}
