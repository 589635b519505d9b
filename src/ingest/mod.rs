//! Article ingestion pipeline.
//!
//! Ingestion turns a raw submission into four persisted artifacts: the
//! article record in the lexical store, the full-text index entry that
//! comes with it, and the title and summary embeddings in the vector
//! store. The pipeline runs eight ordered steps and reports progress
//! before each one; bulk ingestion runs items through the same pipeline
//! with bounded concurrency and returns results in input order.
//!
//! Failure semantics per step:
//! - duplicate probe: non-fatal, logged, skipped on error
//! - summary / tags / embeddings: fatal, with per-call timeouts
//! - lexical write: fatal (critical path)
//! - vector writes: fatal, but the already-written lexical record is left
//!   in place; the article stays keyword-findable until an external
//!   reconciler re-embeds it

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;

use crate::lang;
use crate::llm::LlmClient;
use crate::store::{
    article_id_of_point, summary_point_id, title_point_id, LexicalStore, VectorStore,
};
use crate::types::{
    AddArticleRequest, AppError, Article, BulkIngestResponse, BulkItemResult, IngestAck,
    ProgressUpdate, Result,
};

/// Number of pipeline steps reported through the progress callback.
pub const PIPELINE_STEPS: usize = 8;

/// Dedup probe fan-out: how many nearest title neighbors to examine.
const DEDUP_PROBE_K: usize = 5;

/// Tuning knobs for ingestion. Defaults are the production values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Cosine threshold above which a title neighbor counts as a duplicate.
    pub dedup_threshold: f32,
    /// Budget for the summary generation call.
    pub summary_timeout: Duration,
    /// Budget for the tag generation call.
    pub tags_timeout: Duration,
    /// Budget for each embedding call.
    pub embedding_timeout: Duration,
    /// Hard budget for one item inside a bulk ingest.
    pub bulk_item_timeout: Duration,
    /// Articles processed concurrently during bulk ingest. The default of 1
    /// keeps the LLM runtime from being overloaded.
    pub bulk_max_concurrent: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: 0.95,
            summary_timeout: Duration::from_secs(180),
            tags_timeout: Duration::from_secs(180),
            embedding_timeout: Duration::from_secs(120),
            bulk_item_timeout: Duration::from_secs(600),
            bulk_max_concurrent: 1,
        }
    }
}

/// Progress sink for a running ingest.
///
/// The pipeline sends one update before each step. A closed channel means
/// the session is gone (client disconnect), which is the one callback
/// failure that aborts ingestion.
pub type ProgressSink = UnboundedSender<ProgressUpdate>;

/// The ingestion pipeline. One instance is shared across all sessions;
/// the embedded semaphore throttles bulk work globally.
pub struct IngestPipeline {
    llm: Arc<dyn LlmClient>,
    lexical: Arc<dyn LexicalStore>,
    vector: Arc<dyn VectorStore>,
    config: IngestConfig,
    bulk_limiter: Semaphore,
}

impl IngestPipeline {
    /// Wire a pipeline from its collaborators.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        lexical: Arc<dyn LexicalStore>,
        vector: Arc<dyn VectorStore>,
        config: IngestConfig,
    ) -> Self {
        let permits = config.bulk_max_concurrent.max(1);
        Self {
            llm,
            lexical,
            vector,
            config,
            bulk_limiter: Semaphore::new(permits),
        }
    }

    /// Register one article, reporting progress before each step.
    ///
    /// Returns the assigned id, or the existing id with a "Duplicate..."
    /// message when the title probe finds a near-identical article.
    pub async fn ingest(
        &self,
        request: AddArticleRequest,
        registrar: &str,
        progress: Option<&ProgressSink>,
    ) -> Result<IngestAck> {
        if request.title.trim().is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        if request.content.trim().is_empty() {
            return Err(AppError::Validation(
                "Content must not be empty".to_string(),
            ));
        }

        // Step 1: duplicate probe. Never blocks ingestion on failure.
        report(progress, "duplicate_check", 1)?;
        if let Some(existing_id) = self.probe_duplicate(&request.title).await {
            tracing::info!(article_id = %existing_id, "Duplicate title detected, suppressing ingest");
            return Ok(IngestAck {
                id: existing_id,
                message: "Duplicate article detected; returning existing id".to_string(),
            });
        }

        // Step 2: language detection, with the English fallback built in.
        report(progress, "language_detection", 2)?;
        let detected_lang = lang::detect(&request.content);

        // Step 3: summary generation (fatal on failure).
        report(progress, "summary_generation", 3)?;
        let summary = with_timeout(
            self.config.summary_timeout,
            "Summary generation",
            self.llm.generate(&summary_prompt(&request.content)),
        )
        .await?;

        // Step 4: tag generation (fatal on failure).
        report(progress, "tag_generation", 4)?;
        let tags_response = with_timeout(
            self.config.tags_timeout,
            "Tag generation",
            self.llm.generate(&tags_prompt(&request.content)),
        )
        .await?;
        let tags = parse_tags(&tags_response);

        // Step 5: title and summary embeddings (fatal on failure).
        report(progress, "embedding_generation", 5)?;
        let title_passage = format!("passage: {}", request.title);
        let summary_passage = format!("passage: {}", summary);
        let (title_embedding, summary_embedding) = tokio::try_join!(
            with_timeout(
                self.config.embedding_timeout,
                "Title embedding",
                self.llm.embed(&title_passage),
            ),
            with_timeout(
                self.config.embedding_timeout,
                "Summary embedding",
                self.llm.embed(&summary_passage),
            ),
        )?;

        // Step 6: creation date validation.
        report(progress, "date_validation", 6)?;
        let created_date = validate_created_date(request.created_date.as_deref())?;

        // Step 7: lexical write; the store assigns the authoritative id.
        report(progress, "index_document", 7)?;
        let article = Article {
            id: String::new(),
            lang: detected_lang,
            title: request.title.trim().to_string(),
            author: request.author,
            summary,
            content: request.content,
            tags,
            original_url: request.original_url,
            created_date,
            registrar: registrar.to_string(),
        };
        let id = self.lexical.index(&article).await?;

        // Step 8: vector writes. A failure here leaves the lexical record
        // orphaned; it stays keyword-findable and is logged for the
        // external reconciler to re-embed.
        report(progress, "store_embeddings", 8)?;
        let write = async {
            self.vector
                .upsert(&title_point_id(&id), title_embedding, detected_lang)
                .await?;
            self.vector
                .upsert(&summary_point_id(&id), summary_embedding, detected_lang)
                .await
        };
        if let Err(e) = write.await {
            tracing::error!(
                article_id = %id,
                error = %e,
                "Vector write failed after lexical write; article lacks embeddings"
            );
            return Err(e);
        }

        tracing::info!(
            article_id = %id,
            lang = %detected_lang,
            registrar = %registrar,
            "Article ingested"
        );
        Ok(IngestAck {
            id,
            message: "Article registered".to_string(),
        })
    }

    /// Register a batch of articles with bounded concurrency.
    ///
    /// `results` is ordered by input index regardless of completion order.
    /// The optional sink receives one update per completed item.
    pub async fn ingest_bulk(
        &self,
        requests: Vec<AddArticleRequest>,
        registrar: &str,
        progress: Option<&ProgressSink>,
    ) -> BulkIngestResponse {
        let total = requests.len();
        let completed = AtomicUsize::new(0);

        let mut results: Vec<BulkItemResult> = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| {
                let completed = &completed;
                async move {
                    let title = request.title.clone();
                    let result = self.ingest_bulk_item(request, registrar).await;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(sink) = progress {
                        let _ = sink.send(ProgressUpdate::new(title.clone(), done, total));
                    }

                    match result {
                        Ok(ack) => BulkItemResult {
                            index,
                            title,
                            success: true,
                            id: Some(ack.id),
                            error: None,
                        },
                        Err(e) => BulkItemResult {
                            index,
                            title,
                            success: false,
                            id: None,
                            error: Some(e.to_string()),
                        },
                    }
                }
            })
            .buffer_unordered(self.config.bulk_max_concurrent.max(1))
            .collect()
            .await;

        results.sort_by_key(|item| item.index);
        let success_count = results.iter().filter(|r| r.success).count();
        let error_count = results.len() - success_count;

        tracing::info!(total, success_count, error_count, "Bulk ingest finished");
        BulkIngestResponse {
            results,
            success_count,
            error_count,
        }
    }

    async fn ingest_bulk_item(
        &self,
        request: AddArticleRequest,
        registrar: &str,
    ) -> Result<IngestAck> {
        let _permit = self
            .bulk_limiter
            .acquire()
            .await
            .map_err(|_| AppError::Internal("Bulk limiter closed".to_string()))?;

        // The per-item budget covers the pipeline work, not the queue wait
        // behind the limiter.
        with_timeout(
            self.config.bulk_item_timeout,
            "Bulk item ingestion",
            self.ingest(request, registrar, None),
        )
        .await
    }

    /// Probe the vector store for an existing article with a near-identical
    /// title. Returns the existing article id on a hit. Any failure is
    /// logged and treated as "no duplicate" so ingestion proceeds.
    async fn probe_duplicate(&self, title: &str) -> Option<String> {
        let probe = async {
            let embedding = with_timeout(
                self.config.embedding_timeout,
                "Duplicate probe embedding",
                self.llm.embed(&format!("passage: {}", title)),
            )
            .await?;
            self.vector.search(&embedding, DEDUP_PROBE_K, None).await
        };

        match probe.await {
            Ok(hits) => hits
                .into_iter()
                .find(|hit| hit.score > self.config.dedup_threshold)
                .and_then(|hit| article_id_of_point(&hit.point_id).map(String::from)),
            Err(e) => {
                tracing::warn!(error = %e, "Duplicate probe failed; continuing without dedup");
                None
            }
        }
    }
}

/// Send a progress update for the step about to run.
///
/// A closed sink means the client is gone; that is the only callback
/// failure that aborts the pipeline.
fn report(progress: Option<&ProgressSink>, step: &str, index: usize) -> Result<()> {
    if let Some(sink) = progress {
        if sink
            .send(ProgressUpdate::new(step, index, PIPELINE_STEPS))
            .is_err()
        {
            return Err(AppError::Timeout(
                "Ingestion canceled: progress consumer disconnected".to_string(),
            ));
        }
    }
    Ok(())
}

async fn with_timeout<T>(
    budget: Duration,
    label: &str,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(budget, operation)
        .await
        .map_err(|_| AppError::Timeout(format!("{} exceeded {:?}", label, budget)))?
}

/// Language-agnostic summarization prompt: structure-preserving English
/// output, bounded length.
fn summary_prompt(content: &str) -> String {
    format!(
        "Summarize the following article in English in at most 8000 characters. \
         Preserve the structure of the original (sections, lists, ordering of ideas). \
         The article may be in any language.\n\n{}",
        content
    )
}

/// Keyword-extraction prompt returning a comma-separated list.
fn tags_prompt(content: &str) -> String {
    format!(
        "Extract between 3 and 8 topical keywords from the following article. \
         Respond with a single comma-separated list of keywords and nothing else.\n\n{}",
        content
    )
}

/// Split a tag response on commas, trimming whitespace and dropping empty
/// entries. A response without commas yields a single tag.
fn parse_tags(response: &str) -> Vec<String> {
    response
        .split(',')
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Validate an optional RFC-3339 creation date.
///
/// Rejects timestamps more than one minute in the future, warns on
/// timestamps more than ten years old, and defaults to the current wall
/// clock when absent.
fn validate_created_date(raw: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(raw) = raw else {
        return Ok(Utc::now());
    };

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| AppError::Validation(format!("Invalid created_date '{}': {}", raw, e)))?
        .with_timezone(&Utc);

    let now = Utc::now();
    if parsed > now + ChronoDuration::minutes(1) {
        return Err(AppError::Validation(format!(
            "created_date '{}' is more than one minute in the future",
            raw
        )));
    }
    if parsed < now - ChronoDuration::days(365 * 10) {
        tracing::warn!(created_date = %raw, "created_date is more than ten years old");
    }
    Ok(parsed)
}
