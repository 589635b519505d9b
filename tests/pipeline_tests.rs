//! Integration tests for the ingestion pipeline.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use common::mocks::{test_state, MockLlm};
use librarium::config::EMBEDDING_DIMENSIONS;
use librarium::ingest::{IngestConfig, IngestPipeline, PIPELINE_STEPS};
use librarium::lang::Lang;
use librarium::store::{
    InMemoryLexicalStore, InMemoryVectorStore, LexicalStore, VectorHit, VectorStore,
};
use librarium::types::{AddArticleRequest, AppError, Result};

fn request(title: &str, content: &str) -> AddArticleRequest {
    AddArticleRequest {
        title: title.to_string(),
        content: content.to_string(),
        author: None,
        original_url: None,
        created_date: None,
    }
}

#[tokio::test]
async fn test_ingest_roundtrip() {
    let llm = Arc::new(MockLlm::new().with_summary("A primer summary").with_tags("marketing, ads"));
    let state = test_state(llm);

    let mut req = request("Perf Marketing Primer", "Performance marketing is paying for results.");
    req.author = Some("Kim".to_string());
    req.original_url = Some("https://example.com/primer".to_string());

    let ack = state.ingest.ingest(req, "u1", None).await.unwrap();
    assert!(!ack.is_duplicate());

    let article = state.lexical.get(&ack.id).await.unwrap().unwrap();
    assert_eq!(article.title, "Perf Marketing Primer");
    assert_eq!(article.content, "Performance marketing is paying for results.");
    assert_eq!(article.author.as_deref(), Some("Kim"));
    assert_eq!(article.original_url.as_deref(), Some("https://example.com/primer"));
    assert_eq!(article.registrar, "u1");
    assert_eq!(article.summary, "A primer summary");
    assert_eq!(article.tags, vec!["marketing", "ads"]);
    assert_eq!(article.lang, Lang::En);

    // Exactly two vector points, title and summary.
    assert_eq!(state.vector.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_progress_reports_all_steps_in_order() {
    let state = test_state(Arc::new(MockLlm::new()));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    state
        .ingest
        .ingest(request("Title", "Content"), "u1", Some(&tx))
        .await
        .unwrap();
    drop(tx);

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    assert_eq!(updates.len(), PIPELINE_STEPS);
    let steps: Vec<&str> = updates.iter().map(|u| u.step.as_str()).collect();
    assert_eq!(
        steps,
        vec![
            "duplicate_check",
            "language_detection",
            "summary_generation",
            "tag_generation",
            "embedding_generation",
            "date_validation",
            "index_document",
            "store_embeddings",
        ]
    );
    for (i, update) in updates.iter().enumerate() {
        assert_eq!(update.progress, i + 1);
        assert_eq!(update.total, PIPELINE_STEPS);
    }
    assert!((updates[7].percent - 100.0).abs() < 0.01);
}

#[tokio::test]
async fn test_duplicate_title_suppressed() {
    let state = test_state(Arc::new(MockLlm::new()));

    let first = state
        .ingest
        .ingest(request("X", "y"), "u1", None)
        .await
        .unwrap();
    let points_before = state.vector.count().await.unwrap();

    let second = state
        .ingest
        .ingest(request("X", "y"), "u1", None)
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert!(second.message.starts_with("Duplicate"));
    // No new lexical record and no new vector points.
    assert_eq!(state.lexical.count().await.unwrap(), 1);
    assert_eq!(state.vector.count().await.unwrap(), points_before);
}

#[tokio::test]
async fn test_summary_failure_is_fatal_and_writes_nothing() {
    let state = test_state(Arc::new(MockLlm::new().failing_generate()));

    let result = state.ingest.ingest(request("T", "c"), "u1", None).await;
    assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    assert_eq!(state.lexical.count().await.unwrap(), 0);
    assert_eq!(state.vector.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_title_and_content_rejected() {
    let state = test_state(Arc::new(MockLlm::new()));

    let result = state.ingest.ingest(request("  ", "c"), "u1", None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let result = state.ingest.ingest(request("T", ""), "u1", None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_created_date_boundaries() {
    let state = test_state(Arc::new(MockLlm::new()));

    // One minute ahead (minus scheduling slack): accepted.
    let mut ok_req = request("Near future", "content");
    ok_req.created_date = Some((Utc::now() + chrono::Duration::seconds(58)).to_rfc3339());
    assert!(state.ingest.ingest(ok_req, "u1", None).await.is_ok());

    // Beyond one minute: rejected.
    let mut bad_req = request("Far future", "content");
    bad_req.created_date = Some((Utc::now() + chrono::Duration::seconds(61)).to_rfc3339());
    assert!(matches!(
        state.ingest.ingest(bad_req, "u1", None).await,
        Err(AppError::Validation(_))
    ));

    // Garbage format: rejected.
    let mut garbage = request("Garbage date", "content");
    garbage.created_date = Some("yesterday".to_string());
    assert!(matches!(
        state.ingest.ingest(garbage, "u1", None).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_bulk_ordering_with_mid_list_failure() {
    let state = test_state(Arc::new(MockLlm::new()));

    let requests = vec![
        request("T1", "content one"),
        request("T2", ""),
        request("T3", "content three"),
    ];
    let response = state.ingest.ingest_bulk(requests, "u1", None).await;

    assert_eq!(response.results.len(), 3);
    for (i, item) in response.results.iter().enumerate() {
        assert_eq!(item.index, i);
    }
    assert!(response.results[0].success);
    assert!(!response.results[1].success);
    assert!(response.results[1].error.as_deref().unwrap().contains("Content"));
    assert!(response.results[2].success);
    assert_eq!(response.success_count, 2);
    assert_eq!(response.error_count, 1);
}

#[tokio::test]
async fn test_bulk_order_preserved_under_concurrency() {
    let mut config = IngestConfig::default();
    config.bulk_max_concurrent = 4;

    let llm: Arc<MockLlm> = Arc::new(MockLlm::new());
    let lexical = Arc::new(InMemoryLexicalStore::new());
    let vector = Arc::new(InMemoryVectorStore::new(EMBEDDING_DIMENSIONS));
    let pipeline = IngestPipeline::new(llm, lexical, vector, config);

    let requests: Vec<AddArticleRequest> = (0..6)
        .map(|i| request(&format!("Bulk title {}", i), &format!("content {}", i)))
        .collect();
    let response = pipeline.ingest_bulk(requests, "u1", None).await;

    assert_eq!(response.results.len(), 6);
    for (i, item) in response.results.iter().enumerate() {
        assert_eq!(item.index, i, "results must be ordered by input index");
    }
    assert_eq!(response.success_count, 6);
}

// ============================================================================
// Vector-store failure injection
// ============================================================================

/// Vector store whose writes fail; probes succeed with no hits.
struct WriteFailingVectorStore;

#[async_trait]
impl VectorStore for WriteFailingVectorStore {
    async fn upsert(&self, _point_id: &str, _vector: Vec<f32>, _lang: Lang) -> Result<()> {
        Err(AppError::UpstreamUnavailable("vector store down".to_string()))
    }

    async fn delete(&self, _point_id: &str) -> Result<()> {
        Ok(())
    }

    async fn search(&self, _vector: &[f32], _k: usize, _lang: Option<Lang>) -> Result<Vec<VectorHit>> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }
}

/// Vector store whose searches fail; writes succeed silently.
struct ProbeFailingVectorStore;

#[async_trait]
impl VectorStore for ProbeFailingVectorStore {
    async fn upsert(&self, _point_id: &str, _vector: Vec<f32>, _lang: Lang) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _point_id: &str) -> Result<()> {
        Ok(())
    }

    async fn search(&self, _vector: &[f32], _k: usize, _lang: Option<Lang>) -> Result<Vec<VectorHit>> {
        Err(AppError::UpstreamUnavailable("vector search down".to_string()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_vector_write_failure_leaves_lexical_record() {
    let lexical = Arc::new(InMemoryLexicalStore::new());
    let pipeline = IngestPipeline::new(
        Arc::new(MockLlm::new()),
        Arc::clone(&lexical) as Arc<dyn librarium::LexicalStore>,
        Arc::new(WriteFailingVectorStore),
        IngestConfig::default(),
    );

    let result = pipeline.ingest(request("Orphan", "content"), "u1", None).await;
    assert!(result.is_err());

    // The known inconsistency window: the article stays keyword-findable
    // even though its embeddings never landed.
    assert_eq!(lexical.count().await.unwrap(), 1);
    let hits = lexical.search("Orphan", 10).await.unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_duplicate_probe_failure_does_not_block_ingest() {
    let lexical = Arc::new(InMemoryLexicalStore::new());
    let pipeline = IngestPipeline::new(
        Arc::new(MockLlm::new()),
        Arc::clone(&lexical) as Arc<dyn librarium::LexicalStore>,
        Arc::new(ProbeFailingVectorStore),
        IngestConfig::default(),
    );

    let ack = pipeline
        .ingest(request("Probe down", "content"), "u1", None)
        .await
        .unwrap();
    assert!(!ack.is_duplicate());
    assert_eq!(lexical.count().await.unwrap(), 1);
}
