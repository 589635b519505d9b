//! Protocol-ordering tests for the session transport.
//!
//! These drive the session logic through a channel sink and assert the
//! wire contract: `sources` precedes every `answer` chunk, exactly one
//! terminal event closes a session, and ingest progress arrives in step
//! order before the acknowledgement.

mod common;

use std::sync::Arc;

use tokio::sync::mpsc;

use common::mocks::{angled_vec, axis_vec, test_state, MockLlm};
use librarium::api::session::{self, ChannelSink};
use librarium::LexicalStore;
use librarium::types::{
    AddArticleRequest, BulkIngestRequest, SearchRequest, SessionEvent,
};

fn search_request(query: &str) -> SearchRequest {
    SearchRequest {
        query: query.to_string(),
        limit: 10,
        lang: None,
    }
}

fn article_request(title: &str, content: &str) -> AddArticleRequest {
    AddArticleRequest {
        title: title.to_string(),
        content: content.to_string(),
        author: None,
        original_url: None,
        created_date: None,
    }
}

async fn collect_events(
    run: impl std::future::Future<Output = bool>,
    mut rx: mpsc::UnboundedReceiver<SessionEvent>,
) -> Vec<SessionEvent> {
    assert!(run.await, "sink should stay alive for the whole session");
    rx.close();
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn is_terminal(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Done | SessionEvent::Error(_))
}

#[tokio::test]
async fn test_query_session_event_order() {
    let llm = MockLlm::new()
        .with_embedding("passage: Session doc", axis_vec(0))
        .with_embedding("passage: Generated summary", axis_vec(9))
        .with_embedding("query: session question", angled_vec(0, 4, 0.97))
        .with_answer_chunks(&["Hello ", "world"]);
    let state = test_state(Arc::new(llm));

    state
        .ingest
        .ingest(article_request("Session doc", "session body"), "u1", None)
        .await
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink(tx);
    let events = collect_events(
        session::run_query(&mut sink, &state, search_request("session question")),
        rx,
    )
    .await;

    // sources precedes every answer chunk.
    let sources_at = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Sources(_)))
        .expect("sources event must be emitted");
    let first_answer = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Answer(_)))
        .expect("answer chunks expected");
    assert!(sources_at < first_answer);

    // Exactly one sources event.
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Sources(_)))
            .count(),
        1
    );

    // The answer chunks concatenate in order.
    let answer: String = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Answer(chunk) => Some(chunk.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(answer, "Hello world");

    // Exactly one terminal event, and it is last.
    assert_eq!(events.iter().filter(|e| is_terminal(e)).count(), 1);
    assert!(matches!(events.last(), Some(SessionEvent::Done)));

    // The first event is the start announcement.
    assert!(matches!(events.first(), Some(SessionEvent::Status(s)) if s == "start"));
}

#[tokio::test]
async fn test_query_session_empty_corpus_still_ordered() {
    let state = test_state(Arc::new(MockLlm::new()));

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink(tx);
    let events = collect_events(
        session::run_query(&mut sink, &state, search_request("no matches anywhere")),
        rx,
    )
    .await;

    // Empty list still produces the sources event, then the answer runs on
    // the no-results template.
    let sources = events
        .iter()
        .find_map(|e| match e {
            SessionEvent::Sources(list) => Some(list),
            _ => None,
        })
        .expect("sources must be emitted even when empty");
    assert!(sources.is_empty());
    assert!(matches!(events.last(), Some(SessionEvent::Done)));
}

#[tokio::test]
async fn test_query_session_stream_error_is_terminal() {
    let state = test_state(Arc::new(MockLlm::new().failing_stream()));

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink(tx);
    let events = collect_events(
        session::run_query(&mut sink, &state, search_request("whatever")),
        rx,
    )
    .await;

    assert_eq!(events.iter().filter(|e| is_terminal(e)).count(), 1);
    assert!(matches!(events.last(), Some(SessionEvent::Error(_))));
    // No answer chunk may follow (or precede) the failure.
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Answer(_))));
}

#[tokio::test]
async fn test_query_session_invalid_query_errors() {
    let state = test_state(Arc::new(MockLlm::new()));

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink(tx);
    let events = collect_events(
        session::run_query(&mut sink, &state, search_request("   ")),
        rx,
    )
    .await;

    assert!(matches!(events.last(), Some(SessionEvent::Error(_))));
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Sources(_))));
}

#[tokio::test]
async fn test_ingest_session_progress_then_success() {
    let state = test_state(Arc::new(MockLlm::new()));

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink(tx);
    let events = collect_events(
        session::run_ingest(
            &mut sink,
            &state,
            "u1",
            article_request("Progress doc", "progress body"),
        ),
        rx,
    )
    .await;

    assert!(matches!(events.first(), Some(SessionEvent::Status(s)) if s == "start"));

    // All eight steps, in order, before the acknowledgement.
    let progress: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Progress(update) => Some(update.progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![1, 2, 3, 4, 5, 6, 7, 8]);

    let success_at = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Success(_)))
        .expect("success event expected");
    let last_progress = events
        .iter()
        .rposition(|e| matches!(e, SessionEvent::Progress(_)))
        .unwrap();
    assert!(last_progress < success_at);

    assert!(matches!(events.last(), Some(SessionEvent::Done)));
    assert_eq!(events.iter().filter(|e| is_terminal(e)).count(), 1);
}

#[tokio::test]
async fn test_ingest_session_failure_is_terminal_error() {
    let state = test_state(Arc::new(MockLlm::new().failing_generate()));

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink(tx);
    let events = collect_events(
        session::run_ingest(&mut sink, &state, "u1", article_request("Doomed", "body")),
        rx,
    )
    .await;

    assert!(matches!(events.last(), Some(SessionEvent::Error(_))));
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Success(_))));
}

#[tokio::test]
async fn test_bulk_session_counts_in_summary() {
    let llm = MockLlm::new()
        .with_embedding("passage: B1", axis_vec(20))
        .with_embedding("passage: B2", axis_vec(21))
        .with_embedding("passage: Generated summary", axis_vec(9));
    let state = test_state(Arc::new(llm));

    let request = BulkIngestRequest {
        articles: vec![
            article_request("B1", "bulk one"),
            article_request("", "invalid"),
            article_request("B2", "bulk two"),
        ],
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink(tx);
    let events = collect_events(session::run_bulk(&mut sink, &state, "u1", request), rx).await;

    // One progress event per item.
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Progress(_)))
            .count(),
        3
    );

    let summary = events
        .iter()
        .find_map(|e| match e {
            SessionEvent::Success(ack) => Some(ack.message.clone()),
            _ => None,
        })
        .expect("bulk summary expected");
    assert!(summary.contains("2 succeeded"));
    assert!(summary.contains("1 failed"));
    assert!(matches!(events.last(), Some(SessionEvent::Done)));
}

#[tokio::test]
async fn test_bulk_session_rejects_empty_batch() {
    let state = test_state(Arc::new(MockLlm::new()));

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink(tx);
    let events = collect_events(
        session::run_bulk(&mut sink, &state, "u1", BulkIngestRequest { articles: vec![] }),
        rx,
    )
    .await;

    assert!(matches!(events.last(), Some(SessionEvent::Error(_))));
}

#[tokio::test]
async fn test_korean_query_uses_korean_answer_template() {
    let llm = Arc::new(
        MockLlm::new()
            .with_embedding("passage: 한국어 문서", axis_vec(0))
            .with_embedding("passage: Generated summary", axis_vec(9))
            .with_embedding("query: 이것은 무엇인가?", angled_vec(0, 2, 0.97)),
    );
    let state = test_state(Arc::clone(&llm));

    state
        .ingest
        .ingest(
            article_request("한국어 문서", "한국어로 작성된 본문입니다"),
            "u1",
            None,
        )
        .await
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink(tx);
    let events = collect_events(
        session::run_query(&mut sink, &state, search_request("이것은 무엇인가?")),
        rx,
    )
    .await;

    let sources = events
        .iter()
        .find_map(|e| match e {
            SessionEvent::Sources(list) => Some(list),
            _ => None,
        })
        .unwrap();
    assert!(!sources.is_empty());

    // The generation prompt went through the Korean template with
    // localized source labels.
    let prompts = llm.stream_calls();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("질문"));
    assert!(prompts[0].contains("제목: 한국어 문서"));
}

#[tokio::test]
async fn test_session_stops_when_consumer_disconnects() {
    let state = test_state(Arc::new(MockLlm::new()));

    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx); // Client is gone before the session starts.
    let mut sink = ChannelSink(tx);

    let alive = session::run_ingest(
        &mut sink,
        &state,
        "u1",
        article_request("Nobody listening", "body"),
    )
    .await;
    assert!(!alive);

    // Nothing was written: the cancellation aborted before the lexical
    // write.
    assert_eq!(state.lexical.count().await.unwrap(), 0);
}
