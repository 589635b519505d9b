//! Session logic for the duplex transport.
//!
//! A session is one request's worth of events, emitted in contract order:
//! for queries `status* → sources → answer* → done|error`, for ingestion
//! `status → progress* → success → done` (or a terminal `error`). The
//! logic is written against [`EventSink`] so the ordering contract can be
//! exercised without a live socket; the WebSocket layer adapts a socket
//! into a sink.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::types::{
    AddArticleRequest, Article, BulkIngestRequest, IngestAck, SearchRequest, SessionEvent,
    SourceDoc,
};
use crate::AppState;

/// Where session events go. `emit` returns `false` once the consumer is
/// gone, which cancels the session.
#[async_trait]
pub trait EventSink: Send {
    /// Deliver one event. Must preserve emission order.
    async fn emit(&mut self, event: SessionEvent) -> bool;
}

/// Sink over an unbounded channel. Used by tests and by any caller that
/// wants to consume session events in-process.
pub struct ChannelSink(pub mpsc::UnboundedSender<SessionEvent>);

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: SessionEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

/// Run one query session: retrieve, emit sources, stream the answer.
///
/// Returns `false` when the sink consumer disappeared mid-session.
pub async fn run_query(
    sink: &mut impl EventSink,
    state: &AppState,
    request: SearchRequest,
) -> bool {
    if !sink.emit(SessionEvent::Status("start".to_string())).await {
        return false;
    }
    if !sink
        .emit(SessionEvent::Status("searching".to_string()))
        .await
    {
        return false;
    }

    let retrieval = match state
        .search
        .retrieve(&request.query, request.limit, request.lang)
        .await
    {
        Ok(retrieval) => retrieval,
        Err(e) => return sink.emit(SessionEvent::Error(e.to_string())).await,
    };

    let articles: Vec<Article> = retrieval
        .sources
        .iter()
        .map(|ranked| ranked.article.clone())
        .collect();
    let sources: Vec<SourceDoc> = retrieval.sources.into_iter().map(Into::into).collect();

    // `sources` must reach the client before any answer chunk.
    if !sink.emit(SessionEvent::Sources(sources)).await {
        return false;
    }
    if !sink
        .emit(SessionEvent::Status("generating".to_string()))
        .await
    {
        return false;
    }

    let mut chunks = match state
        .composer
        .stream_answer(&request.query, retrieval.query_lang, &articles)
        .await
    {
        Ok(stream) => stream,
        Err(e) => return sink.emit(SessionEvent::Error(e.to_string())).await,
    };

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(text) => {
                if !sink.emit(SessionEvent::Answer(text)).await {
                    return false;
                }
            }
            Err(e) => return sink.emit(SessionEvent::Error(e.to_string())).await,
        }
    }

    sink.emit(SessionEvent::Done).await
}

/// Run one ingest session: per-step progress, then success + done.
pub async fn run_ingest(
    sink: &mut impl EventSink,
    state: &AppState,
    registrar: &str,
    request: AddArticleRequest,
) -> bool {
    if !sink.emit(SessionEvent::Status("start".to_string())).await {
        return false;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let ingest = state.ingest.ingest(request, registrar, Some(&tx));
    tokio::pin!(ingest);

    // Forward progress while the pipeline runs. `biased` keeps updates
    // ahead of the completion branch so step order reaches the client
    // intact.
    let result = loop {
        tokio::select! {
            biased;
            Some(update) = rx.recv() => {
                if !sink.emit(SessionEvent::Progress(update)).await {
                    return false;
                }
            }
            result = &mut ingest => break result,
        }
    };

    // Flush updates that raced with completion.
    while let Ok(update) = rx.try_recv() {
        if !sink.emit(SessionEvent::Progress(update)).await {
            return false;
        }
    }

    match result {
        Ok(ack) => {
            if !sink.emit(SessionEvent::Success(ack)).await {
                return false;
            }
            sink.emit(SessionEvent::Done).await
        }
        Err(e) => sink.emit(SessionEvent::Error(e.to_string())).await,
    }
}

/// Run one bulk session: per-item progress, then a success summary.
///
/// The per-item result array is available from the REST bulk endpoint;
/// the session protocol carries completion counts.
pub async fn run_bulk(
    sink: &mut impl EventSink,
    state: &AppState,
    registrar: &str,
    request: BulkIngestRequest,
) -> bool {
    if !sink.emit(SessionEvent::Status("start".to_string())).await {
        return false;
    }
    if request.articles.is_empty() {
        return sink
            .emit(SessionEvent::Error(
                "Bulk request must contain at least one article".to_string(),
            ))
            .await;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let bulk = state
        .ingest
        .ingest_bulk(request.articles, registrar, Some(&tx));
    tokio::pin!(bulk);

    let response = loop {
        tokio::select! {
            biased;
            Some(update) = rx.recv() => {
                if !sink.emit(SessionEvent::Progress(update)).await {
                    return false;
                }
            }
            response = &mut bulk => break response,
        }
    };

    while let Ok(update) = rx.try_recv() {
        if !sink.emit(SessionEvent::Progress(update)).await {
            return false;
        }
    }

    let ack = IngestAck {
        id: String::new(),
        message: format!(
            "Bulk ingest complete: {} succeeded, {} failed",
            response.success_count, response.error_count
        ),
    };
    if !sink.emit(SessionEvent::Success(ack)).await {
        return false;
    }
    sink.emit(SessionEvent::Done).await
}
