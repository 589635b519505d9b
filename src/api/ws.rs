//! WebSocket session transport.
//!
//! One duplex connection carries typed `{type, data}` events. A connection
//! serves sequential requests: the client sends a JSON request frame, the
//! server runs one session ([`crate::api::session`]) and emits its events
//! in order, then waits for the next frame. Client disconnect drops the
//! session future mid-await, which abandons in-flight store and LLM calls.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;

use crate::api::session::{self, EventSink};
use crate::auth::middleware::AuthUser;
use crate::types::{AddArticleRequest, BulkIngestRequest, SearchRequest, SessionEvent};
use crate::AppState;

/// Top-level deadline for one session, sized to the longest end-to-end
/// operation (a bulk ingest over a slow runtime).
const SESSION_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Sink that serializes events onto a socket, preserving order.
struct SocketSink<'a>(&'a mut WebSocket);

#[async_trait]
impl EventSink for SocketSink<'_> {
    async fn emit(&mut self, event: SessionEvent) -> bool {
        match serde_json::to_string(&event) {
            Ok(json) => self.0.send(Message::Text(json.into())).await.is_ok(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize session event");
                false
            }
        }
    }
}

/// Read request frames off a socket, handling transport-level messages.
/// Returns the next text payload, or `None` when the connection ended.
async fn next_request(socket: &mut WebSocket) -> Option<String> {
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Ping(data)) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    return None;
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            _ => {}
        }
    }
    None
}

/// Report a malformed request frame. Returns `false` once the socket is
/// gone.
async fn reject_frame(socket: &mut WebSocket, error: impl std::fmt::Display) -> bool {
    SocketSink(socket)
        .emit(SessionEvent::Error(format!("Invalid request: {}", error)))
        .await
}

/// Deadline expiry drops the session future (abandoning its in-flight
/// calls); `error` then becomes the terminal event.
async fn deadline_exceeded(sink: &mut SocketSink<'_>) -> bool {
    sink.emit(SessionEvent::Error("Session deadline exceeded".to_string()))
        .await
}

// ============================================================================
// Query sessions
// ============================================================================

/// WebSocket upgrade for streamed question answering - GET /api/v1/search/ws
pub async fn search_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_search_socket(socket, state))
}

async fn handle_search_socket(mut socket: WebSocket, state: AppState) {
    tracing::debug!("Search session connected");
    while let Some(text) = next_request(&mut socket).await {
        let alive = match serde_json::from_str::<SearchRequest>(&text) {
            Ok(request) => query_session(&mut socket, &state, request).await,
            Err(e) => reject_frame(&mut socket, e).await,
        };
        if !alive {
            break;
        }
    }
    tracing::debug!("Search session disconnected");
}

async fn query_session(socket: &mut WebSocket, state: &AppState, request: SearchRequest) -> bool {
    let mut sink = SocketSink(socket);
    let result = tokio::time::timeout(
        SESSION_DEADLINE,
        session::run_query(&mut sink, state, request),
    )
    .await;
    match result {
        Ok(alive) => alive,
        Err(_) => deadline_exceeded(&mut sink).await,
    }
}

// ============================================================================
// Ingest sessions
// ============================================================================

/// WebSocket upgrade for single-article ingest - GET /api/v1/articles/ws
pub async fn ingest_ws(
    ws: WebSocketUpgrade,
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ingest_socket(socket, state, claims.sub))
}

async fn handle_ingest_socket(mut socket: WebSocket, state: AppState, registrar: String) {
    while let Some(text) = next_request(&mut socket).await {
        let alive = match serde_json::from_str::<AddArticleRequest>(&text) {
            Ok(request) => ingest_session(&mut socket, &state, &registrar, request).await,
            Err(e) => reject_frame(&mut socket, e).await,
        };
        if !alive {
            break;
        }
    }
}

async fn ingest_session(
    socket: &mut WebSocket,
    state: &AppState,
    registrar: &str,
    request: AddArticleRequest,
) -> bool {
    let mut sink = SocketSink(socket);
    let result = tokio::time::timeout(
        SESSION_DEADLINE,
        session::run_ingest(&mut sink, state, registrar, request),
    )
    .await;
    match result {
        Ok(alive) => alive,
        Err(_) => deadline_exceeded(&mut sink).await,
    }
}

// ============================================================================
// Bulk ingest sessions
// ============================================================================

/// WebSocket upgrade for bulk ingest - GET /api/v1/articles/bulk/ws
pub async fn bulk_ws(
    ws: WebSocketUpgrade,
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_bulk_socket(socket, state, claims.sub))
}

async fn handle_bulk_socket(mut socket: WebSocket, state: AppState, registrar: String) {
    while let Some(text) = next_request(&mut socket).await {
        let alive = match serde_json::from_str::<BulkIngestRequest>(&text) {
            Ok(request) => bulk_session(&mut socket, &state, &registrar, request).await,
            Err(e) => reject_frame(&mut socket, e).await,
        };
        if !alive {
            break;
        }
    }
}

async fn bulk_session(
    socket: &mut WebSocket,
    state: &AppState,
    registrar: &str,
    request: BulkIngestRequest,
) -> bool {
    let mut sink = SocketSink(socket);
    let result = tokio::time::timeout(
        SESSION_DEADLINE,
        session::run_bulk(&mut sink, state, registrar, request),
    )
    .await;
    match result {
        Ok(alive) => alive,
        Err(_) => deadline_exceeded(&mut sink).await,
    }
}
