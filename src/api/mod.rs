//! HTTP API handlers and routes.
//!
//! The REST and WebSocket surface for Librarium, built on Axum.
//!
//! # Endpoints
//!
//! ## Articles (`/api/v1/articles`)
//! - `POST /api/v1/articles` - register an article (auth)
//! - `GET /api/v1/articles` - list the caller's articles (auth)
//! - `GET /api/v1/articles/{id}` - fetch an article
//! - `DELETE /api/v1/articles/{id}` - delete own article (auth)
//! - `POST /api/v1/articles/bulk` - bulk register (auth)
//! - `WS /api/v1/articles/ws` - register with step progress (auth)
//! - `WS /api/v1/articles/bulk/ws` - bulk register with progress (auth)
//!
//! ## Search (`/api/v1/search`)
//! - `POST /api/v1/search` - synchronous hybrid search
//! - `GET /api/v1/search/keyword` - lexical-only search
//! - `WS /api/v1/search/ws` - streamed question answering
//!
//! ## Misc
//! - `GET /api/v1/languages` - supported language codes
//! - `GET /api/v1/health` - adapter health
//! - `POST /api/v1/auth/{register,login,refresh}` - accounts
//!
//! ## Public mirror (`/api/v1/public`)
//! Unauthenticated, read-only listing/detail/search with internal error
//! details redacted.
//!
//! # Authentication
//!
//! Protected endpoints require `Authorization: Bearer <token>`; WebSocket
//! endpoints check the same header during the upgrade request.

/// Request and response handlers for all REST endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
/// Session logic: typed event emission with ordering guarantees.
pub mod session;
/// WebSocket session transport.
pub mod ws;
