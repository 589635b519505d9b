//! Request handlers, grouped by resource.

/// Article registration, retrieval, listing, deletion, bulk ingest.
pub mod articles;
/// Account registration, login, token refresh.
pub mod auth;
/// Health and supported-languages endpoints.
pub mod misc;
/// Unauthenticated read-only mirror.
pub mod public;
/// Synchronous search endpoints.
pub mod search;
