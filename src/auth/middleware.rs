//! Request extractor for authenticated callers.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::types::{AppError, Claims};
use crate::AppState;

/// Extractor that verifies the `Authorization: Bearer` header and yields
/// the caller's claims. Handlers take `AuthUser(claims)` as an argument to
/// require authentication.
pub struct AuthUser(pub Claims);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Auth("Missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("Expected Bearer token".to_string()))?;

        let claims = state.auth.verify_token(token)?;
        Ok(AuthUser(claims))
    }
}
