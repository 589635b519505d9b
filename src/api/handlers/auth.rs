//! Account handlers: register, login, refresh.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::types::{AppError, LoginRequest, RegisterRequest, Result, TokenResponse};
use crate::AppState;

/// Request payload for refreshing an access token.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    /// The refresh token issued during login or registration.
    pub refresh_token: String,
}

/// Register a new account.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = TokenResponse),
        (status = 400, description = "Invalid input or username taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>> {
    if payload.username.trim().is_empty() || payload.password.len() < 8 {
        return Err(AppError::Validation(
            "Username required and password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = state.auth.hash_password(&payload.password)?;
    state.users.create_user(&payload.username, &password_hash)?;

    let tokens = state.auth.generate_tokens(&payload.username)?;
    store_refresh_session(&state, &payload.username, &tokens)?;

    tracing::info!(username = %payload.username, "Account registered");
    Ok(Json(tokens))
}

/// Login with username and password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let user = state
        .users
        .get_user(&payload.username)?
        .ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;

    if !state
        .auth
        .verify_password(&payload.password, &user.password_hash)?
    {
        return Err(AppError::Auth("Invalid credentials".to_string()));
    }

    let tokens = state.auth.generate_tokens(&user.username)?;
    store_refresh_session(&state, &user.username, &tokens)?;
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new token pair. Refresh tokens are
/// single-use.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Invalid, revoked, or expired refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>> {
    let claims = state.auth.verify_token(&payload.refresh_token)?;

    let token_hash = state.auth.hash_token(&payload.refresh_token);
    let username = state
        .users
        .validate_session(&token_hash)?
        .ok_or_else(|| AppError::Auth("Refresh token has been revoked or expired".to_string()))?;

    if username != claims.sub {
        return Err(AppError::Auth("Token mismatch".to_string()));
    }

    state.users.delete_session(&token_hash)?;

    let tokens = state.auth.generate_tokens(&claims.sub)?;
    store_refresh_session(&state, &claims.sub, &tokens)?;
    Ok(Json(tokens))
}

fn store_refresh_session(state: &AppState, username: &str, tokens: &TokenResponse) -> Result<()> {
    let token_hash = state.auth.hash_token(&tokens.refresh_token);
    state.users.create_session(
        &token_hash,
        username,
        Utc::now().timestamp() + state.auth.refresh_expiry(),
    )
}
