//! In-memory user and refresh-session registry.
//!
//! The registrar identity is the username. Refresh tokens are stored as
//! SHA-256 hashes and are single-use: a refresh deletes the old session
//! and writes a new one.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::types::{AppError, Result};

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique username; doubles as the registrar identity on articles.
    pub username: String,
    /// Argon2 PHC-format password hash.
    pub password_hash: String,
    /// Registration timestamp (Unix seconds).
    pub created_at: i64,
}

#[derive(Debug, Clone)]
struct SessionRecord {
    username: String,
    expires_at: i64,
}

/// Thread-safe user and session storage.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: RwLock<HashMap<String, User>>,
    /// Refresh-token hash -> session.
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl UserRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new user. Fails if the username is taken.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<()> {
        let mut users = self
            .users
            .write()
            .map_err(|e| AppError::Internal(format!("User registry lock error: {}", e)))?;

        if users.contains_key(username) {
            return Err(AppError::Validation(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        users.insert(
            username.to_string(),
            User {
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at: Utc::now().timestamp(),
            },
        );
        Ok(())
    }

    /// Look up a user by username.
    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .map_err(|e| AppError::Internal(format!("User registry lock error: {}", e)))?
            .get(username)
            .cloned())
    }

    /// Record a refresh session keyed by token hash.
    pub fn create_session(&self, token_hash: &str, username: &str, expires_at: i64) -> Result<()> {
        self.sessions
            .write()
            .map_err(|e| AppError::Internal(format!("Session lock error: {}", e)))?
            .insert(
                token_hash.to_string(),
                SessionRecord {
                    username: username.to_string(),
                    expires_at,
                },
            );
        Ok(())
    }

    /// Validate a refresh session; returns the username while unexpired.
    pub fn validate_session(&self, token_hash: &str) -> Result<Option<String>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| AppError::Internal(format!("Session lock error: {}", e)))?;

        Ok(sessions
            .get(token_hash)
            .filter(|record| record.expires_at > Utc::now().timestamp())
            .map(|record| record.username.clone()))
    }

    /// Remove a refresh session. Removing a missing session is not an error.
    pub fn delete_session(&self, token_hash: &str) -> Result<()> {
        self.sessions
            .write()
            .map_err(|e| AppError::Internal(format!("Session lock error: {}", e)))?
            .remove(token_hash);
        Ok(())
    }
}
