//! JWT token management and password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::types::{AppError, Claims, Result, TokenResponse};

/// Authentication service for JWT token management and password hashing.
///
/// Passwords are hashed with Argon2id; tokens are signed with HS256.
pub struct AuthService {
    jwt_secret: String,
    access_expiry: i64,
    refresh_expiry: i64,
}

impl AuthService {
    /// Creates a new AuthService.
    ///
    /// `access_expiry` and `refresh_expiry` are validity windows in
    /// seconds; the secret should be at least 32 characters.
    pub fn new(jwt_secret: String, access_expiry: i64, refresh_expiry: i64) -> Self {
        Self {
            jwt_secret,
            access_expiry,
            refresh_expiry,
        }
    }

    /// Refresh token validity in seconds.
    pub fn refresh_expiry(&self) -> i64 {
        self.refresh_expiry
    }

    /// Hashes a password using Argon2id, returning a PHC-format string.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Auth(format!("Failed to hash password: {}", e)))
    }

    /// Verifies a password against an Argon2 hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Auth(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Generates access and refresh tokens for a username.
    pub fn generate_tokens(&self, username: &str) -> Result<TokenResponse> {
        Ok(TokenResponse {
            access_token: self.generate_token(username, self.access_expiry)?,
            refresh_token: self.generate_token(username, self.refresh_expiry)?,
            expires_in: self.access_expiry,
        })
    }

    fn generate_token(&self, username: &str, expiry: i64) -> Result<String> {
        let claims = Claims {
            sub: username.to_string(),
            exp: (Utc::now() + Duration::seconds(expiry)).timestamp() as usize,
            iat: Utc::now().timestamp() as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a JWT token and returns the claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))
    }

    /// Hashes a token with SHA-256 for storage.
    pub fn hash_token(&self, token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> AuthService {
        AuthService::new(
            "test-secret-key-that-is-at-least-32-chars".to_string(),
            900,
            604800,
        )
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let service = create_test_service();
        let hash = service.hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(service.verify_password("correct horse", &hash).unwrap());
        assert!(!service.verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_token_generation_and_verification() {
        let service = create_test_service();
        let tokens = service.generate_tokens("alice").unwrap();

        assert_ne!(tokens.access_token, tokens.refresh_token);
        assert_eq!(tokens.expires_in, 900);

        let claims = service.verify_token(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, "alice");
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let service1 = AuthService::new("secret-one-that-is-32-chars-long".to_string(), 900, 900);
        let service2 = AuthService::new("secret-two-that-is-32-chars-long".to_string(), 900, 900);

        let tokens = service1.generate_tokens("bob").unwrap();
        assert!(service2.verify_token(&tokens.access_token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = create_test_service();
        assert!(service.verify_token("not.a.token").is_err());
    }

    #[test]
    fn test_token_hash_is_stable_hex() {
        let service = create_test_service();
        let hash = service.hash_token("refresh-token");

        assert_eq!(hash, service.hash_token("refresh-token"));
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, service.hash_token("other-token"));
    }
}
