//! JWT authentication.
//!
//! Accounts exist so that every article has a registrar and only that
//! registrar may delete it. Passwords are hashed with Argon2id, access and
//! refresh tokens are HS256 JWTs, and refresh tokens are stored hashed for
//! one-time use.

/// JWT token management and password hashing.
pub mod jwt;
/// The `AuthUser` request extractor.
pub mod middleware;
/// In-memory user and refresh-session registry.
pub mod users;

pub use jwt::AuthService;
pub use middleware::AuthUser;
pub use users::UserRegistry;
