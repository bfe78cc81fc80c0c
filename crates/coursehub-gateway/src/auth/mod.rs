//! Authentication and authorization for the gateway.
//!
//! This module provides:
//! - Access/refresh token issuing and verification
//! - Cache-backed session records keyed by identity id
//! - The credential store with role-based access control
//! - The authentication gate with silent refresh, and the role gate

/// Registration activation tickets.
pub mod activation;
/// Session cache backends.
pub mod cache;
mod config;
/// Token cookies.
pub mod cookies;
mod gate;
mod identity;
mod roles;
mod session;
mod tokens;

pub use activation::{ActivationIssuer, ActivationTicket, Registration};
pub use cache::{CacheError, MemorySessionCache, RedisSessionCache, SessionCache};
pub use config::{AuthConfig, AuthConfigBuilder};
pub use gate::{
    AuthState, Authenticated, CurrentUser, RefreshOutcome, RequireAdmin, authenticate,
    refresh_session, require_session,
};
pub use identity::{Avatar, CourseRef, Identity, IdentityStore, Role};
pub(crate) use identity::hash_password;
pub use roles::RoleGate;
pub use session::{SESSION_RECORD_VERSION, SessionRecord, SessionStore};
pub use tokens::{Claims, TokenIssuer, TokenPair};

use coursehub_core::ValidationError;
use thiserror::Error;

/// Wire message shared by every "not logged in" failure.
pub const LOGIN_REQUIRED: &str = "Please login to access this resource";

/// Authentication errors.
///
/// The `Display` text is the `message` field of the JSON error body.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No access token cookie on the request.
    #[error("Please login to access this resource")]
    NoToken,

    /// Token is malformed or carries a bad signature.
    #[error("Please login to access this resource")]
    InvalidToken,

    /// Refresh token is past its expiry.
    #[error("Refresh token expired, please login again")]
    Expired,

    /// Refresh token missing or unusable.
    #[error("Could not refresh token")]
    RefreshFailed,

    /// Token was valid but no session record exists.
    #[error("Please login to access this resource")]
    SessionNotFound,

    /// Role not in the required set. Carries the caller's role.
    #[error("Role: {0} is not allowed to access this resource")]
    Forbidden(String),

    /// Login submitted without email or password.
    #[error("Please enter email or password")]
    MissingCredentials,

    /// Unknown email or wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Email already registered.
    #[error("Email already exists")]
    IdentityExists(String),

    /// No identity for the given id or email.
    #[error("User not found")]
    IdentityNotFound(String),

    /// Activation code does not match the ticket.
    #[error("Invalid Activation Code")]
    InvalidActivationCode,

    /// Activation ticket is malformed, tampered or expired.
    #[error("Activation token is invalid or expired")]
    ActivationToken(String),

    /// Client input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// Mail delivery failed.
    #[error("Failed to send mail: {0}")]
    Mail(String),

    /// Credential store error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Session cache error.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<CacheError> for AuthError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<crate::mail::MailError> for AuthError {
    fn from(err: crate::mail::MailError) -> Self {
        Self::Mail(err.to_string())
    }
}
