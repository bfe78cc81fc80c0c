//! # CourseHub Gateway
//!
//! HTTP account service: token issuing, cache-backed sessions with silent
//! refresh, role checks and the account REST surface.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and authorization.
pub mod auth;
mod handlers;
/// Outbound mail.
pub mod mail;
mod server;

pub use auth::{
    AuthConfig, AuthError, AuthState, Identity, IdentityStore, MemorySessionCache,
    RedisSessionCache, Role, SessionCache, SessionRecord,
};
pub use mail::{LogMailer, MailMessage, Mailer, OutboxMailer};
pub use server::{Gateway, GatewayBuilder, GatewayConfig, GatewayState};

/// Start the gateway server.
///
/// # Errors
///
/// Returns error if server fails to start.
pub async fn start(config: GatewayConfig) -> Result<(), GatewayError> {
    let gateway = Gateway::new(config).await?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Credential store or token setup failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session cache unreachable.
    #[error("Cache error: {0}")]
    Cache(#[from] auth::CacheError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
