//! Authentication configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use coursehub_core::config::DEFAULT_SESSION_TTL_SECS;

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINUTES: u64 = 5;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: u64 = 3;
/// Default activation ticket expiry in minutes.
const DEFAULT_ACTIVATION_EXPIRY_MINUTES: u64 = 5;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Access token signing secret (hex). Auto-generated if not set.
    #[serde(default)]
    pub access_token_secret: Option<String>,

    /// Refresh token signing secret (hex). Auto-generated if not set.
    #[serde(default)]
    pub refresh_token_secret: Option<String>,

    /// Activation ticket signing secret (hex). Auto-generated if not set.
    #[serde(default)]
    pub activation_secret: Option<String>,

    /// Access token expiry in minutes.
    #[serde(default = "default_access_expiry")]
    pub access_token_expire_minutes: u64,

    /// Refresh token expiry in days.
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expire_days: u64,

    /// Session record lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Activation ticket expiry in minutes.
    #[serde(default = "default_activation_expiry")]
    pub activation_expire_minutes: u64,

    /// Mark token cookies `Secure`.
    #[serde(default = "default_true")]
    pub secure_cookies: bool,
}

fn default_true() -> bool {
    true
}

fn default_access_expiry() -> u64 {
    DEFAULT_ACCESS_EXPIRY_MINUTES
}

fn default_refresh_expiry() -> u64 {
    DEFAULT_REFRESH_EXPIRY_DAYS
}

fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_activation_expiry() -> u64 {
    DEFAULT_ACTIVATION_EXPIRY_MINUTES
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: None,
            refresh_token_secret: None,
            activation_secret: None,
            access_token_expire_minutes: default_access_expiry(),
            refresh_token_expire_days: default_refresh_expiry(),
            session_ttl_secs: default_session_ttl(),
            activation_expire_minutes: default_activation_expiry(),
            secure_cookies: default_true(),
        }
    }
}

impl AuthConfig {
    /// Create a new auth config builder.
    #[must_use]
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Get access token expiry as Duration.
    #[must_use]
    pub const fn access_expiry(&self) -> Duration {
        Duration::from_secs(self.access_token_expire_minutes.saturating_mul(60))
    }

    /// Get refresh token expiry as Duration.
    #[must_use]
    pub const fn refresh_expiry(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expire_days.saturating_mul(24 * 3600))
    }

    /// Get session record lifetime as Duration.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Get activation ticket expiry as Duration.
    #[must_use]
    pub const fn activation_expiry(&self) -> Duration {
        Duration::from_secs(self.activation_expire_minutes.saturating_mul(60))
    }

    /// Apply overrides from environment variables.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(secret) = std::env::var("COURSEHUB_ACCESS_TOKEN_SECRET") {
            self.access_token_secret = Some(secret);
        }
        if let Ok(secret) = std::env::var("COURSEHUB_REFRESH_TOKEN_SECRET") {
            self.refresh_token_secret = Some(secret);
        }
        if let Ok(secret) = std::env::var("COURSEHUB_ACTIVATION_SECRET") {
            self.activation_secret = Some(secret);
        }

        if let Some(minutes) = env_u64("COURSEHUB_ACCESS_TOKEN_EXPIRE") {
            self.access_token_expire_minutes = minutes;
        }
        if let Some(days) = env_u64("COURSEHUB_REFRESH_TOKEN_EXPIRE") {
            self.refresh_token_expire_days = days;
        }

        if std::env::var("COURSEHUB_INSECURE_COOKIES")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            self.secure_cookies = false;
        }

        self
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {name}={raw}: not a whole number");
            None
        }
    }
}

/// Builder for `AuthConfig`.
#[derive(Debug, Default)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Set the access token secret.
    #[must_use]
    pub fn access_token_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.access_token_secret = Some(secret.into());
        self
    }

    /// Set the refresh token secret.
    #[must_use]
    pub fn refresh_token_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.refresh_token_secret = Some(secret.into());
        self
    }

    /// Set the activation ticket secret.
    #[must_use]
    pub fn activation_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.activation_secret = Some(secret.into());
        self
    }

    /// Set access token expiry in minutes.
    #[must_use]
    pub const fn access_token_expire_minutes(mut self, minutes: u64) -> Self {
        self.config.access_token_expire_minutes = minutes;
        self
    }

    /// Set refresh token expiry in days.
    #[must_use]
    pub const fn refresh_token_expire_days(mut self, days: u64) -> Self {
        self.config.refresh_token_expire_days = days;
        self
    }

    /// Set session record lifetime in seconds.
    #[must_use]
    pub const fn session_ttl_secs(mut self, secs: u64) -> Self {
        self.config.session_ttl_secs = secs;
        self
    }

    /// Set whether cookies carry the `Secure` attribute.
    #[must_use]
    pub const fn secure_cookies(mut self, secure: bool) -> Self {
        self.config.secure_cookies = secure;
        self
    }

    /// Build the config.
    #[must_use]
    pub fn build(self) -> AuthConfig {
        self.config
    }
}
