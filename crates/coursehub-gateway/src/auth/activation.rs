//! Registration activation tickets.
//!
//! A registration is not persisted until the applicant proves control of the
//! email address. The pending registration travels inside a signed ticket
//! together with a four-digit code that is mailed to the applicant; the
//! identity is created only when ticket and code come back together.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::AuthError;
use super::config::AuthConfig;
use super::tokens::{expires_after, secret_or_generate};

/// A registration waiting for activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Normalized email.
    pub email: String,
    /// Argon2 hash of the chosen password.
    pub password_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActivationClaims {
    registration: Registration,
    activation_code: String,
    iat: i64,
    exp: i64,
}

/// A signed ticket and the code that unlocks it.
#[derive(Debug, Clone)]
pub struct ActivationTicket {
    /// Signed ticket returned to the client.
    pub token: String,
    /// Code mailed to the applicant.
    pub activation_code: String,
}

/// Signs and verifies activation tickets.
pub struct ActivationIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl ActivationIssuer {
    /// Create an issuer from a raw secret.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Create an issuer from auth config, generating the secret if missing.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = secret_or_generate(config.activation_secret.as_deref(), "activation");
        Self::new(&secret, config.activation_expiry())
    }

    /// Sign a pending registration with a fresh activation code.
    ///
    /// # Errors
    ///
    /// Returns error if the lifetime is out of range or encoding fails.
    pub fn issue(&self, registration: Registration) -> Result<ActivationTicket, AuthError> {
        let activation_code = generate_code();
        let now = Utc::now();
        let exp = expires_after(now, self.ttl)?;

        let claims = ActivationClaims {
            registration,
            activation_code: activation_code.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Config(format!("Ticket encoding failed: {e}")))?;

        Ok(ActivationTicket {
            token,
            activation_code,
        })
    }

    /// Open a ticket and check the code against it.
    ///
    /// # Errors
    ///
    /// Returns `ActivationToken` if the ticket is tampered or expired, and
    /// `InvalidActivationCode` if the code does not match.
    pub fn verify(&self, token: &str, code: &str) -> Result<Registration, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<ActivationClaims>(token, &self.decoding, &validation)
            .map_err(|e| AuthError::ActivationToken(e.to_string()))?
            .claims;

        if claims.activation_code != code.trim() {
            return Err(AuthError::InvalidActivationCode);
        }

        Ok(claims.registration)
    }
}

impl std::fmt::Debug for ActivationIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}
