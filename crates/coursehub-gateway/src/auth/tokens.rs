//! Access and refresh token issuing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use coursehub_core::IdentityId;

use super::AuthError;
use super::config::AuthConfig;

/// Token claims. Carries nothing but the identity id and the validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id.
    pub id: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    fn new(id: &IdentityId, ttl: Duration) -> Result<(Self, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let exp = expires_after(now, ttl)?;
        let claims = Self {
            id: id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        Ok((claims, exp))
    }

    /// The identity this token was issued for.
    #[must_use]
    pub fn identity_id(&self) -> IdentityId {
        IdentityId::new(self.id.clone())
    }

    /// Whether the expiry timestamp is in the past.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token expiration.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiration.
    pub refresh_expires_at: DateTime<Utc>,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Issues and verifies access and refresh tokens.
///
/// Both token kinds are HS256 with distinct secrets, so a refresh token
/// never verifies as an access token and vice versa.
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer from raw secrets.
    #[must_use]
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access: SigningKeys::new(access_secret),
            refresh: SigningKeys::new(refresh_secret),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Create an issuer from auth config, generating any missing secret.
    ///
    /// Generated secrets live for the process only, so every restart
    /// invalidates outstanding tokens.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let access = secret_or_generate(config.access_token_secret.as_deref(), "access token");
        let refresh = secret_or_generate(config.refresh_token_secret.as_deref(), "refresh token");
        Self::new(
            &access,
            &refresh,
            config.access_expiry(),
            config.refresh_expiry(),
        )
    }

    /// Access token lifetime.
    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh token lifetime.
    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue an access token for an identity.
    ///
    /// # Errors
    ///
    /// Returns error if the lifetime is out of range or encoding fails.
    pub fn issue_access_token(
        &self,
        id: &IdentityId,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let (claims, exp) = Claims::new(id, self.access_ttl)?;
        let token = sign(&claims, &self.access.encoding)?;
        tracing::debug!(identity = %id, "Issued access token");
        Ok((token, exp))
    }

    /// Issue a refresh token for an identity.
    ///
    /// # Errors
    ///
    /// Returns error if the lifetime is out of range or encoding fails.
    pub fn issue_refresh_token(
        &self,
        id: &IdentityId,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let (claims, exp) = Claims::new(id, self.refresh_ttl)?;
        let token = sign(&claims, &self.refresh.encoding)?;
        tracing::debug!(identity = %id, "Issued refresh token");
        Ok((token, exp))
    }

    /// Issue both tokens for an identity.
    ///
    /// # Errors
    ///
    /// Returns error if token encoding fails.
    pub fn issue_pair(&self, id: &IdentityId) -> Result<TokenPair, AuthError> {
        let (access_token, access_expires_at) = self.issue_access_token(id)?;
        let (refresh_token, refresh_expires_at) = self.issue_refresh_token(id)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Verify an access token's signature and decode its claims.
    ///
    /// Expiry is not checked here. Callers inspect [`Claims::is_expired`]
    /// and decide whether to refresh.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is malformed or the signature
    /// does not match.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        decode::<Claims>(token, &self.access.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Access token rejected: {e}");
                AuthError::InvalidToken
            })
    }

    /// Verify a refresh token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `Expired` past the expiry timestamp and `InvalidToken` for
    /// anything else.
    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.refresh.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Refresh token rejected: {e}");
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => AuthError::InvalidToken,
                }
            })
    }

    /// Generate a random 256-bit secret key.
    #[must_use]
    pub fn generate_secret() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// `now + ttl`, or a config error when that is not a representable time.
pub(crate) fn expires_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AuthError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| AuthError::Config(format!("Token lifetime out of range: {ttl:?}")))
}

fn sign(claims: &Claims, key: &EncodingKey) -> Result<String, AuthError> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| AuthError::Config(format!("Token encoding failed: {e}")))
}

/// Secret bytes from config. Even-length hex is decoded, anything else is
/// used as UTF-8.
pub(crate) fn secret_bytes(secret: &str) -> Vec<u8> {
    if secret.len() % 2 == 0 {
        if let Ok(bytes) = hex::decode(secret) {
            return bytes;
        }
    }
    secret.as_bytes().to_vec()
}

pub(crate) fn secret_or_generate(secret: Option<&str>, what: &str) -> Vec<u8> {
    if let Some(secret) = secret.filter(|s| !s.is_empty()) {
        return secret_bytes(secret);
    }
    tracing::info!("Generated new {what} secret");
    TokenIssuer::generate_secret().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &[u8] = b"access-secret-for-tests";
    const REFRESH: &[u8] = b"refresh-secret-for-tests";

    fn create_issuer() -> TokenIssuer {
        TokenIssuer::new(
            ACCESS,
            REFRESH,
            Duration::from_secs(5 * 60),
            Duration::from_secs(3 * 86400),
        )
    }

    fn forge(secret: &[u8], id: &str, iat: i64, exp: i64) -> String {
        let claims = Claims {
            id: id.to_string(),
            iat,
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn test_access_roundtrip() {
        let issuer = create_issuer();
        let id = IdentityId::new("user_123");
        let (token, expires) = issuer.issue_access_token(&id).unwrap();

        assert!(expires > Utc::now());
        let claims = issuer.verify_access_token(&token).unwrap();
        assert_eq!(claims.identity_id(), id);
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn test_refresh_roundtrip() {
        let issuer = create_issuer();
        let id = IdentityId::new("user_123");
        let (token, _) = issuer.issue_refresh_token(&id).unwrap();

        let claims = issuer.verify_refresh_token(&token).unwrap();
        assert_eq!(claims.id, "user_123");
        assert_eq!(claims.exp - claims.iat, 3 * 86400);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = create_issuer();
        let now = Utc::now().timestamp();
        let token = forge(b"someone-else", "user_123", now, now + 300);

        assert!(matches!(
            issuer.verify_access_token(&token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            issuer.verify_refresh_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_secrets_are_not_interchangeable() {
        let issuer = create_issuer();
        let pair = issuer.issue_pair(&IdentityId::new("user_123")).unwrap();

        assert!(issuer.verify_access_token(&pair.refresh_token).is_err());
        assert!(issuer.verify_refresh_token(&pair.access_token).is_err());
    }

    #[test]
    fn test_expired_access_token_still_decodes() {
        let issuer = create_issuer();
        let now = Utc::now().timestamp();
        let token = forge(ACCESS, "user_123", now - 600, now - 300);

        let claims = issuer.verify_access_token(&token).unwrap();
        assert!(claims.is_expired());
    }

    #[test]
    fn test_expired_refresh_token() {
        let issuer = create_issuer();
        let now = Utc::now().timestamp();
        let token = forge(REFRESH, "user_123", now - 600, now - 10);

        assert!(matches!(
            issuer.verify_refresh_token(&token),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn test_malformed_token() {
        let issuer = create_issuer();
        assert!(matches!(
            issuer.verify_access_token("invalid.token.here"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            issuer.verify_refresh_token(""),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_secret_bytes() {
        assert_eq!(secret_bytes("00ff"), vec![0x00, 0xff]);
        assert_eq!(secret_bytes("not hex"), b"not hex".to_vec());
        assert_eq!(secret_bytes("abc"), b"abc".to_vec());
    }

    #[test]
    fn test_from_config_uses_configured_secrets() {
        let config = AuthConfig::builder()
            .access_token_secret("access-secret-for-tests")
            .refresh_token_secret("refresh-secret-for-tests")
            .build();
        let issuer = TokenIssuer::from_config(&config);

        let now = Utc::now().timestamp();
        let token = forge(ACCESS, "user_123", now, now + 60);
        assert!(issuer.verify_access_token(&token).is_ok());
    }

    #[test]
    fn test_unrepresentable_lifetime() {
        let issuer = TokenIssuer::new(ACCESS, REFRESH, Duration::MAX, Duration::from_secs(u64::MAX));
        let id = IdentityId::new("user_123");

        assert!(matches!(
            issuer.issue_access_token(&id),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            issuer.issue_refresh_token(&id),
            Err(AuthError::Config(_))
        ));
        assert!(issuer.issue_pair(&id).is_err());
    }

    #[test]
    fn test_expires_after() {
        let now = Utc::now();
        let exp = expires_after(now, Duration::from_secs(300)).unwrap();
        assert_eq!(exp.timestamp() - now.timestamp(), 300);
        assert!(expires_after(now, Duration::MAX).is_err());
    }
}
