//! Authentication gate, refresh flow and request extractors.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Serialize;

use super::AuthError;
use super::activation::ActivationIssuer;
use super::cache::SessionCache;
use super::config::AuthConfig;
use super::cookies;
use super::identity::{Identity, IdentityStore};
use super::roles::RoleGate;
use super::session::{SessionRecord, SessionStore};
use super::tokens::{TokenIssuer, TokenPair};
use crate::mail::Mailer;

/// Shared authentication state.
pub struct AuthState {
    /// Auth configuration.
    pub config: AuthConfig,
    /// Access/refresh token issuer.
    pub tokens: TokenIssuer,
    /// Registration ticket issuer.
    pub activation: ActivationIssuer,
    /// Credential store.
    pub identities: IdentityStore,
    /// Session records.
    pub sessions: SessionStore,
    /// Outbound mail.
    pub mailer: Arc<dyn Mailer>,
}

impl AuthState {
    /// Create auth state, generating any secret the config leaves unset.
    #[must_use]
    pub fn new(
        config: AuthConfig,
        identities: IdentityStore,
        cache: Arc<dyn SessionCache>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let tokens = TokenIssuer::from_config(&config);
        let activation = ActivationIssuer::from_config(&config);
        let sessions = SessionStore::new(cache, config.session_ttl());

        Self {
            config,
            tokens,
            activation,
            identities,
            sessions,
            mailer,
        }
    }

    /// Open the credential store under `data_dir` and build auth state.
    ///
    /// # Errors
    ///
    /// Returns error if the credential store cannot be opened.
    pub fn initialize(
        config: AuthConfig,
        data_dir: &Path,
        cache: Arc<dyn SessionCache>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        let identities = IdentityStore::open(data_dir)?;
        Ok(Self::new(config, identities, cache, mailer))
    }

    /// Set both token cookies.
    ///
    /// Both cookies live as long as the refresh token, so an expired access
    /// token still reaches the gate and can be refreshed silently.
    #[must_use]
    pub fn set_token_cookies(&self, jar: CookieJar, tokens: &TokenPair) -> CookieJar {
        let secure = self.config.secure_cookies;
        jar.add(cookies::access_cookie(
            &tokens.access_token,
            self.tokens.refresh_ttl(),
            secure,
        ))
        .add(cookies::refresh_cookie(
            &tokens.refresh_token,
            self.tokens.refresh_ttl(),
            secure,
        ))
    }

    /// Issue tokens for an identity, write its session record and set the
    /// cookies. Any previous session of the identity is replaced.
    ///
    /// # Errors
    ///
    /// Returns error if token issuing or the cache write fails.
    pub async fn sign_in(
        &self,
        identity: &Identity,
        jar: CookieJar,
    ) -> Result<(CookieJar, TokenPair), AuthError> {
        let tokens = self.tokens.issue_pair(&identity.id)?;
        self.sessions.write(identity).await?;
        tracing::info!(identity = %identity.id, "Signed in");
        Ok((self.set_token_cookies(jar, &tokens), tokens))
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .field("identities", &self.identities)
            .finish_non_exhaustive()
    }
}

/// Result of a successful refresh. The caller decides whether to answer
/// with it directly or continue with the original request.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Session record, rewritten with a fresh lifetime.
    pub record: SessionRecord,
    /// Newly issued tokens.
    pub tokens: TokenPair,
}

impl RefreshOutcome {
    /// Set both new token cookies.
    #[must_use]
    pub fn apply(&self, state: &AuthState, jar: CookieJar) -> CookieJar {
        state.set_token_cookies(jar, &self.tokens)
    }
}

/// Mint new tokens from the refresh token cookie and extend the session.
///
/// # Errors
///
/// Returns `RefreshFailed` when the refresh token is missing, tampered or
/// expired, and `SessionNotFound` when the identity has no session record.
pub async fn refresh_session(
    state: &AuthState,
    jar: &CookieJar,
) -> Result<RefreshOutcome, AuthError> {
    let token = cookies::refresh_token(jar).ok_or(AuthError::RefreshFailed)?;
    let claims = state.tokens.verify_refresh_token(&token).map_err(|e| {
        tracing::debug!("Refresh rejected: {e:?}");
        AuthError::RefreshFailed
    })?;

    let id = claims.identity_id();
    let record = state
        .sessions
        .load(&id)
        .await?
        .ok_or(AuthError::SessionNotFound)?;

    let tokens = state.tokens.issue_pair(&id)?;
    state.sessions.write_record(&record).await?;
    tracing::debug!(identity = %id, "Refreshed session");

    Ok(RefreshOutcome { record, tokens })
}

/// A request identity resolved by [`authenticate`].
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Session record of the caller.
    pub record: SessionRecord,
    /// Set when the access token had expired and was silently refreshed.
    pub refreshed: Option<RefreshOutcome>,
}

/// Resolve the caller from the token cookies.
///
/// An expired access token triggers [`refresh_session`] in-line instead of
/// failing.
///
/// # Errors
///
/// Returns `NoToken`, `InvalidToken` or `SessionNotFound`, or whatever the
/// refresh flow fails with.
pub async fn authenticate(state: &AuthState, jar: &CookieJar) -> Result<Authenticated, AuthError> {
    let token = cookies::access_token(jar).ok_or(AuthError::NoToken)?;
    let claims = state.tokens.verify_access_token(&token)?;

    if claims.is_expired() {
        let outcome = refresh_session(state, jar).await?;
        return Ok(Authenticated {
            record: outcome.record.clone(),
            refreshed: Some(outcome),
        });
    }

    let record = state
        .sessions
        .load(&claims.identity_id())
        .await?
        .ok_or(AuthError::SessionNotFound)?;

    Ok(Authenticated {
        record,
        refreshed: None,
    })
}

/// Middleware guarding routes that need a logged-in caller.
///
/// Puts the caller's [`SessionRecord`] into request extensions, runs the
/// route, and sets new token cookies on the response if the access token
/// was refreshed on the way in. A route that writes token cookies itself
/// (logout) keeps its own.
pub async fn require_session(
    State(auth): State<Arc<AuthState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&auth, &jar).await {
        Ok(Authenticated { record, refreshed }) => {
            request.extensions_mut().insert(record);
            let response = next.run(request).await;
            match refreshed {
                Some(outcome) if !sets_token_cookie(&response) => {
                    (outcome.apply(&auth, jar), response).into_response()
                }
                _ => response,
            }
        }
        Err(e) => e.into_response(),
    }
}

fn sets_token_cookie(response: &Response) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split_once('=').map(|(name, _)| name.trim()))
        .any(|name| name == cookies::ACCESS_TOKEN_COOKIE || name == cookies::REFRESH_TOKEN_COOKIE)
}

/// Error body for every failed request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl AuthError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) | Self::IdentityNotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Cache(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        } else {
            tracing::debug!("Request rejected: {self:?}");
        }

        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Extractor for the caller resolved by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionRecord);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionRecord>()
            .cloned()
            .map(Self)
            .ok_or(AuthError::NoToken)
    }
}

/// Extractor admitting administrators only.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub SessionRecord);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let record = parts.extensions.get::<SessionRecord>();
        RoleGate::admin().check(record)?;
        record.cloned().map(Self).ok_or(AuthError::NoToken)
    }
}
