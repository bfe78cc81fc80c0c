//! Registration, sign-in and sign-out.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use coursehub_core::{validate_email, validate_name, validate_password};

use crate::auth::cookies::clear_token_cookies;
use crate::auth::{
    AuthError, AuthState, Avatar, CurrentUser, Identity, Registration, Role, hash_password,
    refresh_session,
};
use crate::mail::MailMessage;

#[derive(Debug, Deserialize)]
pub(super) struct RegistrationRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// `POST /registration`
pub(super) async fn register(
    State(auth): State<Arc<AuthState>>,
    Json(req): Json<RegistrationRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let name = validate_name(&req.name)?;
    let email = validate_email(&req.email)?;
    validate_password(&req.password)?;

    if auth.identities.get_by_email(&email)?.is_some() {
        return Err(AuthError::IdentityExists(email));
    }

    let ticket = auth.activation.issue(Registration {
        name: name.clone(),
        email: email.clone(),
        password_hash: hash_password(&req.password)?,
    })?;

    auth.mailer
        .send(MailMessage {
            to: email.clone(),
            subject: "Activate your account".to_string(),
            template: "activation-mail".to_string(),
            data: json!({
                "user": { "name": name },
                "activationCode": ticket.activation_code,
            }),
        })
        .await?;

    tracing::info!(email = %email, "Registration pending activation");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("Please check your email: {email} to activate your account!"),
            "activationToken": ticket.token,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub(super) struct ActivationRequest {
    #[serde(default)]
    activation_token: String,
    #[serde(default)]
    activation_code: String,
}

/// `POST /activate-user`
pub(super) async fn activate(
    State(auth): State<Arc<AuthState>>,
    Json(req): Json<ActivationRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let registration = auth
        .activation
        .verify(&req.activation_token, &req.activation_code)?;

    let mut identity = Identity::without_password(registration.name, &registration.email, Role::User);
    identity.password_hash = Some(registration.password_hash);
    identity.is_verified = true;
    auth.identities.create(&identity)?;

    tracing::info!(identity = %identity.id, "Activated identity");
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

/// `POST /login`
pub(super) async fn login(
    State(auth): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let (Some(email), Some(password)) = (
        req.email.filter(|e| !e.trim().is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AuthError::MissingCredentials);
    };

    let identity = auth
        .identities
        .get_by_email(&email)?
        .ok_or(AuthError::InvalidCredentials)?;
    identity.verify_password(&password)?;

    let (jar, tokens) = auth.sign_in(&identity, jar).await?;
    Ok((
        jar,
        Json(json!({
            "success": true,
            "user": identity,
            "accessToken": tokens.access_token,
        })),
    ))
}

/// `GET /logout`
pub(super) async fn logout(
    State(auth): State<Arc<AuthState>>,
    CurrentUser(record): CurrentUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let jar = clear_token_cookies(jar, auth.config.secure_cookies);
    auth.sessions.revoke(&record.id).await?;
    tracing::info!(identity = %record.id, "Logged out");

    Ok((
        jar,
        Json(json!({
            "success": true,
            "message": "Logged Out Successfully",
        })),
    ))
}

/// `GET /refresh`
pub(super) async fn refresh(
    State(auth): State<Arc<AuthState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let outcome = refresh_session(&auth, &jar).await?;
    let jar = outcome.apply(&auth, jar);

    Ok((
        jar,
        Json(json!({
            "success": true,
            "accessToken": outcome.tokens.access_token,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub(super) struct SocialAuthRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    avatar: Option<String>,
}

/// `POST /social-auth`
pub(super) async fn social_auth(
    State(auth): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(req): Json<SocialAuthRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let email = validate_email(&req.email)?;

    let identity = match auth.identities.get_by_email(&email)? {
        Some(existing) => existing,
        None => {
            let mut identity = Identity::without_password(validate_name(&req.name)?, &email, Role::User);
            identity.avatar = req
                .avatar
                .filter(|url| !url.is_empty())
                .map(|url| Avatar {
                    public_id: String::new(),
                    url,
                });
            identity.is_verified = true;
            auth.identities.create(&identity)?;
            tracing::info!(identity = %identity.id, "Created identity from social sign-in");
            identity
        }
    };

    let (jar, tokens) = auth.sign_in(&identity, jar).await?;
    Ok((
        jar,
        Json(json!({
            "success": true,
            "user": identity,
            "accessToken": tokens.access_token,
        })),
    ))
}
