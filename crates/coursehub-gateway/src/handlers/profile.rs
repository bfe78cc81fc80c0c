//! The caller's own profile.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use coursehub_core::{validate_email, validate_name, validate_password};

use crate::auth::{AuthError, AuthState, Avatar, CurrentUser, Identity, SessionRecord};

fn load_identity(auth: &AuthState, record: &SessionRecord) -> Result<Identity, AuthError> {
    auth.identities
        .get(&record.id)?
        .ok_or_else(|| AuthError::IdentityNotFound(record.id.to_string()))
}

/// Persist a profile change and mirror it into the session record.
async fn save(auth: &AuthState, identity: &Identity) -> Result<(), AuthError> {
    auth.identities.update(identity)?;
    auth.sessions.write(identity).await?;
    Ok(())
}

/// `GET /me`
pub(super) async fn me(
    State(auth): State<Arc<AuthState>>,
    CurrentUser(record): CurrentUser,
) -> Result<impl IntoResponse, AuthError> {
    let identity = load_identity(&auth, &record)?;
    Ok(Json(json!({ "success": true, "user": identity })))
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateInfoRequest {
    name: Option<String>,
    email: Option<String>,
}

/// `PUT /update-user-info`
pub(super) async fn update_info(
    State(auth): State<Arc<AuthState>>,
    CurrentUser(record): CurrentUser,
    Json(req): Json<UpdateInfoRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let mut identity = load_identity(&auth, &record)?;

    if let Some(email) = req.email.filter(|e| !e.trim().is_empty()) {
        let email = validate_email(&email)?;
        if let Some(owner) = auth.identities.get_by_email(&email)? {
            if owner.id != identity.id {
                return Err(AuthError::IdentityExists(email));
            }
        }
        identity.email = email;
    }

    if let Some(name) = req.name.filter(|n| !n.trim().is_empty()) {
        identity.name = validate_name(&name)?;
    }

    save(&auth, &identity).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": identity })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdatePasswordRequest {
    old_password: Option<String>,
    new_password: Option<String>,
}

/// `PUT /update-user-password`
pub(super) async fn update_password(
    State(auth): State<Arc<AuthState>>,
    CurrentUser(record): CurrentUser,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let (Some(old_password), Some(new_password)) = (
        req.old_password.filter(|p| !p.is_empty()),
        req.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AuthError::BadRequest(
            "Please enter old and new password".to_string(),
        ));
    };

    let mut identity = load_identity(&auth, &record)?;
    if !identity.has_password() {
        return Err(AuthError::BadRequest("Invalid User".to_string()));
    }
    identity
        .verify_password(&old_password)
        .map_err(|_| AuthError::BadRequest("Invalid old password".to_string()))?;

    validate_password(&new_password)?;
    identity.set_password(&new_password)?;

    save(&auth, &identity).await?;
    tracing::info!(identity = %identity.id, "Password changed");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": identity })),
    ))
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateAvatarRequest {
    avatar: Option<Avatar>,
}

/// `PUT /update-user-avatar`
pub(super) async fn update_avatar(
    State(auth): State<Arc<AuthState>>,
    CurrentUser(record): CurrentUser,
    Json(req): Json<UpdateAvatarRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let mut identity = load_identity(&auth, &record)?;

    if let Some(avatar) = req.avatar.filter(|a| !a.url.is_empty()) {
        identity.avatar = Some(avatar);
        save(&auth, &identity).await?;
    }

    Ok(Json(json!({ "success": true, "user": identity })))
}
