//! Administrator operations on identities.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use coursehub_core::IdentityId;

use crate::auth::{AuthError, AuthState, RequireAdmin, Role};

/// Length of one analytics window.
const WINDOW_DAYS: u64 = 28;
/// Number of analytics windows.
const WINDOW_COUNT: u64 = 12;

/// `GET /get-users`
pub(super) async fn list_users(
    State(auth): State<Arc<AuthState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse, AuthError> {
    let users = auth.identities.list()?;
    Ok(Json(json!({ "success": true, "users": users })))
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateRoleRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: String,
}

/// `PUT /update-user`
pub(super) async fn update_role(
    State(auth): State<Arc<AuthState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let role: Role = req.role.parse()?;
    let mut identity = auth
        .identities
        .get_by_email(&req.email)?
        .ok_or_else(|| AuthError::BadRequest("User not found".to_string()))?;

    identity.role = role;
    auth.identities.update(&identity)?;

    // A live session picks up the new role; a revoked one stays revoked.
    if auth.sessions.load(&identity.id).await?.is_some() {
        auth.sessions.write(&identity).await?;
    }

    tracing::info!(admin = %admin.id, identity = %identity.id, %role, "Changed role");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": identity })),
    ))
}

/// `DELETE /delete-user/{id}`
pub(super) async fn delete_user(
    State(auth): State<Arc<AuthState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    let id = IdentityId::new(id);
    if !auth.identities.delete(&id)? {
        return Err(AuthError::IdentityNotFound(id.to_string()));
    }
    auth.sessions.revoke(&id).await?;

    tracing::info!(admin = %admin.id, identity = %id, "Deleted identity");
    Ok(Json(json!({
        "success": true,
        "message": "User deleted succesfully",
    })))
}

/// Sign-ups within one window, labelled by the window's end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct WindowCount {
    month: String,
    count: usize,
}

/// `GET /get-users-analytics`
pub(super) async fn users_analytics(
    State(auth): State<Arc<AuthState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse, AuthError> {
    let created: Vec<_> = auth
        .identities
        .list()?
        .into_iter()
        .map(|i| i.created_at)
        .collect();

    Ok(Json(json!({
        "success": true,
        "users": { "last12Months": sign_up_windows(&created, Utc::now()) },
    })))
}

/// Count timestamps in the last twelve 28-day windows, oldest first.
///
/// The newest window ends at the start of the day after `now`.
pub(crate) fn sign_up_windows(created: &[DateTime<Utc>], now: DateTime<Utc>) -> Vec<WindowCount> {
    let tomorrow = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or_else(|| now.date_naive())
        .and_time(NaiveTime::MIN)
        .and_utc();

    (0..WINDOW_COUNT)
        .rev()
        .filter_map(|i| {
            let end = tomorrow.checked_sub_days(Days::new(i * WINDOW_DAYS))?;
            let start = end.checked_sub_days(Days::new(WINDOW_DAYS))?;
            let count = created.iter().filter(|t| **t >= start && **t < end).count();
            Some(WindowCount {
                month: end.format("%-d %b %Y").to_string(),
                count,
            })
        })
        .collect()
}
