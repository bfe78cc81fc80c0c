//! REST handlers for accounts.
//!
//! Every handler answers with a JSON body carrying `"success"`. Failures go
//! through [`AuthError`](crate::auth::AuthError)'s response conversion.

mod account;
mod admin;
mod profile;

use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::auth::{AuthState, require_session};
use crate::server::GatewayState;

/// Routes mounted under `/api/v1`.
pub fn api_routes(auth: Arc<AuthState>) -> Router<GatewayState> {
    let public = Router::new()
        .route("/registration", post(account::register))
        .route("/activate-user", post(account::activate))
        .route("/login", post(account::login))
        .route("/refresh", get(account::refresh))
        .route("/social-auth", post(account::social_auth));

    let protected = Router::new()
        .route("/logout", get(account::logout))
        .route("/me", get(profile::me))
        .route("/update-user-info", put(profile::update_info))
        .route("/update-user-password", put(profile::update_password))
        .route("/update-user-avatar", put(profile::update_avatar))
        .route("/get-users", get(admin::list_users))
        .route("/update-user", put(admin::update_role))
        .route("/delete-user/{id}", delete(admin::delete_user))
        .route("/get-users-analytics", get(admin::users_analytics))
        .route_layer(middleware::from_fn_with_state(auth, require_session));

    public.merge(protected)
}

pub(crate) async fn health() -> &'static str {
    "OK"
}

pub(crate) async fn api_check() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "API is working",
    }))
}

pub(crate) async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route {uri} not found"),
        })),
    )
}
