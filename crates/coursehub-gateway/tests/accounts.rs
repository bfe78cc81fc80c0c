//! Registration, profile and admin endpoints.

mod common;

use axum::http::StatusCode;
use common::{Cookies, gateway};
use coursehub_gateway::{Role, SessionCache};
use pretty_assertions::assert_eq;
use serde_json::json;

async fn register(gw: &common::TestGateway, email: &str) -> (String, String) {
    let res = gw
        .post(
            "/api/v1/registration",
            &Cookies::default(),
            json!({ "name": "Bob", "email": email, "password": "hunter22" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);

    let code = gw.outbox.last_to(email).await.unwrap().data["activationCode"]
        .as_str()
        .unwrap()
        .to_string();
    (res.body["activationToken"].as_str().unwrap().to_string(), code)
}

#[tokio::test]
async fn test_registration_rejects_bad_input() {
    let gw = gateway().await;

    let res = gw
        .post(
            "/api/v1/registration",
            &Cookies::default(),
            json!({ "name": "Bob", "email": "not-an-email", "password": "hunter22" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "please enter a valid email");

    let res = gw
        .post(
            "/api/v1/registration",
            &Cookies::default(),
            json!({ "name": "Bob", "email": "bob@x.com", "password": "123" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    gw.seed("Bob", "bob@x.com", "hunter22", Role::User);
    let res = gw
        .post(
            "/api/v1/registration",
            &Cookies::default(),
            json!({ "name": "Bob", "email": "bob@x.com", "password": "hunter22" }),
        )
        .await;
    assert_eq!(res.message(), "Email already exists");
    assert!(gw.outbox.sent().await.is_empty());
}

#[tokio::test]
async fn test_activation_with_wrong_code() {
    let gw = gateway().await;
    let (token, code) = register(&gw, "bob@x.com").await;
    let wrong = if code == "1000" { "1001" } else { "1000" };

    let res = gw
        .post(
            "/api/v1/activate-user",
            &Cookies::default(),
            json!({ "activation_token": token, "activation_code": wrong }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid Activation Code");
    assert!(gw.auth.identities.is_empty());
}

#[tokio::test]
async fn test_activation_twice_is_rejected() {
    let gw = gateway().await;
    let (token, code) = register(&gw, "bob@x.com").await;
    let body = json!({ "activation_token": token, "activation_code": code });

    let res = gw.post("/api/v1/activate-user", &Cookies::default(), body.clone()).await;
    assert_eq!(res.status, StatusCode::CREATED);

    let bob = gw.auth.identities.get_by_email("bob@x.com").unwrap().unwrap();
    assert!(bob.is_verified);
    assert!(bob.verify_password("hunter22").is_ok());

    let res = gw.post("/api/v1/activate-user", &Cookies::default(), body).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Email already exists");
}

#[tokio::test]
async fn test_social_auth_creates_then_reuses_identity() {
    let gw = gateway().await;
    let body = json!({
        "email": "carol@x.com",
        "name": "Carol",
        "avatar": "https://img.example/carol.png",
    });

    let res = gw.post("/api/v1/social-auth", &Cookies::default(), body.clone()).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["avatar"]["url"], "https://img.example/carol.png");
    assert!(res.cookie("access_token").is_some());
    let first_id = res.body["user"]["id"].clone();

    let res = gw.post("/api/v1/social-auth", &Cookies::default(), body).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["id"], first_id);
    assert_eq!(gw.auth.identities.count(), 1);
}

#[tokio::test]
async fn test_update_info_mirrors_into_session() {
    let gw = gateway().await;
    let bob = gw.seed("Bob", "bob@x.com", "hunter22", Role::User);
    let cookies = gw.login("bob@x.com", "hunter22").await;

    let res = gw
        .put(
            "/api/v1/update-user-info",
            &cookies,
            json!({ "name": "Robert", "email": "robert@x.com" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["name"], "Robert");

    let record = gw.auth.sessions.load(&bob.id).await.unwrap().unwrap();
    assert_eq!(record.name, "Robert");
    assert_eq!(record.email, "robert@x.com");
    assert!(gw.auth.identities.get_by_email("bob@x.com").unwrap().is_none());
}

#[tokio::test]
async fn test_update_info_rejects_taken_email() {
    let gw = gateway().await;
    gw.seed("Bob", "bob@x.com", "hunter22", Role::User);
    gw.seed("Carol", "carol@x.com", "hunter22", Role::User);
    let cookies = gw.login("bob@x.com", "hunter22").await;

    let res = gw
        .put("/api/v1/update-user-info", &cookies, json!({ "email": "carol@x.com" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Email already exists");
}

#[tokio::test]
async fn test_update_password() {
    let gw = gateway().await;
    gw.seed("Bob", "bob@x.com", "hunter22", Role::User);
    let cookies = gw.login("bob@x.com", "hunter22").await;

    let res = gw
        .put(
            "/api/v1/update-user-password",
            &cookies,
            json!({ "oldPassword": "wrong-one", "newPassword": "hunter33" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid old password");

    let res = gw
        .put(
            "/api/v1/update-user-password",
            &cookies,
            json!({ "oldPassword": "hunter22", "newPassword": "hunter33" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    gw.login("bob@x.com", "hunter33").await;
}

#[tokio::test]
async fn test_password_change_for_social_identity() {
    let gw = gateway().await;
    let res = gw
        .post(
            "/api/v1/social-auth",
            &Cookies::default(),
            json!({ "email": "carol@x.com", "name": "Carol" }),
        )
        .await;
    let cookies = Cookies {
        access: res.cookie("access_token"),
        refresh: res.cookie("refresh_token"),
    };

    let res = gw
        .put(
            "/api/v1/update-user-password",
            &cookies,
            json!({ "oldPassword": "anything", "newPassword": "hunter33" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid User");
}

#[tokio::test]
async fn test_update_avatar() {
    let gw = gateway().await;
    let bob = gw.seed("Bob", "bob@x.com", "hunter22", Role::User);
    let cookies = gw.login("bob@x.com", "hunter22").await;

    let res = gw
        .put(
            "/api/v1/update-user-avatar",
            &cookies,
            json!({ "avatar": { "public_id": "avatars/bob", "url": "https://img.example/bob.png" } }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let record = gw.auth.sessions.load(&bob.id).await.unwrap().unwrap();
    assert_eq!(record.avatar.unwrap().url, "https://img.example/bob.png");
}

#[tokio::test]
async fn test_admin_changes_role() {
    let gw = gateway().await;
    gw.seed("Admin", "admin@x.com", "hunter22", Role::Admin);
    let bob = gw.seed("Bob", "bob@x.com", "hunter22", Role::User);
    let admin = gw.login("admin@x.com", "hunter22").await;
    gw.login("bob@x.com", "hunter22").await;

    let res = gw
        .put("/api/v1/update-user", &admin, json!({ "email": "bob@x.com", "role": "admin" }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["role"], "admin");

    let record = gw.auth.sessions.load(&bob.id).await.unwrap().unwrap();
    assert_eq!(record.role, Role::Admin);

    let res = gw
        .put("/api/v1/update-user", &admin, json!({ "email": "nobody@x.com", "role": "admin" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "User not found");
}

#[tokio::test]
async fn test_admin_delete_revokes_session() {
    let gw = gateway().await;
    gw.seed("Admin", "admin@x.com", "hunter22", Role::Admin);
    let bob = gw.seed("Bob", "bob@x.com", "hunter22", Role::User);
    let admin = gw.login("admin@x.com", "hunter22").await;
    let bob_cookies = gw.login("bob@x.com", "hunter22").await;

    let res = gw
        .delete(&format!("/api/v1/delete-user/{}", bob.id), &admin)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(gw.cache.get(bob.id.as_str()).await.unwrap().is_none());

    let res = gw.get("/api/v1/me", &bob_cookies).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = gw
        .delete(&format!("/api/v1/delete-user/{}", bob.id), &admin)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.message(), "User not found");
}

#[tokio::test]
async fn test_users_analytics() {
    let gw = gateway().await;
    gw.seed("Admin", "admin@x.com", "hunter22", Role::Admin);
    gw.seed("Bob", "bob@x.com", "hunter22", Role::User);
    let admin = gw.login("admin@x.com", "hunter22").await;

    let res = gw.get("/api/v1/get-users-analytics", &admin).await;
    assert_eq!(res.status, StatusCode::OK);

    let windows = res.body["users"]["last12Months"].as_array().unwrap();
    assert_eq!(windows.len(), 12);
    assert_eq!(windows[11]["count"], 2);
}
