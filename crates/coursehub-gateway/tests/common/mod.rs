//! Shared helpers for gateway HTTP tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use coursehub_gateway::auth::Claims;
use coursehub_gateway::{
    AuthConfig, AuthState, Gateway, GatewayBuilder, GatewayConfig, Identity, MemorySessionCache,
    OutboxMailer, Role,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";

pub struct TestGateway {
    _dir: TempDir,
    pub app: Router,
    pub auth: Arc<AuthState>,
    pub cache: Arc<MemorySessionCache>,
    pub outbox: Arc<OutboxMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub cookies: Vec<String>,
    pub body: Value,
}

impl TestResponse {
    /// Value of a cookie set by the response.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.iter().find_map(|c| {
            let pair = c.split(';').next()?;
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name).then(|| value.to_string())
        })
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

pub async fn gateway() -> TestGateway {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(MemorySessionCache::new());
    let outbox = Arc::new(OutboxMailer::new());

    let config = GatewayConfig {
        data_dir: dir.path().to_path_buf(),
        timeout: Duration::from_secs(3600),
        auth: AuthConfig::builder()
            .access_token_secret(ACCESS_SECRET)
            .refresh_token_secret(REFRESH_SECRET)
            .activation_secret("test-activation-secret")
            .build(),
        ..GatewayConfig::default()
    };

    let gateway: Gateway = GatewayBuilder::new()
        .with_config(config)
        .with_cache(cache.clone())
        .with_mailer(outbox.clone())
        .build()
        .await
        .unwrap();

    TestGateway {
        app: gateway.router(),
        auth: gateway.state().auth.clone(),
        _dir: dir,
        cache,
        outbox,
    }
}

impl TestGateway {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            cookies,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookies: &Cookies) -> TestResponse {
        self.send(request("GET", uri, cookies, None)).await
    }

    pub async fn post(&self, uri: &str, cookies: &Cookies, body: Value) -> TestResponse {
        self.send(request("POST", uri, cookies, Some(body))).await
    }

    pub async fn put(&self, uri: &str, cookies: &Cookies, body: Value) -> TestResponse {
        self.send(request("PUT", uri, cookies, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, cookies: &Cookies) -> TestResponse {
        self.send(request("DELETE", uri, cookies, None)).await
    }

    /// Store an identity directly, bypassing registration.
    pub fn seed(&self, name: &str, email: &str, password: &str, role: Role) -> Identity {
        let identity = Identity::new(name, email, password, role).unwrap();
        self.auth.identities.create(&identity).unwrap();
        identity
    }

    /// Log in over HTTP and return the token cookies.
    pub async fn login(&self, email: &str, password: &str) -> Cookies {
        let res = self
            .post(
                "/api/v1/login",
                &Cookies::default(),
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.body);

        Cookies {
            access: res.cookie("access_token"),
            refresh: res.cookie("refresh_token"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cookies {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl Cookies {
    fn header(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(token) = &self.access {
            parts.push(format!("access_token={token}"));
        }
        if let Some(token) = &self.refresh {
            parts.push(format!("refresh_token={token}"));
        }
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

fn request(method: &str, uri: &str, cookies: &Cookies, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookies.header() {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sign a token with arbitrary timestamps.
pub fn forge_token(secret: &str, id: &str, exp_offset_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        id: id.to_string(),
        iat: now - 3600,
        exp: now + exp_offset_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
