//! Gateway server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::GatewayError;
use crate::auth::{AuthConfig, AuthState, MemorySessionCache, RedisSessionCache, SessionCache};
use crate::handlers;
use crate::mail::{LogMailer, Mailer};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Port to listen on.
    pub port: u16,
    /// Bind address.
    pub bind_address: String,
    /// Origins allowed to send credentialed requests.
    pub cors_origins: Vec<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Data directory for the credential store.
    pub data_dir: PathBuf,
    /// Redis URL. The in-process cache is used when unset.
    pub cache_url: Option<String>,
    /// Authentication configuration.
    pub auth: AuthConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let core = coursehub_core::config::GatewayConfig::default();
        Self {
            port: core.port,
            bind_address: core.bind_address(),
            cors_origins: core.cors_origins,
            timeout: Duration::from_secs(core.timeout_secs),
            data_dir: coursehub_core::Config::data_dir(),
            cache_url: None,
            auth: AuthConfig::default(),
        }
    }
}

impl From<&coursehub_core::Config> for GatewayConfig {
    fn from(config: &coursehub_core::Config) -> Self {
        let auth = AuthConfig {
            session_ttl_secs: config.cache.session_ttl_secs,
            ..AuthConfig::default()
        };

        Self {
            port: config.gateway.port,
            bind_address: config.gateway.bind_address(),
            cors_origins: config.gateway.cors_origins.clone(),
            timeout: Duration::from_secs(config.gateway.timeout_secs),
            data_dir: coursehub_core::Config::data_dir(),
            cache_url: config.cache.url.clone(),
            auth,
        }
    }
}

impl GatewayConfig {
    /// Apply overrides from environment variables.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("COURSEHUB_REDIS_URL") {
            if !url.is_empty() {
                self.cache_url = Some(url);
            }
        }
        self.auth = self.auth.with_env_overrides();
        self
    }
}

/// State shared by all handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Authentication state.
    pub auth: Arc<AuthState>,
}

impl FromRef<GatewayState> for Arc<AuthState> {
    fn from_ref(state: &GatewayState) -> Self {
        state.auth.clone()
    }
}

/// Gateway server.
pub struct Gateway {
    config: GatewayConfig,
    state: GatewayState,
}

/// Builder for constructing a Gateway with its dependencies.
pub struct GatewayBuilder {
    config: GatewayConfig,
    cache: Option<Arc<dyn SessionCache>>,
    mailer: Option<Arc<dyn Mailer>>,
    auth_state: Option<Arc<AuthState>>,
}

impl GatewayBuilder {
    /// Create a new builder with default config.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            cache: None,
            mailer: None,
            auth_state: None,
        }
    }

    /// Set gateway configuration.
    #[must_use]
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this session cache instead of the configured one.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the mailer.
    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Use prebuilt auth state. Cache and mailer settings are then ignored.
    #[must_use]
    pub fn with_auth_state(mut self, auth: Arc<AuthState>) -> Self {
        self.auth_state = Some(auth);
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns error if the data directory, credential store or session
    /// cache cannot be opened.
    pub async fn build(self) -> Result<Gateway, GatewayError> {
        let auth = match self.auth_state {
            Some(auth) => auth,
            None => {
                std::fs::create_dir_all(&self.config.data_dir).map_err(|e| {
                    GatewayError::Config(format!("Failed to create data dir: {e}"))
                })?;

                let cache = match self.cache {
                    Some(cache) => cache,
                    None => open_cache(self.config.cache_url.as_deref()).await?,
                };
                let mailer = self.mailer.unwrap_or_else(|| Arc::new(LogMailer));

                Arc::new(AuthState::initialize(
                    self.config.auth.clone(),
                    &self.config.data_dir,
                    cache,
                    mailer,
                )?)
            }
        };

        Ok(Gateway {
            config: self.config,
            state: GatewayState { auth },
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn open_cache(url: Option<&str>) -> Result<Arc<dyn SessionCache>, GatewayError> {
    match url {
        Some(url) => Ok(Arc::new(RedisSessionCache::connect(url).await?)),
        None => {
            tracing::warn!("No cache URL configured, keeping sessions in process memory");
            Ok(Arc::new(MemorySessionCache::new()))
        }
    }
}

impl Gateway {
    /// Create a gateway from config, opening the configured stores.
    ///
    /// # Errors
    ///
    /// Returns error if any store cannot be opened.
    pub async fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        GatewayBuilder::new().with_config(config).build().await
    }

    /// Shared handler state.
    #[must_use]
    pub const fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Build the HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/test", get(handlers::api_check))
            .nest("/api/v1", handlers::api_routes(self.state.auth.clone()))
            .fallback(handlers::not_found)
            .layer(TimeoutLayer::new(self.config.timeout))
            .layer(cors_layer(&self.config.cors_origins))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the gateway server until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or the listener fails.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let app = self.router();

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Gateway API listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_core() {
        let mut core = coursehub_core::Config::default();
        core.gateway.port = 9100;
        core.cache.url = Some("redis://cache:6379".to_string());
        core.cache.session_ttl_secs = 3600;

        let config = GatewayConfig::from(&core);
        assert_eq!(config.port, 9100);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.cache_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.auth.session_ttl_secs, 3600);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_build_with_memory_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = GatewayConfig {
            data_dir: dir.path().to_path_buf(),
            ..GatewayConfig::default()
        };

        let gateway = GatewayBuilder::new()
            .with_config(config)
            .with_cache(Arc::new(MemorySessionCache::new()))
            .build()
            .await
            .unwrap();

        assert!(gateway.state().auth.identities.is_empty());
    }
}
