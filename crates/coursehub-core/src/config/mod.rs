//! Configuration loading and validation.
//!
//! Config is JSON5 so operators can keep comments next to values.
//! Config location: `~/.coursehub/coursehub.json`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Seven days, the lifetime of a cached session record.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 3600;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Global settings.
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns error if config cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("coursehub.json")
    }

    /// Get the `CourseHub` state directory.
    ///
    /// Uses `COURSEHUB_STATE_DIR` env var if set, otherwise `~/.coursehub`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("COURSEHUB_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".coursehub")
        } else {
            PathBuf::from(".coursehub")
        }
    }

    /// Directory holding the credential store.
    #[must_use]
    pub fn data_dir() -> PathBuf {
        Self::state_dir().join("data")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::Validation(
                "Gateway port cannot be 0".to_string(),
            ));
        }

        if self.cache.session_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "Session TTL cannot be 0".to_string(),
            ));
        }

        if let Some(url) = &self.cache.url {
            if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                return Err(ConfigError::Validation(format!(
                    "Cache URL must use redis:// or rediss://, got '{url}'"
                )));
            }
        }

        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address mode.
    #[serde(default)]
    pub mode: BindMode,

    /// Origins allowed to send credentialed requests.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            mode: BindMode::default(),
            cors_origins: default_cors_origins(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Resolve the bind mode to an address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        match &self.mode {
            BindMode::Local => "127.0.0.1".to_string(),
            BindMode::Public => "0.0.0.0".to_string(),
            BindMode::Custom(addr) => addr.clone(),
        }
    }
}

const fn default_port() -> u16 {
    8000
}

const fn default_timeout() -> u64 {
    30
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

/// Gateway bind mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Bind to localhost only.
    #[default]
    Local,
    /// Bind to all interfaces.
    Public,
    /// Custom bind address.
    Custom(String),
}

/// Session cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Redis URL. The in-process cache is used when unset.
    #[serde(default)]
    pub url: Option<String>,

    /// Lifetime of a session record in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            session_ttl_secs: default_session_ttl(),
        }
    }
}

const fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

/// Global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Enable debug logging.
    #[serde(default)]
    pub debug: bool,

    /// Log format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.cache.session_ttl_secs, 604_800);
        assert_eq!(config.gateway.cors_origins, vec!["http://localhost:3000"]);
        assert!(config.cache.url.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");

        let mut config = Config::default();
        config.cache.url = Some("redis://localhost:6379".to_string());
        config.gateway.port = 9100;

        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.cache.url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(loaded.gateway.port, 9100);
    }

    #[test]
    fn test_json5_parsing() {
        let json5_content = r#"{
            // Local development
            gateway: {
                port: 8080,
                mode: "public",
            },
            cache: {
                sessionTtlSecs: 3600,
            },
            settings: { logFormat: "json" },
        }"#;

        let config: Config = json5::from_str(json5_content).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.bind_address(), "0.0.0.0");
        assert_eq!(config.cache.session_ttl_secs, 3600);
        assert_eq!(config.settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.gateway.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.session_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.url = Some("http://localhost:6379".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_bind_mode() {
        let config: GatewayConfig = json5::from_str(r#"{ mode: { custom: "10.0.0.5" } }"#).unwrap();
        assert_eq!(config.bind_address(), "10.0.0.5");
    }
}
