//! Service configuration.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file named
//! by `EATERY_CONFIG`, then individual `EATERY_*` environment variables.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [database]
//! mongodb_uri = "mongodb://localhost:27017"
//! name = "eatery"
//!
//! [auth]
//! jwt_secret = "change-me"
//! issuer = "eatery"
//! token_ttl_minutes = 60
//! ```

use std::{path::Path, str::FromStr};
use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// MongoDB connection string. The in-memory backend is used when unset.
    #[serde(default)]
    pub mongodb_uri: Option<String>,

    #[serde(default = "default_database")]
    pub name: String,
}

fn default_database() -> String {
    "eatery".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            mongodb_uri: None,
            name: default_database(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the identity service.
    #[serde(default = "default_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Lifetime of tokens minted by this service.
    #[serde(default = "default_ttl")]
    pub token_ttl_minutes: i64,
}

fn default_secret() -> String {
    "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string()
}

fn default_issuer() -> String {
    "eatery".to_string()
}

fn default_ttl() -> i64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_secret(),
            issuer: default_issuer(),
            token_ttl_minutes: default_ttl(),
        }
    }
}

impl AuthConfig {
    /// Token lifetime, rejecting minute counts `chrono` cannot represent.
    pub fn token_ttl(&self) -> Result<Duration, ConfigError> {
        Duration::try_minutes(self.token_ttl_minutes).ok_or_else(|| ConfigError::InvalidValue {
            key: "auth.token_ttl_minutes",
            value: self.token_ttl_minutes.to_string(),
        })
    }
}

impl AppConfig {
    /// Loads the configuration from `EATERY_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("EATERY_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        base.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config: AppConfig = toml::from_str(&raw)?;
        config.auth.token_ttl()?;

        Ok(config)
    }

    /// Applies `EATERY_*` overrides read through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(host) = lookup("EATERY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("EATERY_PORT") {
            self.server.port = parse("EATERY_PORT", port)?;
        }
        if let Some(uri) = lookup("EATERY_MONGODB_URI") {
            self.database.mongodb_uri = Some(uri).filter(|uri| !uri.is_empty());
        }
        if let Some(name) = lookup("EATERY_DATABASE") {
            self.database.name = name;
        }
        if let Some(secret) = lookup("EATERY_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(issuer) = lookup("EATERY_JWT_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Some(ttl) = lookup("EATERY_JWT_TTL_MINUTES") {
            self.auth.token_ttl_minutes = parse("EATERY_JWT_TTL_MINUTES", ttl.clone())?;
            if self.auth.token_ttl().is_err() {
                return Err(ConfigError::InvalidValue { key: "EATERY_JWT_TTL_MINUTES", value: ttl });
            }
        }

        Ok(self)
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.socket_addr(), "0.0.0.0:8000");
        assert_eq!(config.database.name, "eatery");
        assert!(config.database.mongodb_uri.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [database]
            mongodb_uri = "mongodb://db:27017"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.mongodb_uri.as_deref(), Some("mongodb://db:27017"));
        assert_eq!(config.auth.issuer, "eatery");
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            ("EATERY_PORT", "3000"),
            ("EATERY_JWT_SECRET", "s3cret"),
            ("EATERY_MONGODB_URI", ""),
        ]);

        let config = AppConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert!(config.database.mongodb_uri.is_none());
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let err = AppConfig::default()
            .with_overrides(|key| (key == "EATERY_PORT").then(|| "eighty".to_string()))
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { key: "EATERY_PORT", .. }));
    }

    #[test]
    fn test_out_of_range_token_ttl_is_rejected() {
        let err = AppConfig::default()
            .with_overrides(|key| (key == "EATERY_JWT_TTL_MINUTES").then(|| i64::MAX.to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "EATERY_JWT_TTL_MINUTES", .. }));

        let auth = AuthConfig { token_ttl_minutes: i64::MIN, ..AuthConfig::default() };
        assert!(matches!(auth.token_ttl(), Err(ConfigError::InvalidValue { key: "auth.token_ttl_minutes", .. })));

        assert_eq!(AuthConfig::default().token_ttl().unwrap(), Duration::minutes(60));
    }
}
