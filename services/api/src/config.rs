//! Service configuration
//!
//! Defaults are layered under environment variables prefixed with `ROAM__`,
//! using `__` between nested keys, e.g. `ROAM__SERVER__PORT=8080` or
//! `ROAM__PROXY__UNSPLASH_ACCESS_KEY=...`.

use common::cache::RedisConfig;
use common::database::DatabaseConfig;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    #[serde(default)]
    pub auth: AuthConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

impl From<&DatabaseSettings> for DatabaseConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        DatabaseConfig {
            database_url: settings.url.clone(),
            max_connections: settings.max_connections,
            acquire_timeout: settings.acquire_timeout,
        }
    }
}

/// Redis is optional; without a URL the proxy responses are not cached
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    pub url: Option<String>,
    pub cache_ttl_seconds: u64,
}

impl RedisSettings {
    pub fn redis_config(&self) -> Option<RedisConfig> {
        self.url.as_ref().map(|url| RedisConfig {
            url: url.clone(),
            default_ttl_seconds: self.cache_ttl_seconds,
        })
    }
}

/// Access token verification settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// RS256 public key, inline PEM or path to a PEM file
    pub jwt_public_key: Option<String>,
    /// HS256 shared secret, used when no public key is set
    pub jwt_secret: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub geoapify_api_key: Option<String>,
    pub unsplash_access_key: Option<String>,
    pub geoapify_base_url: String,
    pub unsplash_base_url: String,
    pub timeout_seconds: u64,
}

impl AppConfig {
    /// Load configuration from defaults and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix("ROAM").separator("__"))
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let database_defaults = DatabaseConfig::default();

        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("database.url", database_defaults.database_url)?
            .set_default(
                "database.max_connections",
                i64::from(database_defaults.max_connections),
            )?
            .set_default(
                "database.acquire_timeout",
                i64::try_from(database_defaults.acquire_timeout).unwrap_or(i64::MAX),
            )?
            .set_default("redis.cache_ttl_seconds", 3600)?
            .set_default(
                "proxy.geoapify_base_url",
                "https://api.geoapify.com/v1/geocode/reverse",
            )?
            .set_default(
                "proxy.unsplash_base_url",
                "https://api.unsplash.com/search/photos",
            )?
            .set_default("proxy.timeout_seconds", 10)?
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
