//! Application configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Which catalog backend to run on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => bail!("CATALOG_STORAGE must be 'memory' or 'sqlite', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Only read by the SQLite backend
    pub database_url: String,
}

/// Fixed-window admission per client
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window: Duration,
}

/// Retention of recorded POST responses
#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server port
    pub server_port: u16,
    pub storage: StorageConfig,
    /// Name of the fallback clan for characters without one
    pub sentinel_clan: String,
    pub rate_limit: RateLimitConfig,
    pub idempotency: IdempotencyConfig,
    /// Largest request body accepted, in bytes
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                database_url: "sqlite://catalog.db?mode=rwc".to_string(),
            },
            sentinel_clan: "No Clan".to_string(),
            rate_limit: RateLimitConfig {
                limit: 12,
                window: Duration::from_secs(60),
            },
            idempotency: IdempotencyConfig {
                ttl: Duration::from_secs(86_400),
                max_entries: 10_000,
            },
            max_body_bytes: 1024 * 1024,
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let sentinel_clan = env::var("CATALOG_SENTINEL_CLAN")
            .map(|name| name.trim().to_string())
            .unwrap_or(defaults.sentinel_clan);
        if sentinel_clan.is_empty() {
            bail!("CATALOG_SENTINEL_CLAN cannot be blank");
        }

        let rate_limit = RateLimitConfig {
            limit: parsed("CATALOG_RATE_LIMIT", defaults.rate_limit.limit)?,
            window: Duration::from_secs(parsed(
                "CATALOG_RATE_WINDOW_SECS",
                defaults.rate_limit.window.as_secs(),
            )?),
        };
        if rate_limit.limit == 0 || rate_limit.window.is_zero() {
            bail!("CATALOG_RATE_LIMIT and CATALOG_RATE_WINDOW_SECS must be positive");
        }

        Ok(Self {
            server_port: env::var("CATALOG_PORT")
                .unwrap_or_else(|_| defaults.server_port.to_string())
                .parse()
                .context("CATALOG_PORT must be a valid port number")?,
            storage: StorageConfig {
                backend: match env::var("CATALOG_STORAGE") {
                    Ok(raw) => raw.parse()?,
                    Err(_) => defaults.storage.backend,
                },
                database_url: env::var("DATABASE_URL")
                    .unwrap_or(defaults.storage.database_url),
            },
            sentinel_clan,
            rate_limit,
            idempotency: IdempotencyConfig {
                ttl: Duration::from_secs(parsed(
                    "CATALOG_IDEMPOTENCY_TTL_SECS",
                    defaults.idempotency.ttl.as_secs(),
                )?),
                max_entries: parsed(
                    "CATALOG_IDEMPOTENCY_MAX_ENTRIES",
                    defaults.idempotency.max_entries,
                )?,
            },
            max_body_bytes: parsed("CATALOG_MAX_BODY_BYTES", defaults.max_body_bytes)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("Memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(" sqlite ".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.rate_limit.limit, 12);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }
}
