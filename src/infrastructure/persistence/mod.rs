//! Catalog persistence adapters
//!
//! Two interchangeable backends implement the catalog repository port: a
//! process-local in-memory store and SQLite. The backend is picked at
//! startup from configuration.

mod memory_repository;
mod sqlite_repository;

pub use memory_repository::InMemoryCatalogRepository;
pub use sqlite_repository::SqliteCatalogRepository;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::application::ports::outbound::CatalogRepositoryPort;
use crate::domain::entities::Clan;
use crate::domain::errors::CatalogError;
use crate::infrastructure::config::{StorageBackend, StorageConfig};

/// Build the configured catalog backend
pub async fn connect_catalog(
    config: &StorageConfig,
    sentinel_clan: &str,
) -> Result<Arc<dyn CatalogRepositoryPort>> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory catalog storage");
            Ok(Arc::new(InMemoryCatalogRepository::new(sentinel_clan)))
        }
        StorageBackend::Sqlite => {
            let options = SqliteConnectOptions::from_str(&config.database_url)
                .with_context(|| format!("Invalid DATABASE_URL: {}", config.database_url))?
                .create_if_missing(true)
                .busy_timeout(Duration::from_secs(5));
            // One connection serializes transactions, matching the in-memory backend
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await
                .context("Failed to open SQLite catalog database")?;
            let repository = SqliteCatalogRepository::new(pool)
                .await
                .context("Failed to initialize SQLite catalog schema")?;
            info!(url = %config.database_url, "Using SQLite catalog storage");
            Ok(Arc::new(repository))
        }
    }
}

/// Make sure the sentinel clan exists; returns it either way
pub async fn seed_sentinel_clan(
    repository: &dyn CatalogRepositoryPort,
    name: &str,
) -> Result<Clan, CatalogError> {
    let mut tx = repository.begin().await?;
    if let Some(existing) = tx.clan_by_name(name).await? {
        return Ok(existing);
    }

    let sentinel = Clan::new(name.trim(), "Characters without a clan");
    tx.save_clan(&sentinel).await?;
    tx.commit().await?;

    info!(clan_id = %sentinel.id, "Seeded sentinel clan: {}", sentinel.name);
    Ok(sentinel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let repository = InMemoryCatalogRepository::new("No Clan");

        let first = seed_sentinel_clan(&repository, "No Clan").await.unwrap();
        let second = seed_sentinel_clan(&repository, "no clan").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_connect_sqlite_in_memory() {
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            database_url: "sqlite::memory:".to_string(),
        };
        let repository = connect_catalog(&config, "No Clan").await.unwrap();
        let sentinel = seed_sentinel_clan(repository.as_ref(), "No Clan")
            .await
            .unwrap();

        let mut tx = repository.begin().await.unwrap();
        assert_eq!(tx.clan(sentinel.id).await.unwrap(), Some(sentinel));
    }
}
