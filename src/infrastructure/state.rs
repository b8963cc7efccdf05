//! Shared application state

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::ports::outbound::{CatalogRepositoryPort, ClockPort};
use crate::application::services::{
    CharacterServiceImpl, ClanServiceImpl, DomainExpansionServiceImpl, IdempotencyService,
    TechniqueServiceImpl,
};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::idempotency_store::InMemoryIdempotencyStore;
use crate::infrastructure::persistence::{connect_catalog, seed_sentinel_clan};
use crate::infrastructure::rate_limiter::FixedWindowRateLimiter;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    // Application services
    pub character_service: CharacterServiceImpl,
    pub clan_service: ClanServiceImpl,
    pub technique_service: TechniqueServiceImpl,
    pub domain_expansion_service: DomainExpansionServiceImpl,
    // Request pipeline
    pub idempotency: IdempotencyService,
    pub rate_limiter: FixedWindowRateLimiter,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let repository = connect_catalog(&config.storage, &config.sentinel_clan).await?;
        seed_sentinel_clan(repository.as_ref(), &config.sentinel_clan)
            .await
            .context("Failed to seed sentinel clan")?;

        Ok(Self::with_repository(config, repository, Arc::new(SystemClock)))
    }

    /// Wire services over an already prepared catalog
    pub fn with_repository(
        config: AppConfig,
        repository: Arc<dyn CatalogRepositoryPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let idempotency_store = Arc::new(InMemoryIdempotencyStore::new(
            config.idempotency.ttl,
            config.idempotency.max_entries,
        ));

        Self {
            character_service: CharacterServiceImpl::new(
                repository.clone(),
                config.sentinel_clan.clone(),
            ),
            clan_service: ClanServiceImpl::new(repository.clone(), config.sentinel_clan.clone()),
            technique_service: TechniqueServiceImpl::new(repository.clone()),
            domain_expansion_service: DomainExpansionServiceImpl::new(repository),
            idempotency: IdempotencyService::new(idempotency_store, clock.clone()),
            rate_limiter: FixedWindowRateLimiter::new(&config.rate_limit, clock),
            config,
        }
    }
}
