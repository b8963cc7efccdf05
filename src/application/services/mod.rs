//! Application services - Use case implementations
//!
//! Each entity service runs its use cases inside one catalog transaction and
//! routes every relationship change through the integrity rules of the domain.

pub mod catalog_views;
pub mod character_service;
pub mod clan_service;
pub mod domain_expansion_service;
pub mod idempotency_service;
pub mod reference_resolver;
pub mod technique_service;
pub mod validation;

pub use catalog_views::{CharacterView, ClanView, TechniqueView};
pub use character_service::{CharacterInput, CharacterService, CharacterServiceImpl};
pub use clan_service::{ClanInput, ClanService, ClanServiceImpl};
pub use domain_expansion_service::{
    DomainExpansionInput, DomainExpansionService, DomainExpansionServiceImpl,
};
pub use idempotency_service::{Admission, IdempotencyService};
pub use technique_service::{TechniqueInput, TechniqueService, TechniqueServiceImpl};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::application::ports::outbound::CatalogRepositoryPort;
    use crate::infrastructure::persistence::{seed_sentinel_clan, InMemoryCatalogRepository};

    pub const SENTINEL: &str = "No Clan";

    /// Empty in-memory catalog holding only the sentinel clan
    pub async fn catalog() -> Arc<dyn CatalogRepositoryPort> {
        let repository: Arc<dyn CatalogRepositoryPort> =
            Arc::new(InMemoryCatalogRepository::new(SENTINEL));
        seed_sentinel_clan(repository.as_ref(), SENTINEL)
            .await
            .unwrap();
        repository
    }
}
