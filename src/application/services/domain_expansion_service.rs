//! Domain Expansion Service - Application service for domain expansions
//!
//! Ownership is assigned from the character side. This service manages the
//! expansion's own fields and keeps the owner consistent on delete.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::application::ports::outbound::{CatalogRepositoryPort, ListQuery, Page};
use crate::application::services::validation::{
    optional_text, require_name, MAX_EFFECT, MAX_EXPANSION_NAME,
};
use crate::domain::entities::DomainExpansion;
use crate::domain::errors::CatalogError;
use crate::domain::services::integrity;
use crate::domain::value_objects::{CharacterId, DomainExpansionId};

#[derive(Debug, Clone, Default)]
pub struct DomainExpansionInput {
    pub name: String,
    pub effect: Option<String>,
}

#[async_trait]
pub trait DomainExpansionService: Send + Sync {
    /// Create an unowned expansion
    async fn create_domain_expansion(
        &self,
        input: DomainExpansionInput,
    ) -> Result<DomainExpansion, CatalogError>;

    async fn get_domain_expansion(
        &self,
        id: DomainExpansionId,
    ) -> Result<Option<DomainExpansion>, CatalogError>;

    async fn list_domain_expansions(
        &self,
        query: ListQuery,
    ) -> Result<Page<DomainExpansion>, CatalogError>;

    /// Change name and effect; ownership is left untouched
    async fn update_domain_expansion(
        &self,
        id: DomainExpansionId,
        input: DomainExpansionInput,
    ) -> Result<DomainExpansion, CatalogError>;

    /// Delete an expansion, clearing its owner's reference first
    async fn delete_domain_expansion(&self, id: DomainExpansionId) -> Result<(), CatalogError>;

    /// The expansion owned by a character, if any
    async fn domain_expansion_of_character(
        &self,
        character_id: CharacterId,
    ) -> Result<Option<DomainExpansion>, CatalogError>;
}

pub struct DomainExpansionServiceImpl {
    repository: Arc<dyn CatalogRepositoryPort>,
}

impl DomainExpansionServiceImpl {
    pub fn new(repository: Arc<dyn CatalogRepositoryPort>) -> Self {
        Self { repository }
    }

    fn validate(input: &DomainExpansionInput) -> Result<(String, String), CatalogError> {
        let name = require_name("DomainExpansion", &input.name, MAX_EXPANSION_NAME)?.to_string();
        let effect = optional_text("effect", input.effect.as_deref(), MAX_EFFECT)?;
        Ok((name, effect))
    }
}

#[async_trait]
impl DomainExpansionService for DomainExpansionServiceImpl {
    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_domain_expansion(
        &self,
        input: DomainExpansionInput,
    ) -> Result<DomainExpansion, CatalogError> {
        let (name, effect) = Self::validate(&input)?;
        let mut tx = self.repository.begin().await?;

        let existing = tx.domain_expansion_by_name(&name).await?.map(|d| d.id);
        integrity::ensure_name_available("DomainExpansion", &name, existing, None)?;

        let expansion = DomainExpansion::new(name, effect);
        tx.save_domain_expansion(&expansion).await?;
        tx.commit().await?;

        info!(expansion_id = %expansion.id, "Created domain expansion: {}", expansion.name);
        Ok(expansion)
    }

    #[instrument(skip(self))]
    async fn get_domain_expansion(
        &self,
        id: DomainExpansionId,
    ) -> Result<Option<DomainExpansion>, CatalogError> {
        debug!(expansion_id = %id, "Fetching domain expansion");
        let mut tx = self.repository.begin().await?;
        tx.domain_expansion(id).await
    }

    #[instrument(skip(self))]
    async fn list_domain_expansions(
        &self,
        query: ListQuery,
    ) -> Result<Page<DomainExpansion>, CatalogError> {
        let mut tx = self.repository.begin().await?;
        tx.list_domain_expansions(&query).await
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn update_domain_expansion(
        &self,
        id: DomainExpansionId,
        input: DomainExpansionInput,
    ) -> Result<DomainExpansion, CatalogError> {
        let (name, effect) = Self::validate(&input)?;
        let mut tx = self.repository.begin().await?;

        let mut expansion = tx
            .domain_expansion(id)
            .await?
            .ok_or(CatalogError::NotFound("DomainExpansion"))?;
        let existing = tx.domain_expansion_by_name(&name).await?.map(|d| d.id);
        integrity::ensure_name_available("DomainExpansion", &name, existing, Some(id))?;

        expansion.name = name;
        expansion.effect = effect;
        tx.save_domain_expansion(&expansion).await?;
        tx.commit().await?;

        info!(expansion_id = %id, "Updated domain expansion: {}", expansion.name);
        Ok(expansion)
    }

    #[instrument(skip(self))]
    async fn delete_domain_expansion(&self, id: DomainExpansionId) -> Result<(), CatalogError> {
        let mut tx = self.repository.begin().await?;
        let expansion = tx
            .domain_expansion(id)
            .await?
            .ok_or(CatalogError::NotFound("DomainExpansion"))?;

        let owner = match expansion.owner_id {
            Some(owner_id) => tx.character(owner_id).await?,
            None => None,
        };
        if let Some(owner) = integrity::detach_owner_on_expansion_delete(&expansion, owner) {
            debug!(character_id = %owner.id, "Clearing domain expansion of owner");
            tx.save_character(&owner).await?;
        }

        tx.delete_domain_expansion(id).await?;
        tx.commit().await?;

        info!(expansion_id = %id, "Deleted domain expansion: {}", expansion.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn domain_expansion_of_character(
        &self,
        character_id: CharacterId,
    ) -> Result<Option<DomainExpansion>, CatalogError> {
        let mut tx = self.repository.begin().await?;
        let character = tx
            .character(character_id)
            .await?
            .ok_or(CatalogError::NotFound("Character"))?;
        match character.domain_expansion_id {
            Some(expansion_id) => tx.domain_expansion(expansion_id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::PageRequest;
    use crate::application::services::character_service::{
        CharacterInput, CharacterService, CharacterServiceImpl,
    };
    use crate::application::services::test_support::{catalog, SENTINEL};

    fn input(name: &str, effect: &str) -> DomainExpansionInput {
        DomainExpansionInput {
            name: name.to_string(),
            effect: Some(effect.to_string()),
        }
    }

    #[tokio::test]
    async fn test_created_expansions_are_unowned_and_unique() {
        let service = DomainExpansionServiceImpl::new(catalog().await);
        let shrine = service
            .create_domain_expansion(input("Malevolent Shrine", "Cleave"))
            .await
            .unwrap();
        assert_eq!(shrine.owner_id, None);

        let err = service
            .create_domain_expansion(input("MALEVOLENT SHRINE", ""))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "DomainExpansion with this name already exists");
    }

    #[tokio::test]
    async fn test_update_keeps_owner() {
        let repository = catalog().await;
        let characters = CharacterServiceImpl::new(repository.clone(), SENTINEL);
        let service = DomainExpansionServiceImpl::new(repository);

        let satoru = characters
            .create_character(CharacterInput {
                name: "Satoru".into(),
                domain_expansion_name: Some("Infinite Void".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let expansion_id = satoru.domain_expansion.unwrap().id;

        let updated = service
            .update_domain_expansion(expansion_id, input("Unlimited Void", "Overload"))
            .await
            .unwrap();
        assert_eq!(updated.owner_id, Some(satoru.character.id));
        assert_eq!(updated.effect, "Overload");
    }

    #[tokio::test]
    async fn test_delete_clears_owner_reference() {
        let repository = catalog().await;
        let characters = CharacterServiceImpl::new(repository.clone(), SENTINEL);
        let service = DomainExpansionServiceImpl::new(repository);

        let mahito = characters
            .create_character(CharacterInput {
                name: "Mahito".into(),
                domain_expansion_name: Some("Self-Embodiment of Perfection".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let owned = service
            .domain_expansion_of_character(mahito.character.id)
            .await
            .unwrap()
            .unwrap();

        service.delete_domain_expansion(owned.id).await.unwrap();

        let mahito = characters
            .get_character(mahito.character.id)
            .await
            .unwrap()
            .unwrap();
        assert!(mahito.character.domain_expansion_id.is_none());
        assert!(service
            .domain_expansion_of_character(mahito.character.id)
            .await
            .unwrap()
            .is_none());

        let page = service
            .list_domain_expansions(ListQuery::all(PageRequest::default()))
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }
}
