//! Clan Service - Application service for clan management
//!
//! Deleting a clan moves its members onto the sentinel clan. The sentinel
//! itself can be edited but never renamed or deleted.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument};

use crate::application::ports::outbound::{CatalogRepositoryPort, ListQuery, Page, PageRequest};
use crate::application::services::catalog_views::{character_views, clan_view, CharacterView, ClanView};
use crate::application::services::validation::{
    optional_text, require_name, MAX_CLAN_NAME, MAX_DESCRIPTION,
};
use crate::domain::entities::Clan;
use crate::domain::errors::CatalogError;
use crate::domain::services::integrity;
use crate::domain::value_objects::ClanId;

#[derive(Debug, Clone, Default)]
pub struct ClanInput {
    pub name: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait ClanService: Send + Sync {
    async fn create_clan(&self, input: ClanInput) -> Result<ClanView, CatalogError>;

    async fn get_clan(&self, id: ClanId) -> Result<Option<ClanView>, CatalogError>;

    async fn list_clans(&self, query: ListQuery) -> Result<Page<ClanView>, CatalogError>;

    async fn update_clan(&self, id: ClanId, input: ClanInput) -> Result<ClanView, CatalogError>;

    /// Delete a clan, reassigning its members to the sentinel clan
    async fn delete_clan(&self, id: ClanId) -> Result<(), CatalogError>;

    async fn clan_members(
        &self,
        id: ClanId,
        page: PageRequest,
    ) -> Result<Page<CharacterView>, CatalogError>;
}

pub struct ClanServiceImpl {
    repository: Arc<dyn CatalogRepositoryPort>,
    sentinel_clan: String,
}

impl ClanServiceImpl {
    pub fn new(repository: Arc<dyn CatalogRepositoryPort>, sentinel_clan: impl Into<String>) -> Self {
        Self {
            repository,
            sentinel_clan: sentinel_clan.into(),
        }
    }

    fn validate(input: &ClanInput) -> Result<(String, String), CatalogError> {
        let name = require_name("Clan", &input.name, MAX_CLAN_NAME)?.to_string();
        let description =
            optional_text("description", input.description.as_deref(), MAX_DESCRIPTION)?;
        Ok((name, description))
    }
}

#[async_trait]
impl ClanService for ClanServiceImpl {
    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_clan(&self, input: ClanInput) -> Result<ClanView, CatalogError> {
        let (name, description) = Self::validate(&input)?;
        let mut tx = self.repository.begin().await?;

        let existing = tx.clan_by_name(&name).await?.map(|c| c.id);
        integrity::ensure_name_available("Clan", &name, existing, None)?;

        let clan = Clan::new(name, description);
        tx.save_clan(&clan).await?;
        tx.commit().await?;

        info!(clan_id = %clan.id, "Created clan: {}", clan.name);
        Ok(ClanView {
            clan,
            member_ids: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    async fn get_clan(&self, id: ClanId) -> Result<Option<ClanView>, CatalogError> {
        debug!(clan_id = %id, "Fetching clan");
        let mut tx = self.repository.begin().await?;
        match tx.clan(id).await? {
            Some(clan) => Ok(Some(clan_view(tx.as_mut(), clan).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_clans(&self, query: ListQuery) -> Result<Page<ClanView>, CatalogError> {
        let mut tx = self.repository.begin().await?;
        let Page {
            items,
            total,
            page,
            size,
        } = tx.list_clans(&query).await?;

        let mut views = Vec::with_capacity(items.len());
        for clan in items {
            views.push(clan_view(tx.as_mut(), clan).await?);
        }
        Ok(Page {
            items: views,
            total,
            page,
            size,
        })
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn update_clan(&self, id: ClanId, input: ClanInput) -> Result<ClanView, CatalogError> {
        let (name, description) = Self::validate(&input)?;
        let mut tx = self.repository.begin().await?;

        let mut clan = tx.clan(id).await?.ok_or(CatalogError::NotFound("Clan"))?;
        integrity::ensure_sentinel_keeps_name(&clan, &name, &self.sentinel_clan)?;
        let existing = tx.clan_by_name(&name).await?.map(|c| c.id);
        integrity::ensure_name_available("Clan", &name, existing, Some(id))?;

        clan.name = name;
        clan.description = description;
        tx.save_clan(&clan).await?;
        let view = clan_view(tx.as_mut(), clan).await?;
        tx.commit().await?;

        info!(clan_id = %view.clan.id, "Updated clan: {}", view.clan.name);
        Ok(view)
    }

    #[instrument(skip(self))]
    async fn delete_clan(&self, id: ClanId) -> Result<(), CatalogError> {
        let mut tx = self.repository.begin().await?;
        let clan = tx.clan(id).await?.ok_or(CatalogError::NotFound("Clan"))?;

        let sentinel = tx.clan_by_name(&self.sentinel_clan).await?;
        let members = tx.clan_members(id).await?;
        let moved = integrity::reassign_orphans_on_clan_delete(
            &clan,
            members,
            sentinel.as_ref(),
            &self.sentinel_clan,
        )
        .inspect_err(|e| {
            if e.is_fatal() {
                error!(clan_id = %id, error = %e, "Cannot reassign clan members");
            }
        })?;

        for member in &moved {
            tx.save_character(member).await?;
        }
        tx.delete_clan(id).await?;
        tx.commit().await?;

        info!(
            clan_id = %id,
            reassigned = moved.len(),
            "Deleted clan: {}",
            clan.name
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clan_members(
        &self,
        id: ClanId,
        page: PageRequest,
    ) -> Result<Page<CharacterView>, CatalogError> {
        let mut tx = self.repository.begin().await?;
        if tx.clan(id).await?.is_none() {
            return Err(CatalogError::NotFound("Clan"));
        }
        let members = tx.clan_members(id).await?;
        character_views(tx.as_mut(), page.slice(members)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{catalog, SENTINEL};
    use crate::domain::entities::Character;
    use crate::domain::value_objects::Rank;

    fn input(name: &str) -> ClanInput {
        ClanInput {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_names_are_unique_ignoring_case() {
        let service = ClanServiceImpl::new(catalog().await, SENTINEL);
        let zenin = service.create_clan(input("Zenin")).await.unwrap();

        let err = service.create_clan(input("ZENIN")).await.unwrap_err();
        assert_eq!(err, CatalogError::duplicate("Clan", "ZENIN"));
        assert_eq!(err.to_string(), "Clan with this name already exists");

        let kamo = service.create_clan(input("Kamo")).await.unwrap();
        let err = service
            .update_clan(kamo.clan.id, input("zenin"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName { .. }));

        // Re-saving under its own name is not a conflict
        let renamed = service
            .update_clan(zenin.clan.id, input("zenin"))
            .await
            .unwrap();
        assert_eq!(renamed.clan.name, "zenin");
    }

    #[tokio::test]
    async fn test_delete_moves_members_to_sentinel() {
        let repository = catalog().await;
        let service = ClanServiceImpl::new(repository.clone(), SENTINEL);
        let zenin = service.create_clan(input("Zenin")).await.unwrap();

        let mut tx = repository.begin().await.unwrap();
        let maki = Character::new("Maki", Rank::Grade4, zenin.clan.id);
        tx.save_character(&maki).await.unwrap();
        tx.commit().await.unwrap();

        service.delete_clan(zenin.clan.id).await.unwrap();

        let mut tx = repository.begin().await.unwrap();
        let maki = tx.character(maki.id).await.unwrap().unwrap();
        let sentinel = tx.clan_by_name(SENTINEL).await.unwrap().unwrap();
        assert_eq!(maki.clan_id, sentinel.id);
        assert!(tx.clan(zenin.clan.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sentinel_cannot_be_deleted_or_renamed() {
        let repository = catalog().await;
        let service = ClanServiceImpl::new(repository.clone(), SENTINEL);
        let mut tx = repository.begin().await.unwrap();
        let sentinel = tx.clan_by_name(SENTINEL).await.unwrap().unwrap();
        drop(tx);

        let err = service.delete_clan(sentinel.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::ProtectedSentinel(_)));

        let err = service
            .update_clan(sentinel.id, input("Renamed"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ProtectedSentinel(_)));

        let edited = service
            .update_clan(
                sentinel.id,
                ClanInput {
                    name: SENTINEL.to_string(),
                    description: Some("Unaffiliated".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.clan.description, "Unaffiliated");
    }

    #[tokio::test]
    async fn test_delete_without_sentinel_aborts() {
        let repository = catalog().await;
        let service = ClanServiceImpl::new(repository.clone(), "Missing");
        let inumaki = service.create_clan(input("Inumaki")).await.unwrap();

        let err = service.delete_clan(inumaki.clan.id).await.unwrap_err();
        assert_eq!(err, CatalogError::MissingSentinel("Missing".to_string()));
        assert!(service.get_clan(inumaki.clan.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_members_and_listing() {
        let repository = catalog().await;
        let service = ClanServiceImpl::new(repository.clone(), SENTINEL);
        let gojo = service.create_clan(input("Gojo")).await.unwrap();

        let mut tx = repository.begin().await.unwrap();
        let satoru = Character::new("Satoru", Rank::SpecialGrade, gojo.clan.id);
        tx.save_character(&satoru).await.unwrap();
        tx.commit().await.unwrap();

        let view = service.get_clan(gojo.clan.id).await.unwrap().unwrap();
        assert_eq!(view.member_ids, vec![satoru.id]);

        let members = service
            .clan_members(gojo.clan.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(members.items[0].character.name, "Satoru");

        let page = service
            .list_clans(ListQuery::all(PageRequest::default()))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }
}
