//! Technique Service - Application service for cursed technique management

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::application::ports::outbound::{CatalogRepositoryPort, ListQuery, Page, PageRequest};
use crate::application::services::catalog_views::{
    character_views, technique_view, CharacterView, TechniqueView,
};
use crate::application::services::validation::{
    optional_text, require_name, MAX_DESCRIPTION, MAX_TECHNIQUE_NAME,
};
use crate::domain::entities::Technique;
use crate::domain::errors::CatalogError;
use crate::domain::services::integrity;
use crate::domain::value_objects::TechniqueId;

#[derive(Debug, Clone, Default)]
pub struct TechniqueInput {
    pub name: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait TechniqueService: Send + Sync {
    async fn create_technique(&self, input: TechniqueInput) -> Result<TechniqueView, CatalogError>;

    async fn get_technique(&self, id: TechniqueId) -> Result<Option<TechniqueView>, CatalogError>;

    async fn list_techniques(&self, query: ListQuery) -> Result<Page<TechniqueView>, CatalogError>;

    async fn update_technique(
        &self,
        id: TechniqueId,
        input: TechniqueInput,
    ) -> Result<TechniqueView, CatalogError>;

    /// Delete a technique after removing it from every user
    async fn delete_technique(&self, id: TechniqueId) -> Result<(), CatalogError>;

    async fn technique_users(
        &self,
        id: TechniqueId,
        page: PageRequest,
    ) -> Result<Page<CharacterView>, CatalogError>;
}

pub struct TechniqueServiceImpl {
    repository: Arc<dyn CatalogRepositoryPort>,
}

impl TechniqueServiceImpl {
    pub fn new(repository: Arc<dyn CatalogRepositoryPort>) -> Self {
        Self { repository }
    }

    fn validate(input: &TechniqueInput) -> Result<(String, String), CatalogError> {
        let name = require_name("Technique", &input.name, MAX_TECHNIQUE_NAME)?.to_string();
        let description =
            optional_text("description", input.description.as_deref(), MAX_DESCRIPTION)?;
        Ok((name, description))
    }
}

#[async_trait]
impl TechniqueService for TechniqueServiceImpl {
    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_technique(&self, input: TechniqueInput) -> Result<TechniqueView, CatalogError> {
        let (name, description) = Self::validate(&input)?;
        let mut tx = self.repository.begin().await?;

        let existing = tx.technique_by_name(&name).await?.map(|t| t.id);
        integrity::ensure_name_available("Technique", &name, existing, None)?;

        let technique = Technique::new(name, description);
        tx.save_technique(&technique).await?;
        tx.commit().await?;

        info!(technique_id = %technique.id, "Created technique: {}", technique.name);
        Ok(TechniqueView {
            technique,
            user_ids: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    async fn get_technique(&self, id: TechniqueId) -> Result<Option<TechniqueView>, CatalogError> {
        debug!(technique_id = %id, "Fetching technique");
        let mut tx = self.repository.begin().await?;
        match tx.technique(id).await? {
            Some(technique) => Ok(Some(technique_view(tx.as_mut(), technique).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_techniques(&self, query: ListQuery) -> Result<Page<TechniqueView>, CatalogError> {
        let mut tx = self.repository.begin().await?;
        let Page {
            items,
            total,
            page,
            size,
        } = tx.list_techniques(&query).await?;

        let mut views = Vec::with_capacity(items.len());
        for technique in items {
            views.push(technique_view(tx.as_mut(), technique).await?);
        }
        Ok(Page {
            items: views,
            total,
            page,
            size,
        })
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn update_technique(
        &self,
        id: TechniqueId,
        input: TechniqueInput,
    ) -> Result<TechniqueView, CatalogError> {
        let (name, description) = Self::validate(&input)?;
        let mut tx = self.repository.begin().await?;

        let mut technique = tx
            .technique(id)
            .await?
            .ok_or(CatalogError::NotFound("Technique"))?;
        let existing = tx.technique_by_name(&name).await?.map(|t| t.id);
        integrity::ensure_name_available("Technique", &name, existing, Some(id))?;

        technique.name = name;
        technique.description = description;
        tx.save_technique(&technique).await?;
        let view = technique_view(tx.as_mut(), technique).await?;
        tx.commit().await?;

        info!(technique_id = %id, "Updated technique: {}", view.technique.name);
        Ok(view)
    }

    #[instrument(skip(self))]
    async fn delete_technique(&self, id: TechniqueId) -> Result<(), CatalogError> {
        let mut tx = self.repository.begin().await?;
        let technique = tx
            .technique(id)
            .await?
            .ok_or(CatalogError::NotFound("Technique"))?;

        let users = tx.technique_users(id).await?;
        let detached = integrity::detach_users_on_technique_delete(&technique, users);
        for user in &detached {
            tx.save_character(user).await?;
        }
        tx.delete_technique(id).await?;
        tx.commit().await?;

        info!(
            technique_id = %id,
            detached = detached.len(),
            "Deleted technique: {}",
            technique.name
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn technique_users(
        &self,
        id: TechniqueId,
        page: PageRequest,
    ) -> Result<Page<CharacterView>, CatalogError> {
        let mut tx = self.repository.begin().await?;
        if tx.technique(id).await?.is_none() {
            return Err(CatalogError::NotFound("Technique"));
        }
        let users = tx.technique_users(id).await?;
        character_views(tx.as_mut(), page.slice(users)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{catalog, SENTINEL};
    use crate::domain::entities::Character;
    use crate::domain::value_objects::Rank;

    fn input(name: &str) -> TechniqueInput {
        TechniqueInput {
            name: name.to_string(),
            description: Some("cursed".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_and_blank_names() {
        let service = TechniqueServiceImpl::new(catalog().await);
        service.create_technique(input("Blue")).await.unwrap();

        let err = service.create_technique(input(" blue ")).await.unwrap_err();
        assert_eq!(err.to_string(), "Technique with this name already exists");

        let err = service.create_technique(input("  ")).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_technique_from_users() {
        let repository = catalog().await;
        let service = TechniqueServiceImpl::new(repository.clone());
        let blue = service.create_technique(input("Blue")).await.unwrap();
        let red = service.create_technique(input("Red")).await.unwrap();

        let mut tx = repository.begin().await.unwrap();
        let sentinel = tx.clan_by_name(SENTINEL).await.unwrap().unwrap();
        let satoru = Character::new("Satoru", Rank::SpecialGrade, sentinel.id)
            .with_techniques([blue.technique.id, red.technique.id]);
        tx.save_character(&satoru).await.unwrap();
        tx.commit().await.unwrap();

        let view = service.get_technique(blue.technique.id).await.unwrap().unwrap();
        assert_eq!(view.user_ids, vec![satoru.id]);

        service.delete_technique(blue.technique.id).await.unwrap();

        let mut tx = repository.begin().await.unwrap();
        let satoru = tx.character(satoru.id).await.unwrap().unwrap();
        assert!(!satoru.uses_technique(blue.technique.id));
        assert!(satoru.uses_technique(red.technique.id));
        drop(tx);

        let users = service
            .technique_users(red.technique.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(users.total, 1);

        let err = service
            .technique_users(blue.technique.id, PageRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::NotFound("Technique"));
    }

    #[tokio::test]
    async fn test_update_and_search() {
        let service = TechniqueServiceImpl::new(catalog().await);
        let blue = service.create_technique(input("Blue")).await.unwrap();
        service.create_technique(input("Black Flash")).await.unwrap();

        let updated = service
            .update_technique(blue.technique.id, input("Lapse Blue"))
            .await
            .unwrap();
        assert_eq!(updated.technique.name, "Lapse Blue");

        let found = service
            .list_techniques(ListQuery::search(Some("BLUE"), PageRequest::default()))
            .await
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].technique.id, blue.technique.id);
    }
}
