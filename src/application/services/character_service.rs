//! Character Service - Application service for character management
//!
//! Creating and updating a character resolves its clan, techniques and domain
//! expansion by name, then writes the character and every expansion whose
//! ownership changed in one transaction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::application::ports::outbound::{CatalogRepositoryPort, ListQuery, Page, PageRequest};
use crate::application::services::catalog_views::{
    character_view, character_views, technique_view, CharacterView, TechniqueView,
};
use crate::application::services::reference_resolver::{
    resolve_clan_by_name, resolve_techniques_by_names,
};
use crate::application::services::validation::{require_name, MAX_CHARACTER_NAME};
use crate::domain::entities::{Character, DomainExpansion};
use crate::domain::errors::CatalogError;
use crate::domain::services::integrity;
use crate::domain::value_objects::{non_blank, CharacterId, Rank};

/// Request to create or fully replace a character
#[derive(Debug, Clone, Default)]
pub struct CharacterInput {
    pub name: String,
    /// Rank wire name; blank means `NON_SORCERER`
    pub rank: Option<String>,
    /// Blank means the sentinel clan
    pub clan_name: Option<String>,
    pub technique_names: Vec<String>,
    /// Blank means no domain expansion
    pub domain_expansion_name: Option<String>,
    pub domain_expansion_effect: Option<String>,
}

/// Character service trait defining the application use cases
#[async_trait]
pub trait CharacterService: Send + Sync {
    async fn create_character(&self, input: CharacterInput)
        -> Result<CharacterView, CatalogError>;

    async fn get_character(&self, id: CharacterId) -> Result<Option<CharacterView>, CatalogError>;

    /// List or search characters; a name filter makes this a search
    async fn list_characters(&self, query: ListQuery)
        -> Result<Page<CharacterView>, CatalogError>;

    /// Replace every field of an existing character
    async fn update_character(
        &self,
        id: CharacterId,
        input: CharacterInput,
    ) -> Result<CharacterView, CatalogError>;

    /// Delete a character; its domain expansion survives unowned
    async fn delete_character(&self, id: CharacterId) -> Result<(), CatalogError>;

    /// Techniques used by a character
    async fn character_techniques(
        &self,
        id: CharacterId,
        page: PageRequest,
    ) -> Result<Page<TechniqueView>, CatalogError>;

    /// Members of the clan with the given name
    async fn characters_by_clan(
        &self,
        clan_name: &str,
        page: PageRequest,
    ) -> Result<Page<CharacterView>, CatalogError>;

    /// Characters holding the given rank wire name
    async fn characters_by_rank(
        &self,
        rank: &str,
        page: PageRequest,
    ) -> Result<Page<CharacterView>, CatalogError>;
}

/// Default implementation of CharacterService over a catalog repository
pub struct CharacterServiceImpl {
    repository: Arc<dyn CatalogRepositoryPort>,
    sentinel_clan: String,
}

impl CharacterServiceImpl {
    pub fn new(repository: Arc<dyn CatalogRepositoryPort>, sentinel_clan: impl Into<String>) -> Self {
        Self {
            repository,
            sentinel_clan: sentinel_clan.into(),
        }
    }

    fn parse_rank(rank: &str) -> Result<Rank, CatalogError> {
        Rank::parse(rank).ok_or_else(|| CatalogError::invalid(format!("Invalid rank: {}", rank)))
    }

    /// Validate the scalar fields of a request, returning the trimmed name and rank
    fn validate(input: &CharacterInput) -> Result<(String, Rank), CatalogError> {
        let name = require_name("Character", &input.name, MAX_CHARACTER_NAME)?.to_string();
        let rank = match non_blank(input.rank.as_deref()) {
            Some(rank) => Self::parse_rank(rank)?,
            None => Rank::default(),
        };
        Ok((name, rank))
    }
}

#[async_trait]
impl CharacterService for CharacterServiceImpl {
    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_character(
        &self,
        input: CharacterInput,
    ) -> Result<CharacterView, CatalogError> {
        let (name, rank) = Self::validate(&input)?;
        let mut tx = self.repository.begin().await?;

        let clan =
            resolve_clan_by_name(tx.as_mut(), input.clan_name.as_deref(), &self.sentinel_clan)
                .await?;
        let techniques = resolve_techniques_by_names(tx.as_mut(), &input.technique_names).await?;

        let mut character =
            Character::new(name, rank, clan.id).with_techniques(techniques.iter().map(|t| t.id));

        let effect = input.domain_expansion_effect.as_deref();
        let domain_expansion = match non_blank(input.domain_expansion_name.as_deref()) {
            None => None,
            Some(expansion_name) => match tx.domain_expansion_by_name(expansion_name).await? {
                Some(existing) => {
                    integrity::assign_domain_expansion(&mut character, None, existing, effect)?
                        .pop()
                }
                None => Some(integrity::create_domain_expansion_for_character(
                    &mut character,
                    expansion_name,
                    effect,
                )),
            },
        };

        tx.save_character(&character).await?;
        if let Some(expansion) = &domain_expansion {
            tx.save_domain_expansion(expansion).await?;
        }
        tx.commit().await?;

        info!(
            character_id = %character.id,
            clan = %clan.name,
            "Created character: {}",
            character.name
        );
        Ok(CharacterView {
            character,
            clan: Some(clan),
            techniques,
            domain_expansion,
        })
    }

    #[instrument(skip(self))]
    async fn get_character(&self, id: CharacterId) -> Result<Option<CharacterView>, CatalogError> {
        debug!(character_id = %id, "Fetching character");
        let mut tx = self.repository.begin().await?;
        match tx.character(id).await? {
            Some(character) => Ok(Some(character_view(tx.as_mut(), character).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_characters(
        &self,
        query: ListQuery,
    ) -> Result<Page<CharacterView>, CatalogError> {
        let mut tx = self.repository.begin().await?;
        let page = tx.list_characters(&query).await?;
        debug!(total = page.total, "Listed characters");
        character_views(tx.as_mut(), page).await
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn update_character(
        &self,
        id: CharacterId,
        input: CharacterInput,
    ) -> Result<CharacterView, CatalogError> {
        let (name, rank) = Self::validate(&input)?;
        let mut tx = self.repository.begin().await?;

        let mut character = tx
            .character(id)
            .await?
            .ok_or(CatalogError::NotFound("Character"))?;

        let clan =
            resolve_clan_by_name(tx.as_mut(), input.clan_name.as_deref(), &self.sentinel_clan)
                .await?;
        let techniques = resolve_techniques_by_names(tx.as_mut(), &input.technique_names).await?;

        character.name = name;
        character.rank = rank;
        character.clan_id = clan.id;
        character.technique_ids = techniques.iter().map(|t| t.id).collect();

        let current = match character.domain_expansion_id {
            Some(expansion_id) => tx.domain_expansion(expansion_id).await?,
            None => None,
        };

        let changed: Vec<DomainExpansion> =
            match non_blank(input.domain_expansion_name.as_deref()) {
                None => integrity::release_domain_expansion(&mut character, current)
                    .into_iter()
                    .collect(),
                Some(expansion_name) => {
                    let requested = tx
                        .domain_expansion_by_name(expansion_name)
                        .await?
                        .ok_or_else(|| {
                            CatalogError::unresolved("domain expansion", expansion_name)
                        })?;
                    integrity::assign_domain_expansion(
                        &mut character,
                        current,
                        requested,
                        input.domain_expansion_effect.as_deref(),
                    )?
                }
            };

        tx.save_character(&character).await?;
        for expansion in &changed {
            tx.save_domain_expansion(expansion).await?;
        }
        tx.commit().await?;

        let domain_expansion = character
            .domain_expansion_id
            .and_then(|eid| changed.into_iter().find(|d| d.id == eid));

        info!(character_id = %character.id, "Updated character: {}", character.name);
        Ok(CharacterView {
            character,
            clan: Some(clan),
            techniques,
            domain_expansion,
        })
    }

    #[instrument(skip(self))]
    async fn delete_character(&self, id: CharacterId) -> Result<(), CatalogError> {
        let mut tx = self.repository.begin().await?;
        let character = tx
            .character(id)
            .await?
            .ok_or(CatalogError::NotFound("Character"))?;

        let owned = match character.domain_expansion_id {
            Some(expansion_id) => tx.domain_expansion(expansion_id).await?,
            None => None,
        };
        if let Some(expansion) =
            integrity::detach_domain_expansion_on_character_delete(&character, owned)
        {
            debug!(expansion_id = %expansion.id, "Releasing domain expansion of deleted character");
            tx.save_domain_expansion(&expansion).await?;
        }

        tx.delete_character(id).await?;
        tx.commit().await?;

        info!(character_id = %id, "Deleted character: {}", character.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn character_techniques(
        &self,
        id: CharacterId,
        page: PageRequest,
    ) -> Result<Page<TechniqueView>, CatalogError> {
        let mut tx = self.repository.begin().await?;
        let character = tx
            .character(id)
            .await?
            .ok_or(CatalogError::NotFound("Character"))?;

        let mut techniques = Vec::with_capacity(character.technique_ids.len());
        for technique_id in &character.technique_ids {
            if let Some(technique) = tx.technique(*technique_id).await? {
                techniques.push(technique);
            }
        }
        let Page {
            items,
            total,
            page,
            size,
        } = page.slice(techniques);

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

    #[instrument(skip(self))]
    async fn characters_by_clan(
        &self,
        clan_name: &str,
        page: PageRequest,
    ) -> Result<Page<CharacterView>, CatalogError> {
        let mut tx = self.repository.begin().await?;
        let clan = tx
            .clan_by_name(clan_name)
            .await?
            .ok_or(CatalogError::NotFound("Clan"))?;
        let members = tx.clan_members(clan.id).await?;
        character_views(tx.as_mut(), page.slice(members)).await
    }

    #[instrument(skip(self))]
    async fn characters_by_rank(
        &self,
        rank: &str,
        page: PageRequest,
    ) -> Result<Page<CharacterView>, CatalogError> {
        let rank = Self::parse_rank(rank)?;
        let mut tx = self.repository.begin().await?;
        let found = tx
            .list_characters(&ListQuery::all(page).with_rank(rank))
            .await?;
        character_views(tx.as_mut(), found).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{catalog, SENTINEL};
    use crate::domain::entities::{Clan, Technique};

    fn input(name: &str) -> CharacterInput {
        CharacterInput {
            name: name.to_string(),
            ..Default::default()
        }
    }

    async fn service_with_fixtures() -> (CharacterServiceImpl, Arc<dyn CatalogRepositoryPort>) {
        let repository = catalog().await;
        let mut tx = repository.begin().await.unwrap();
        tx.save_clan(&Clan::new("Gojo", "")).await.unwrap();
        tx.save_technique(&Technique::new("Blue", "")).await.unwrap();
        tx.save_technique(&Technique::new("Red", "")).await.unwrap();
        tx.commit().await.unwrap();
        (
            CharacterServiceImpl::new(repository.clone(), SENTINEL),
            repository,
        )
    }

    #[tokio::test]
    async fn test_create_defaults_to_sentinel_and_non_sorcerer() {
        let (service, _) = service_with_fixtures().await;

        let view = service.create_character(input("Toji")).await.unwrap();
        assert_eq!(view.character.rank, Rank::NonSorcerer);
        assert_eq!(view.clan.unwrap().name, SENTINEL);
        assert!(view.techniques.is_empty());
        assert!(view.domain_expansion.is_none());
    }

    #[tokio::test]
    async fn test_create_resolves_references_by_name() {
        let (service, _) = service_with_fixtures().await;
        let request = CharacterInput {
            rank: Some("special_grade".to_string()),
            clan_name: Some("gojo".to_string()),
            technique_names: vec!["Blue".into(), "RED".into(), "blue".into()],
            domain_expansion_name: Some("Infinite Void".to_string()),
            domain_expansion_effect: Some("Overload".to_string()),
            ..input("Satoru")
        };

        let view = service.create_character(request).await.unwrap();
        assert_eq!(view.character.rank, Rank::SpecialGrade);
        assert_eq!(view.clan.unwrap().name, "Gojo");
        assert_eq!(view.techniques.len(), 2);

        let expansion = view.domain_expansion.unwrap();
        assert_eq!(expansion.name, "Infinite Void");
        assert_eq!(expansion.effect, "Overload");
        assert_eq!(expansion.owner_id, Some(view.character.id));
        assert_eq!(view.character.domain_expansion_id, Some(expansion.id));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input_without_writing() {
        let (service, repository) = service_with_fixtures().await;

        let err = service
            .create_character(CharacterInput {
                rank: Some("GRADE_9".into()),
                ..input("Yuji")
            })
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::invalid("Invalid rank: GRADE_9"));

        let err = service
            .create_character(CharacterInput {
                technique_names: vec!["Blue".into(), "Divergent Fist".into()],
                ..input("Yuji")
            })
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::unresolved("technique", "Divergent Fist"));

        let err = service
            .create_character(CharacterInput {
                clan_name: Some("Itadori".into()),
                ..input("Yuji")
            })
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::unresolved("clan", "Itadori"));

        let mut tx = repository.begin().await.unwrap();
        let page = tx
            .list_characters(&ListQuery::all(PageRequest::default()))
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_expansion_conflict_then_release() {
        let (service, _) = service_with_fixtures().await;
        let gojo = service
            .create_character(CharacterInput {
                domain_expansion_name: Some("Infinite Void".into()),
                ..input("Satoru")
            })
            .await
            .unwrap();
        let sukuna = service.create_character(input("Sukuna")).await.unwrap();

        let steal = CharacterInput {
            domain_expansion_name: Some("infinite void".into()),
            ..input("Sukuna")
        };
        let err = service
            .update_character(sukuna.character.id, steal.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ExpansionAlreadyOwned { owner, .. } if owner == gojo.character.id));

        let released = service
            .update_character(gojo.character.id, input("Satoru"))
            .await
            .unwrap();
        assert!(released.domain_expansion.is_none());
        assert!(released.character.domain_expansion_id.is_none());

        let taken = service
            .update_character(sukuna.character.id, steal)
            .await
            .unwrap();
        let expansion = taken.domain_expansion.unwrap();
        assert_eq!(expansion.owner_id, Some(sukuna.character.id));
    }

    #[tokio::test]
    async fn test_update_swaps_expansion_and_releases_previous() {
        let (service, repository) = service_with_fixtures().await;
        let mut tx = repository.begin().await.unwrap();
        tx.save_domain_expansion(&DomainExpansion::new("Coffin of the Iron Mountain", ""))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let jogo = service
            .create_character(CharacterInput {
                domain_expansion_name: Some("Old Domain".into()),
                ..input("Jogo")
            })
            .await
            .unwrap();
        let old_id = jogo.domain_expansion.unwrap().id;

        let updated = service
            .update_character(
                jogo.character.id,
                CharacterInput {
                    domain_expansion_name: Some("Coffin of the Iron Mountain".into()),
                    domain_expansion_effect: Some("Heat".into()),
                    ..input("Jogo")
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.domain_expansion.as_ref().unwrap().effect, "Heat");

        let mut tx = repository.begin().await.unwrap();
        let old = tx.domain_expansion(old_id).await.unwrap().unwrap();
        assert_eq!(old.owner_id, None);
    }

    #[tokio::test]
    async fn test_update_with_unknown_expansion_is_unresolved() {
        let (service, _) = service_with_fixtures().await;
        let yuta = service.create_character(input("Yuta")).await.unwrap();

        let err = service
            .update_character(
                yuta.character.id,
                CharacterInput {
                    domain_expansion_name: Some("Authentic Mutual Love".into()),
                    ..input("Yuta")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::unresolved("domain expansion", "Authentic Mutual Love")
        );
    }

    #[tokio::test]
    async fn test_delete_leaves_expansion_unowned() {
        let (service, repository) = service_with_fixtures().await;
        let view = service
            .create_character(CharacterInput {
                domain_expansion_name: Some("Malevolent Shrine".into()),
                ..input("Sukuna")
            })
            .await
            .unwrap();
        let expansion_id = view.domain_expansion.unwrap().id;

        service.delete_character(view.character.id).await.unwrap();

        assert!(service.get_character(view.character.id).await.unwrap().is_none());
        let mut tx = repository.begin().await.unwrap();
        let expansion = tx.domain_expansion(expansion_id).await.unwrap().unwrap();
        assert_eq!(expansion.owner_id, None);
        drop(tx);

        let err = service.delete_character(view.character.id).await.unwrap_err();
        assert_eq!(err, CatalogError::NotFound("Character"));
    }

    #[tokio::test]
    async fn test_queries_by_clan_rank_and_techniques() {
        let (service, _) = service_with_fixtures().await;
        let satoru = service
            .create_character(CharacterInput {
                rank: Some("SPECIAL_GRADE".into()),
                clan_name: Some("Gojo".into()),
                technique_names: vec!["Blue".into(), "Red".into()],
                ..input("Satoru")
            })
            .await
            .unwrap();
        service.create_character(input("Nobara")).await.unwrap();

        let members = service
            .characters_by_clan("GOJO", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(members.total, 1);
        assert_eq!(members.items[0].character.id, satoru.character.id);

        let err = service
            .characters_by_clan("Kamo", PageRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::NotFound("Clan"));

        let special = service
            .characters_by_rank("special_grade", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(special.total, 1);
        assert!(service
            .characters_by_rank("GRADE_9", PageRequest::default())
            .await
            .is_err());

        let techniques = service
            .character_techniques(satoru.character.id, PageRequest::new(1, 1))
            .await
            .unwrap();
        assert_eq!(techniques.total, 2);
        assert_eq!(techniques.items.len(), 1);
        assert!(techniques.has_more());

        let found = service
            .list_characters(ListQuery::search(Some("SAT"), PageRequest::default()))
            .await
            .unwrap();
        assert_eq!(found.total, 1);
    }
}
