//! Read models assembled from a transaction
//!
//! Services hand these to the HTTP layer so representations can show related
//! names and links without another round trip.

use crate::application::ports::outbound::{CatalogTransaction, Page};
use crate::domain::entities::{Character, Clan, DomainExpansion, Technique};
use crate::domain::errors::CatalogError;
use crate::domain::value_objects::CharacterId;

/// Character with its clan, techniques and domain expansion resolved
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterView {
    pub character: Character,
    /// `None` only if the catalog is inconsistent
    pub clan: Option<Clan>,
    pub techniques: Vec<Technique>,
    pub domain_expansion: Option<DomainExpansion>,
}

/// Clan with the ids of its current members
#[derive(Debug, Clone, PartialEq)]
pub struct ClanView {
    pub clan: Clan,
    pub member_ids: Vec<CharacterId>,
}

/// Technique with the ids of the characters using it
#[derive(Debug, Clone, PartialEq)]
pub struct TechniqueView {
    pub technique: Technique,
    pub user_ids: Vec<CharacterId>,
}

pub async fn character_view(
    tx: &mut dyn CatalogTransaction,
    character: Character,
) -> Result<CharacterView, CatalogError> {
    let clan = tx.clan(character.clan_id).await?;

    let mut techniques = Vec::with_capacity(character.technique_ids.len());
    for id in &character.technique_ids {
        if let Some(technique) = tx.technique(*id).await? {
            techniques.push(technique);
        }
    }

    let domain_expansion = match character.domain_expansion_id {
        Some(id) => tx.domain_expansion(id).await?,
        None => None,
    };

    Ok(CharacterView {
        character,
        clan,
        techniques,
        domain_expansion,
    })
}

pub async fn character_views(
    tx: &mut dyn CatalogTransaction,
    page: Page<Character>,
) -> Result<Page<CharacterView>, CatalogError> {
    let Page {
        items,
        total,
        page,
        size,
    } = page;

    let mut views = Vec::with_capacity(items.len());
    for character in items {
        views.push(character_view(tx, character).await?);
    }

    Ok(Page {
        items: views,
        total,
        page,
        size,
    })
}

pub async fn clan_view(
    tx: &mut dyn CatalogTransaction,
    clan: Clan,
) -> Result<ClanView, CatalogError> {
    let member_ids = tx
        .clan_members(clan.id)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    Ok(ClanView { clan, member_ids })
}

pub async fn technique_view(
    tx: &mut dyn CatalogTransaction,
    technique: Technique,
) -> Result<TechniqueView, CatalogError> {
    let user_ids = tx
        .technique_users(technique.id)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    Ok(TechniqueView {
        technique,
        user_ids,
    })
}
