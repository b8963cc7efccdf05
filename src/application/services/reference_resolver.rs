//! Reference resolver - turns names from requests into catalog entities
//!
//! Lookups are exact and case-insensitive. A blank optional name means "no
//! value" and is never looked up as the empty string.

use crate::application::ports::outbound::CatalogTransaction;
use crate::domain::entities::{Clan, Technique};
use crate::domain::errors::CatalogError;
use crate::domain::value_objects::non_blank;

/// Resolve a clan by name; a blank name resolves to the sentinel clan.
pub async fn resolve_clan_by_name(
    tx: &mut dyn CatalogTransaction,
    name: Option<&str>,
    sentinel_name: &str,
) -> Result<Clan, CatalogError> {
    match non_blank(name) {
        Some(name) => tx
            .clan_by_name(name)
            .await?
            .ok_or_else(|| CatalogError::unresolved("clan", name)),
        None => tx.clan_by_name(sentinel_name).await?.ok_or_else(|| {
            tracing::error!(sentinel = %sentinel_name, "Sentinel clan is missing");
            CatalogError::MissingSentinel(sentinel_name.to_string())
        }),
    }
}

/// Resolve every technique name, keeping the first occurrence of each technique.
///
/// Fails on the first name that does not resolve.
pub async fn resolve_techniques_by_names(
    tx: &mut dyn CatalogTransaction,
    names: &[String],
) -> Result<Vec<Technique>, CatalogError> {
    let mut resolved: Vec<Technique> = Vec::with_capacity(names.len());
    for raw in names {
        let name = non_blank(Some(raw))
            .ok_or_else(|| CatalogError::invalid("each technique must have a valid name"))?;
        let technique = tx
            .technique_by_name(name)
            .await?
            .ok_or_else(|| CatalogError::unresolved("technique", name))?;
        if !resolved.iter().any(|t| t.id == technique.id) {
            resolved.push(technique);
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::CatalogRepositoryPort;
    use crate::infrastructure::persistence::InMemoryCatalogRepository;

    const SENTINEL: &str = "No Clan";

    async fn seeded() -> InMemoryCatalogRepository {
        let repository = InMemoryCatalogRepository::new(SENTINEL);
        let mut tx = repository.begin().await.unwrap();
        tx.save_clan(&Clan::new(SENTINEL, "")).await.unwrap();
        tx.save_clan(&Clan::new("Gojo", "")).await.unwrap();
        tx.save_technique(&Technique::new("Blue", "")).await.unwrap();
        tx.save_technique(&Technique::new("Red", "")).await.unwrap();
        tx.commit().await.unwrap();
        repository
    }

    #[tokio::test]
    async fn test_blank_clan_resolves_to_sentinel() {
        let repository = seeded().await;
        let mut tx = repository.begin().await.unwrap();

        let clan = resolve_clan_by_name(tx.as_mut(), Some("  "), SENTINEL).await.unwrap();
        assert_eq!(clan.name, SENTINEL);
        let clan = resolve_clan_by_name(tx.as_mut(), None, SENTINEL).await.unwrap();
        assert_eq!(clan.name, SENTINEL);
    }

    #[tokio::test]
    async fn test_clan_lookup_ignores_case() {
        let repository = seeded().await;
        let mut tx = repository.begin().await.unwrap();

        let clan = resolve_clan_by_name(tx.as_mut(), Some("GOJO"), SENTINEL).await.unwrap();
        assert_eq!(clan.name, "Gojo");

        let err = resolve_clan_by_name(tx.as_mut(), Some("Zenin"), SENTINEL)
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::unresolved("clan", "Zenin"));
    }

    #[tokio::test]
    async fn test_missing_sentinel_is_fatal() {
        let repository = InMemoryCatalogRepository::new(SENTINEL);
        let mut tx = repository.begin().await.unwrap();

        let err = resolve_clan_by_name(tx.as_mut(), None, SENTINEL).await.unwrap_err();
        assert_eq!(err, CatalogError::MissingSentinel(SENTINEL.to_string()));
    }

    #[tokio::test]
    async fn test_techniques_are_deduplicated_by_identity() {
        let repository = seeded().await;
        let mut tx = repository.begin().await.unwrap();
        let names = vec!["Blue".to_string(), "blue".to_string(), "RED".to_string()];

        let resolved = resolve_techniques_by_names(tx.as_mut(), &names).await.unwrap();
        let resolved: Vec<_> = resolved.into_iter().map(|t| t.name).collect();
        assert_eq!(resolved, vec!["Blue", "Red"]);
    }

    #[tokio::test]
    async fn test_first_unresolved_technique_is_reported() {
        let repository = seeded().await;
        let mut tx = repository.begin().await.unwrap();
        let names = vec![
            "Blue".to_string(),
            "Purple".to_string(),
            "Black Flash".to_string(),
        ];

        let err = resolve_techniques_by_names(tx.as_mut(), &names).await.unwrap_err();
        assert_eq!(err, CatalogError::unresolved("technique", "Purple"));

        let blank = vec!["".to_string()];
        let err = resolve_techniques_by_names(tx.as_mut(), &blank).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }
}
