//! Referential integrity - invariant transactions over catalog entities
//!
//! The catalog has no cascading deletes or foreign keys, so every mutation
//! that touches a relationship goes through one of these functions. Each one
//! takes the entities loaded by the caller and returns the entities that must
//! be written back in the same unit of work. Nothing here performs I/O, and an
//! `Err` means the caller must not write anything.
//!
//! Rules kept:
//! - ownership: `expansion.owner_id == Some(c)` iff `c.domain_expansion_id == Some(expansion)`
//! - clan: every character references an existing clan; the sentinel clan exists
//! - membership: every technique a character references exists (users are derived)
//! - naming: clan, technique and expansion names are unique ignoring case

use std::collections::{HashMap, HashSet};

use crate::domain::entities::{Character, Clan, DomainExpansion, Technique};
use crate::domain::errors::CatalogError;
use crate::domain::value_objects::{
    name_key, non_blank, CharacterId, ClanId, DomainExpansionId, TechniqueId,
};

/// Bind `requested` to `character`.
///
/// `current` is the expansion the character owns right now, if any. When it
/// differs from `requested` it is released first. A non-blank `effect`
/// replaces the requested expansion's effect text.
///
/// Returns every expansion whose state changed.
pub fn assign_domain_expansion(
    character: &mut Character,
    current: Option<DomainExpansion>,
    mut requested: DomainExpansion,
    effect: Option<&str>,
) -> Result<Vec<DomainExpansion>, CatalogError> {
    if let Some(owner) = requested.owner_id {
        if owner != character.id {
            return Err(CatalogError::ExpansionAlreadyOwned {
                name: requested.name,
                owner,
            });
        }
    }

    let mut changed = Vec::with_capacity(2);
    if let Some(previous) = current.filter(|d| d.id != requested.id) {
        changed.extend(release_domain_expansion(character, Some(previous)));
    }

    requested.owner_id = Some(character.id);
    character.domain_expansion_id = Some(requested.id);
    if let Some(effect) = non_blank(effect) {
        requested.effect = effect.to_string();
    }
    changed.push(requested);

    Ok(changed)
}

/// Sever the character's ownership of `current`.
///
/// This is the only way ownership ends without deleting either side.
/// Returns the released expansion when it has to be written back.
pub fn release_domain_expansion(
    character: &mut Character,
    current: Option<DomainExpansion>,
) -> Option<DomainExpansion> {
    character.domain_expansion_id = None;
    let mut expansion = current?;
    if !expansion.is_owned_by(character.id) {
        return None;
    }
    expansion.owner_id = None;
    Some(expansion)
}

/// Build a brand-new expansion already linked to `character`.
///
/// Only used while creating a character whose requested expansion does not
/// exist yet, so the character owns nothing beforehand.
pub fn create_domain_expansion_for_character(
    character: &mut Character,
    name: &str,
    effect: Option<&str>,
) -> DomainExpansion {
    let mut expansion = DomainExpansion::new(name.trim(), effect.unwrap_or_default());
    expansion.owner_id = Some(character.id);
    character.domain_expansion_id = Some(expansion.id);
    expansion
}

/// Move every member of `clan` onto the sentinel clan before `clan` is deleted.
///
/// Fails with `MissingSentinel` when the fallback clan cannot be found; the
/// delete must then be aborted.
pub fn reassign_orphans_on_clan_delete(
    clan: &Clan,
    members: Vec<Character>,
    sentinel: Option<&Clan>,
    sentinel_name: &str,
) -> Result<Vec<Character>, CatalogError> {
    if clan.is_sentinel(sentinel_name) {
        return Err(CatalogError::ProtectedSentinel(clan.name.clone()));
    }
    let sentinel =
        sentinel.ok_or_else(|| CatalogError::MissingSentinel(sentinel_name.to_string()))?;

    Ok(members
        .into_iter()
        .filter(|member| member.clan_id == clan.id)
        .map(|mut member| {
            member.clan_id = sentinel.id;
            member
        })
        .collect())
}

/// Leave the character's expansion unowned before the character is deleted.
pub fn detach_domain_expansion_on_character_delete(
    character: &Character,
    owned: Option<DomainExpansion>,
) -> Option<DomainExpansion> {
    owned
        .filter(|expansion| expansion.is_owned_by(character.id))
        .map(|mut expansion| {
            expansion.owner_id = None;
            expansion
        })
}

/// Clear the owner's back-reference before `expansion` is deleted.
pub fn detach_owner_on_expansion_delete(
    expansion: &DomainExpansion,
    owner: Option<Character>,
) -> Option<Character> {
    owner
        .filter(|character| character.domain_expansion_id == Some(expansion.id))
        .map(|mut character| {
            character.domain_expansion_id = None;
            character
        })
}

/// Remove `technique` from every user before it is deleted.
pub fn detach_users_on_technique_delete(
    technique: &Technique,
    users: Vec<Character>,
) -> Vec<Character> {
    users
        .into_iter()
        .filter_map(|mut user| user.forget_technique(technique.id).then_some(user))
        .collect()
}

/// Check that `name` is free, ignoring the entity being updated.
///
/// `existing` is whatever currently holds the name (case-insensitively).
pub fn ensure_name_available<I: PartialEq>(
    kind: &'static str,
    name: &str,
    existing: Option<I>,
    own_id: Option<I>,
) -> Result<(), CatalogError> {
    match existing {
        Some(holder) if Some(&holder) != own_id.as_ref() => {
            Err(CatalogError::duplicate(kind, name.trim()))
        }
        _ => Ok(()),
    }
}

/// The sentinel clan may be edited but must keep its name.
pub fn ensure_sentinel_keeps_name(
    clan: &Clan,
    new_name: &str,
    sentinel_name: &str,
) -> Result<(), CatalogError> {
    if clan.is_sentinel(sentinel_name) && name_key(new_name) != name_key(sentinel_name) {
        return Err(CatalogError::ProtectedSentinel(clan.name.clone()));
    }
    Ok(())
}

/// A broken invariant found by [`audit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Expansion names an owner that does not point back at it
    OwnerMismatch {
        expansion: DomainExpansionId,
        owner: CharacterId,
    },
    /// Character points at an expansion that does not name it as owner
    ExpansionMismatch {
        character: CharacterId,
        expansion: DomainExpansionId,
    },
    /// Character references a clan that does not exist
    DanglingClan { character: CharacterId, clan: ClanId },
    MissingSentinel,
    /// Character references a deleted technique
    DanglingTechnique {
        character: CharacterId,
        technique: TechniqueId,
    },
    /// Two entities of one kind share a name ignoring case
    DuplicateName { kind: &'static str, key: String },
}

/// Full-catalog consistency check of every rule listed above.
pub fn audit(
    characters: &[Character],
    clans: &[Clan],
    techniques: &[Technique],
    expansions: &[DomainExpansion],
    sentinel_name: &str,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    let clan_ids: HashSet<ClanId> = clans.iter().map(|c| c.id).collect();
    let technique_ids: HashSet<TechniqueId> = techniques.iter().map(|t| t.id).collect();
    let characters_by_id: HashMap<CharacterId, &Character> =
        characters.iter().map(|c| (c.id, c)).collect();
    let expansions_by_id: HashMap<DomainExpansionId, &DomainExpansion> =
        expansions.iter().map(|d| (d.id, d)).collect();

    if !clans.iter().any(|c| c.is_sentinel(sentinel_name)) {
        violations.push(Violation::MissingSentinel);
    }

    for character in characters {
        if !clan_ids.contains(&character.clan_id) {
            violations.push(Violation::DanglingClan {
                character: character.id,
                clan: character.clan_id,
            });
        }
        for technique in &character.technique_ids {
            if !technique_ids.contains(technique) {
                violations.push(Violation::DanglingTechnique {
                    character: character.id,
                    technique: *technique,
                });
            }
        }
        if let Some(expansion_id) = character.domain_expansion_id {
            let points_back = expansions_by_id
                .get(&expansion_id)
                .is_some_and(|d| d.is_owned_by(character.id));
            if !points_back {
                violations.push(Violation::ExpansionMismatch {
                    character: character.id,
                    expansion: expansion_id,
                });
            }
        }
    }

    for expansion in expansions {
        if let Some(owner) = expansion.owner_id {
            let points_back = characters_by_id
                .get(&owner)
                .is_some_and(|c| c.domain_expansion_id == Some(expansion.id));
            if !points_back {
                violations.push(Violation::OwnerMismatch {
                    expansion: expansion.id,
                    owner,
                });
            }
        }
    }

    find_duplicate_names("clan", clans.iter().map(Clan::name_key), &mut violations);
    find_duplicate_names(
        "technique",
        techniques.iter().map(Technique::name_key),
        &mut violations,
    );
    find_duplicate_names(
        "domain expansion",
        expansions.iter().map(DomainExpansion::name_key),
        &mut violations,
    );

    violations
}

fn find_duplicate_names(
    kind: &'static str,
    keys: impl Iterator<Item = String>,
    violations: &mut Vec<Violation>,
) {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.clone()) {
            violations.push(Violation::DuplicateName { kind, key });
        }
    }
}
