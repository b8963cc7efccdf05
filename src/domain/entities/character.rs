//! Character entity - a sorcerer (or not) belonging to a clan

use std::collections::BTreeSet;

use crate::domain::value_objects::{CharacterId, ClanId, DomainExpansionId, Rank, TechniqueId};

/// A character in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub rank: Rank,
    /// Always set; falls back to the sentinel clan
    pub clan_id: ClanId,
    /// Techniques this character uses, unique by identity
    pub technique_ids: BTreeSet<TechniqueId>,
    /// Mirror of `DomainExpansion::owner_id`
    pub domain_expansion_id: Option<DomainExpansionId>,
}

impl Character {
    pub fn new(name: impl Into<String>, rank: Rank, clan_id: ClanId) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            rank,
            clan_id,
            technique_ids: BTreeSet::new(),
            domain_expansion_id: None,
        }
    }

    pub fn with_techniques(mut self, technique_ids: impl IntoIterator<Item = TechniqueId>) -> Self {
        self.technique_ids = technique_ids.into_iter().collect();
        self
    }

    pub fn uses_technique(&self, technique_id: TechniqueId) -> bool {
        self.technique_ids.contains(&technique_id)
    }

    /// Drop a technique reference; returns whether it was present
    pub fn forget_technique(&mut self, technique_id: TechniqueId) -> bool {
        self.technique_ids.remove(&technique_id)
    }
}
