//! Domain expansion entity - exclusively owned by at most one character

use crate::domain::value_objects::{name_key, CharacterId, DomainExpansionId};

#[derive(Debug, Clone, PartialEq)]
pub struct DomainExpansion {
    pub id: DomainExpansionId,
    pub name: String,
    pub effect: String,
    /// Mirror of `Character::domain_expansion_id`
    pub owner_id: Option<CharacterId>,
}

impl DomainExpansion {
    pub fn new(name: impl Into<String>, effect: impl Into<String>) -> Self {
        Self {
            id: DomainExpansionId::new(),
            name: name.into(),
            effect: effect.into(),
            owner_id: None,
        }
    }

    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    pub fn is_owned_by(&self, character_id: CharacterId) -> bool {
        self.owner_id == Some(character_id)
    }
}
