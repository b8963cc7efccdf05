//! Clan entity

use crate::domain::value_objects::{name_key, ClanId};

/// A clan; members are derived from `Character::clan_id`
#[derive(Debug, Clone, PartialEq)]
pub struct Clan {
    pub id: ClanId,
    pub name: String,
    pub description: String,
}

impl Clan {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: ClanId::new(),
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Whether this clan is the fallback clan with the given name
    pub fn is_sentinel(&self, sentinel_name: &str) -> bool {
        self.name_key() == name_key(sentinel_name)
    }
}
