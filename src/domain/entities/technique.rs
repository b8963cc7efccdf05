//! Technique entity

use crate::domain::value_objects::{name_key, TechniqueId};

/// A cursed technique; users are derived from `Character::technique_ids`
#[derive(Debug, Clone, PartialEq)]
pub struct Technique {
    pub id: TechniqueId,
    pub name: String,
    pub description: String,
}

impl Technique {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: TechniqueId::new(),
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }
}
