//! Strongly-typed identifiers for catalog entities

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(Uuid);

        impl $name {
            /// Time-ordered id, so sorting by id follows creation order
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse the hyphenated text form used in URLs and storage
            pub fn parse(value: &str) -> Option<Self> {
                Uuid::parse_str(value).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(CharacterId);
define_id!(ClanId);
define_id!(TechniqueId);
define_id!(DomainExpansionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_sort_in_creation_order() {
        let first = CharacterId::new();
        let second = CharacterId::new();
        assert!(first < second);
    }

    #[test]
    fn test_parse_round_trips_display() {
        let id = ClanId::new();
        assert_eq!(ClanId::parse(&id.to_string()), Some(id));
        assert_eq!(ClanId::parse("not-a-uuid"), None);
    }
}
