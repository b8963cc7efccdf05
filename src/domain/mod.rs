//! Domain layer - Core catalog logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Character, Clan, Technique, DomainExpansion
//! - Value Objects: typed ids, Rank
//! - Errors: the catalog error taxonomy
//! - Domain Services: the referential integrity engine

pub mod entities;
pub mod errors;
pub mod services;
pub mod value_objects;
