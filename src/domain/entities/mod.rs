//! Domain entities - Catalog objects with identity

mod character;
mod clan;
mod domain_expansion;
mod technique;

pub use character::Character;
pub use clan::Clan;
pub use domain_expansion::DomainExpansion;
pub use technique::Technique;
