//! Data Transfer Objects - For API boundaries
//!
//! DTOs live in the application layer so infrastructure (HTTP) can
//! serialize/deserialize without pulling serde into the domain model.
//! Field names are camelCase on the wire.

pub mod character;
pub mod clan;
pub mod domain_expansion;
pub mod hypermedia;
pub mod technique;

pub use character::*;
pub use clan::*;
pub use domain_expansion::*;
pub use hypermedia::*;
pub use technique::*;
