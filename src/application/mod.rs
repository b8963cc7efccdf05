//! Application layer - Use cases over the catalog
//!
//! This layer contains:
//! - DTOs: wire representations, hypermedia links, paging parameters
//! - Ports: the storage, clock and idempotency interfaces it depends on
//! - Services: catalog use cases and duplicate-request suppression

pub mod dto;
pub mod ports;
pub mod services;
