//! Outbound ports - Interfaces that the application requires from external systems

mod clock_port;
mod idempotency_port;
mod repository_port;

pub use clock_port::ClockPort;
pub use idempotency_port::{IdempotencyStorePort, Reservation, StoredResponse};
pub use repository_port::{
    CatalogRepositoryPort, CatalogTransaction, ListQuery, Page, PageRequest, SortDirection,
    SortField, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
