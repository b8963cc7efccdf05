//! Domain services - Pure business logic operations

pub mod integrity;
