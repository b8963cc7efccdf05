//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Persistence: in-memory and SQLite catalog adapters
//! - HTTP: REST API routes and the request pipeline middleware
//! - Rate limiter and idempotency store used by that pipeline
//! - Config: Application configuration
//! - State: Shared application state

pub mod clock;
pub mod config;
pub mod http;
pub mod idempotency_store;
pub mod persistence;
pub mod rate_limiter;
pub mod state;
