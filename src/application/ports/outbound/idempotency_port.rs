//! Idempotency store port - fingerprint to recorded response

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A response captured after the handler ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Outcome of reserving a fingerprint before the handler runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// First time this fingerprint is seen; the caller owns it now
    Reserved,
    /// A request with the same fingerprint is still running
    InFlight,
    /// A response was already recorded for this fingerprint
    Completed(StoredResponse),
}

#[async_trait]
pub trait IdempotencyStorePort: Send + Sync {
    /// Atomically look up `fingerprint` and reserve it when unknown
    async fn reserve(&self, fingerprint: &str, now: DateTime<Utc>) -> Reservation;

    /// Record the response for a reserved fingerprint
    async fn complete(&self, fingerprint: &str, response: StoredResponse, now: DateTime<Utc>);

    /// Drop a reservation whose request never produced a response
    async fn release(&self, fingerprint: &str);

    /// Remove expired entries; returns how many were dropped
    async fn prune(&self, now: DateTime<Utc>) -> usize;
}
