//! Idempotency Service - duplicate suppression for creation requests
//!
//! A request is identified by the SHA-256 of its raw body. The first request
//! with a given fingerprint runs; any later one gets the recorded response
//! back as a conflict instead of creating a second entity. A reservation that
//! is dropped before it settles is released, so a cancelled request never
//! blocks its retry.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::application::ports::outbound::{
    ClockPort, IdempotencyStorePort, Reservation, StoredResponse,
};

/// What the caller should do with an incoming request
#[derive(Debug)]
pub enum Admission {
    /// Run the handler, then settle the reservation
    Proceed(PendingRequest),
    /// Same body already handled; answer with the recorded response
    Replay(StoredResponse),
    /// Same body is being handled right now
    InFlight,
}

/// A reserved fingerprint whose response is not recorded yet
///
/// Settle it with [`PendingRequest::complete`] or [`PendingRequest::abandon`].
/// Dropping it unsettled releases the reservation in the background.
pub struct PendingRequest {
    fingerprint: String,
    store: Arc<dyn IdempotencyStorePort>,
    clock: Arc<dyn ClockPort>,
    settled: bool,
}

impl PendingRequest {
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Record the response; later identical bodies replay it
    pub async fn complete(mut self, response: StoredResponse) {
        self.store
            .complete(&self.fingerprint, response, self.clock.now())
            .await;
        self.settled = true;
    }

    /// Give up the reservation so a retry can run
    pub async fn abandon(mut self) {
        self.store.release(&self.fingerprint).await;
        self.settled = true;
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("fingerprint", &self.fingerprint)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let fingerprint = std::mem::take(&mut self.fingerprint);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(fingerprint = %fingerprint, "No runtime to release dropped reservation");
            return;
        };
        warn!(fingerprint = %fingerprint, "Request dropped before completing, releasing reservation");
        let store = self.store.clone();
        runtime.spawn(async move {
            store.release(&fingerprint).await;
        });
    }
}

pub struct IdempotencyService {
    store: Arc<dyn IdempotencyStorePort>,
    clock: Arc<dyn ClockPort>,
}

impl IdempotencyService {
    pub fn new(store: Arc<dyn IdempotencyStorePort>, clock: Arc<dyn ClockPort>) -> Self {
        Self { store, clock }
    }

    /// Only creation requests are fingerprinted
    pub fn applies_to(method: &str) -> bool {
        method.eq_ignore_ascii_case("POST")
    }

    /// Lowercase hex SHA-256 of the body
    pub fn fingerprint(body: &[u8]) -> String {
        hex::encode(Sha256::digest(body))
    }

    #[instrument(skip(self, body), fields(len = body.len()))]
    pub async fn begin(&self, body: &[u8]) -> Admission {
        let fingerprint = Self::fingerprint(body);
        match self.store.reserve(&fingerprint, self.clock.now()).await {
            Reservation::Reserved => Admission::Proceed(PendingRequest {
                fingerprint,
                store: self.store.clone(),
                clock: self.clock.clone(),
                settled: false,
            }),
            Reservation::Completed(response) => {
                debug!(fingerprint = %fingerprint, "Replaying recorded response");
                Admission::Replay(response)
            }
            Reservation::InFlight => {
                debug!(fingerprint = %fingerprint, "Duplicate request still in flight");
                Admission::InFlight
            }
        }
    }

    pub async fn prune(&self) -> usize {
        self.store.prune(self.clock.now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::idempotency_store::InMemoryIdempotencyStore;

    fn service() -> IdempotencyService {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(InMemoryIdempotencyStore::new(
            std::time::Duration::from_secs(60),
            100,
        ));
        IdempotencyService::new(store, clock)
    }

    fn created() -> StoredResponse {
        StoredResponse {
            status: 201,
            content_type: Some("application/json".to_string()),
            body: br#"{"id":"x"}"#.to_vec(),
        }
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        assert_eq!(
            IdempotencyService::fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(
            IdempotencyService::fingerprint(b"{\"name\":\"a\"}"),
            IdempotencyService::fingerprint(b"{\"name\": \"a\"}")
        );
    }

    #[test]
    fn test_only_post_is_fingerprinted() {
        assert!(IdempotencyService::applies_to("POST"));
        assert!(!IdempotencyService::applies_to("PUT"));
        assert!(!IdempotencyService::applies_to("GET"));
    }

    #[tokio::test]
    async fn test_duplicate_is_in_flight_then_replayed() {
        let service = service();
        let body = br#"{"name":"Megumi"}"#;

        let Admission::Proceed(pending) = service.begin(body).await else {
            panic!("first request must proceed");
        };
        assert!(matches!(service.begin(body).await, Admission::InFlight));

        pending.complete(created()).await;
        assert!(matches!(
            service.begin(body).await,
            Admission::Replay(stored) if stored == created()
        ));
    }

    #[tokio::test]
    async fn test_abandoned_reservation_can_be_retried() {
        let service = service();
        let body = br#"{"name":"Nobara"}"#;

        let Admission::Proceed(pending) = service.begin(body).await else {
            panic!("first request must proceed");
        };
        pending.abandon().await;
        assert!(matches!(service.begin(body).await, Admission::Proceed(_)));
    }

    #[tokio::test]
    async fn test_dropped_reservation_is_released() {
        let service = service();
        let body = br#"{"name":"Panda"}"#;

        let Admission::Proceed(pending) = service.begin(body).await else {
            panic!("first request must proceed");
        };
        drop(pending);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        let Admission::Proceed(retry) = service.begin(body).await else {
            panic!("retry after a dropped reservation must proceed");
        };
        retry.complete(created()).await;
        assert!(matches!(service.begin(body).await, Admission::Replay(_)));
    }
}
