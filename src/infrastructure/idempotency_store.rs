//! In-memory idempotency store
//!
//! Entries live for a fixed TTL and the store holds at most `max_entries`
//! recorded responses; when full, the oldest recorded response is evicted to
//! make room. In-flight reservations are never evicted.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::ports::outbound::{IdempotencyStorePort, Reservation, StoredResponse};

#[derive(Debug, Clone)]
enum EntryState {
    InFlight,
    Completed(StoredResponse),
}

#[derive(Debug, Clone)]
struct Entry {
    state: EntryState,
    touched_at: DateTime<Utc>,
}

pub struct InMemoryIdempotencyStore {
    ttl: chrono::Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryIdempotencyStore {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        now - entry.touched_at > self.ttl
    }
}

fn evict_oldest(entries: &mut HashMap<String, Entry>) {
    let oldest = entries
        .iter()
        .filter(|(_, entry)| matches!(entry.state, EntryState::Completed(_)))
        .min_by_key(|(_, entry)| entry.touched_at)
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest {
        debug!(fingerprint = %key, "Evicting oldest idempotency entry");
        entries.remove(&key);
    }
}

#[async_trait]
impl IdempotencyStorePort for InMemoryIdempotencyStore {
    async fn reserve(&self, fingerprint: &str, now: DateTime<Utc>) -> Reservation {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(fingerprint) {
            if !self.expired(entry, now) {
                return match &entry.state {
                    EntryState::InFlight => Reservation::InFlight,
                    EntryState::Completed(response) => Reservation::Completed(response.clone()),
                };
            }
            entries.remove(fingerprint);
        }

        if entries.len() >= self.max_entries {
            evict_oldest(&mut entries);
        }
        entries.insert(
            fingerprint.to_string(),
            Entry {
                state: EntryState::InFlight,
                touched_at: now,
            },
        );
        Reservation::Reserved
    }

    async fn complete(&self, fingerprint: &str, response: StoredResponse, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(fingerprint) && entries.len() >= self.max_entries {
            evict_oldest(&mut entries);
        }
        entries.insert(
            fingerprint.to_string(),
            Entry {
                state: EntryState::Completed(response),
                touched_at: now,
            },
        );
    }

    async fn release(&self, fingerprint: &str) {
        let mut entries = self.entries.lock().await;
        if matches!(
            entries.get(fingerprint).map(|e| &e.state),
            Some(EntryState::InFlight)
        ) {
            entries.remove(fingerprint);
        }
    }

    async fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now - entry.touched_at <= self.ttl);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> StoredResponse {
        StoredResponse {
            status: 201,
            content_type: None,
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let store = InMemoryIdempotencyStore::new(Duration::from_secs(10), 10);
        let start = Utc::now();

        assert_eq!(store.reserve("a", start).await, Reservation::Reserved);
        store.complete("a", response("one"), start).await;

        let later = start + chrono::Duration::seconds(10);
        assert_eq!(
            store.reserve("a", later).await,
            Reservation::Completed(response("one"))
        );

        let expired = start + chrono::Duration::seconds(11);
        assert_eq!(store.reserve("a", expired).await, Reservation::Reserved);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = InMemoryIdempotencyStore::new(Duration::from_secs(60), 2);
        let start = Utc::now();

        store.complete("a", response("a"), start).await;
        store
            .complete("b", response("b"), start + chrono::Duration::seconds(1))
            .await;
        store
            .complete("c", response("c"), start + chrono::Duration::seconds(2))
            .await;

        let now = start + chrono::Duration::seconds(3);
        assert_eq!(store.reserve("a", now).await, Reservation::Reserved);
        assert!(matches!(
            store.reserve("c", now).await,
            Reservation::Completed(_)
        ));
    }

    #[tokio::test]
    async fn test_capacity_keeps_in_flight_reservations() {
        let store = InMemoryIdempotencyStore::new(Duration::from_secs(60), 2);
        let start = Utc::now();

        assert_eq!(store.reserve("a", start).await, Reservation::Reserved);
        store
            .complete("b", response("b"), start + chrono::Duration::seconds(1))
            .await;
        let now = start + chrono::Duration::seconds(2);
        assert_eq!(store.reserve("c", now).await, Reservation::Reserved);

        assert_eq!(store.reserve("a", now).await, Reservation::InFlight);
        assert_eq!(store.reserve("c", now).await, Reservation::InFlight);
        assert_eq!(store.reserve("b", now).await, Reservation::Reserved);
    }

    #[tokio::test]
    async fn test_release_only_drops_in_flight() {
        let store = InMemoryIdempotencyStore::new(Duration::from_secs(60), 10);
        let now = Utc::now();

        store.complete("done", response("x"), now).await;
        store.release("done").await;
        assert!(matches!(
            store.reserve("done", now).await,
            Reservation::Completed(_)
        ));

        store.reserve("pending", now).await;
        store.release("pending").await;
        assert_eq!(store.reserve("pending", now).await, Reservation::Reserved);
    }

    #[tokio::test]
    async fn test_prune_counts_removed_entries() {
        let store = InMemoryIdempotencyStore::new(Duration::from_secs(5), 10);
        let now = Utc::now();
        store.complete("a", response("a"), now).await;
        store
            .complete("b", response("b"), now + chrono::Duration::seconds(4))
            .await;

        assert_eq!(store.prune(now + chrono::Duration::seconds(6)).await, 1);
    }
}
