//! The credential store: nonce → participant, with expiry.
//!
//! The login flow is the only writer; the session actor's admission path
//! only ever reads. Records are never mutated after insertion.

use std::collections::HashMap;
use std::time::Duration;

use plank_protocol::{Nonce, ParticipantId};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::AuthError;

/// Persistence for nonce credentials.
///
/// Implementations must treat an expired record exactly like a missing
/// one.
pub trait CredentialStore: Send + Sync + 'static {
    /// Records `nonce → participant` for `ttl`.
    fn put(
        &self,
        nonce: Nonce,
        participant: ParticipantId,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), AuthError>> + Send;

    /// Resolves a nonce. `Ok(None)` for unknown or expired nonces.
    fn lookup(
        &self,
        nonce: &Nonce,
    ) -> impl std::future::Future<Output = Result<Option<ParticipantId>, AuthError>> + Send;
}

/// A credential record and the instant it stops being valid.
struct Record {
    participant: ParticipantId,
    expires_at: Instant,
}

/// In-process [`CredentialStore`].
///
/// Uses Tokio's clock so tests can pause and advance time instead of
/// sleeping through a TTL.
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<HashMap<Nonce, Record>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired record and returns how many were removed.
    ///
    /// Lookups already ignore expired records; this only reclaims memory.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| record.expires_at > now);
        let purged = before - records.len();
        if purged > 0 {
            tracing::debug!(purged, "purged expired credentials");
        }
        purged
    }

    /// Returns the number of stored records, expired ones included.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Returns `true` if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    async fn put(
        &self,
        nonce: Nonce,
        participant: ParticipantId,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let record = Record {
            participant,
            expires_at: Instant::now() + ttl,
        };
        self.records.lock().await.insert(nonce, record);
        Ok(())
    }

    async fn lookup(&self, nonce: &Nonce) -> Result<Option<ParticipantId>, AuthError> {
        let mut records = self.records.lock().await;
        match records.get(nonce) {
            Some(record) if record.expires_at > Instant::now() => {
                Ok(Some(record.participant.clone()))
            }
            Some(_) => {
                records.remove(nonce);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! TTL behaviour is tested with Tokio's paused clock: `start_paused`
    //! freezes time and `tokio::time::advance` moves it forward instantly.

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_lookup_known_nonce_returns_participant() {
        let store = MemoryCredentialStore::new();
        store
            .put(Nonce::from("n1"), ParticipantId::from("user_1"), HOUR)
            .await
            .unwrap();

        let found = store.lookup(&Nonce::from("n1")).await.unwrap();
        assert_eq!(found, Some(ParticipantId::from("user_1")));
    }

    #[tokio::test]
    async fn test_lookup_unknown_nonce_returns_none() {
        let store = MemoryCredentialStore::new();
        let found = store.lookup(&Nonce::from("nope")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_lookup_is_repeatable_within_ttl() {
        // A nonce is looked up once per admission, and a participant may
        // open several connections.
        let store = MemoryCredentialStore::new();
        store
            .put(Nonce::from("n1"), ParticipantId::from("user_1"), HOUR)
            .await
            .unwrap();

        assert!(store.lookup(&Nonce::from("n1")).await.unwrap().is_some());
        assert!(store.lookup(&Nonce::from("n1")).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_expired_nonce_behaves_like_absent() {
        let store = MemoryCredentialStore::new();
        store
            .put(Nonce::from("n1"), ParticipantId::from("user_1"), HOUR)
            .await
            .unwrap();

        tokio::time::advance(HOUR + Duration::from_secs(1)).await;

        assert!(store.lookup(&Nonce::from("n1")).await.unwrap().is_none());
        assert!(store.is_empty().await, "expired record removed on lookup");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_just_before_expiry_still_succeeds() {
        let store = MemoryCredentialStore::new();
        store
            .put(Nonce::from("n1"), ParticipantId::from("user_1"), HOUR)
            .await
            .unwrap();

        tokio::time::advance(HOUR - Duration::from_secs(1)).await;

        assert!(store.lookup(&Nonce::from("n1")).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_removes_only_stale_records() {
        let store = MemoryCredentialStore::new();
        store
            .put(Nonce::from("short"), ParticipantId::from("user_1"), Duration::from_secs(10))
            .await
            .unwrap();
        store
            .put(Nonce::from("long"), ParticipantId::from("user_2"), HOUR)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.lookup(&Nonce::from("long")).await.unwrap().is_some());
    }
}
