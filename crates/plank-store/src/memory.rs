//! In-process state store.

use std::collections::{BTreeMap, HashMap};

use plank_protocol::SessionKey;
use tokio::sync::Mutex;

use crate::{Field, StateStore, StoreError};

/// A [`StateStore`] that lives as long as the process.
///
/// Share it behind an `Arc`: every actor instance for a key, including
/// one recreated after eviction, sees the same partition.
#[derive(Default)]
pub struct MemoryStateStore {
    partitions: Mutex<HashMap<SessionKey, BTreeMap<Field, String>>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deletes one field, simulating a partial write or a TTL'd field.
    pub async fn remove_field(&self, key: &SessionKey, field: Field) {
        if let Some(partition) = self.partitions.lock().await.get_mut(key) {
            partition.remove(&field);
        }
    }

    /// Deletes a whole partition, simulating storage-level expiry.
    pub async fn remove(&self, key: &SessionKey) {
        self.partitions.lock().await.remove(key);
    }

    /// Returns the number of sessions with at least one stored field.
    pub async fn len(&self) -> usize {
        self.partitions.lock().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.partitions.lock().await.is_empty()
    }
}

impl StateStore for MemoryStateStore {
    async fn get(&self, key: &SessionKey, field: Field) -> Result<Option<String>, StoreError> {
        let partitions = self.partitions.lock().await;
        Ok(partitions.get(key).and_then(|p| p.get(&field).cloned()))
    }

    async fn put(&self, key: &SessionKey, field: Field, value: String) -> Result<(), StoreError> {
        self.partitions
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .insert(field, value);
        Ok(())
    }
}
