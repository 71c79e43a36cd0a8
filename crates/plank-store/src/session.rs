//! Typed view over a session's storage partition.

use std::time::{SystemTime, UNIX_EPOCH};

use plank_protocol::{ParticipantId, SessionKey};
use serde_json::Value;

use crate::{Field, StateStore, StoreError};

/// Everything needed to rehydrate a session actor.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub session_key: SessionKey,
    pub display_name: String,
    /// The participant who created the session.
    pub participant_id: ParticipantId,
    /// The latest committed engine state.
    pub state: Value,
    /// Unix milliseconds. Absent for sessions written without it.
    pub created_at: Option<u64>,
}

impl PersistedSession {
    /// Reads all fields of `key` concurrently.
    ///
    /// Returns `Ok(None)` unless the four required fields are all present:
    /// a partially written session is indistinguishable from one that never
    /// existed.
    pub async fn load<S: StateStore>(
        store: &S,
        key: &SessionKey,
    ) -> Result<Option<Self>, StoreError> {
        let (session_key, display_name, participant_id, state, created_at) = tokio::try_join!(
            store.get(key, Field::SessionKey),
            store.get(key, Field::DisplayName),
            store.get(key, Field::ParticipantId),
            store.get(key, Field::State),
            store.get(key, Field::CreatedAt),
        )?;

        let (Some(session_key), Some(display_name), Some(participant_id), Some(state)) =
            (session_key, display_name, participant_id, state)
        else {
            return Ok(None);
        };

        let state = serde_json::from_str(&state).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: format!("state is not JSON: {e}"),
        })?;

        Ok(Some(Self {
            session_key: SessionKey(session_key),
            display_name,
            participant_id: ParticipantId(participant_id),
            state,
            created_at: created_at.and_then(|c| c.parse().ok()),
        }))
    }

    /// Writes the immutable metadata of a newly created session.
    ///
    /// The state field is written separately by [`save_state`](Self::save_state)
    /// once the engine has produced its initial state.
    pub async fn save_metadata<S: StateStore>(
        store: &S,
        key: &SessionKey,
        display_name: &str,
        participant_id: &ParticipantId,
    ) -> Result<u64, StoreError> {
        let created_at = now_millis();
        tokio::try_join!(
            store.put(key, Field::SessionKey, key.to_string()),
            store.put(key, Field::DisplayName, display_name.to_owned()),
            store.put(key, Field::ParticipantId, participant_id.to_string()),
            store.put(key, Field::CreatedAt, created_at.to_string()),
        )?;
        Ok(created_at)
    }

    /// Commits an engine state.
    pub async fn save_state<S: StateStore>(
        store: &S,
        key: &SessionKey,
        state: &Value,
    ) -> Result<(), StoreError> {
        store.put(key, Field::State, state.to_string()).await
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
