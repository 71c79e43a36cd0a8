//! Durable per-session state storage for Plank.
//!
//! Each session key owns a small partition of string fields:
//!
//! ```text
//! game_ab12cd34ef56ab78
//! ├── sessionKey     "game_ab12cd34ef56ab78"
//! ├── displayName    "tictactoe"
//! ├── participantId  "user_09be44a1c0d3f512"
//! ├── state          "{\"board\":[...]}"      (JSON text)
//! └── createdAt      "1760572800000"          (optional, unix millis)
//! ```
//!
//! Fields are written independently. A session can only be rehydrated when
//! the four required fields are all present; see [`PersistedSession::load`].
//!
//! Two stores ship with the crate: [`MemoryStateStore`] (survives actor
//! restarts inside one process) and [`FileStateStore`] (survives process
//! restarts).

#![allow(async_fn_in_trait)]

mod error;
mod file;
mod memory;
mod session;

pub use error::StoreError;
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use session::PersistedSession;

use plank_protocol::SessionKey;
use serde::{Deserialize, Serialize};

/// One named field in a session's storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    SessionKey,
    DisplayName,
    ParticipantId,
    State,
    CreatedAt,
}

impl Field {
    /// The fields that must all be present for a session to exist.
    pub const REQUIRED: [Field; 4] = [
        Field::SessionKey,
        Field::DisplayName,
        Field::ParticipantId,
        Field::State,
    ];
}

/// Key-value persistence partitioned by session key.
///
/// Each session actor is the only writer of its own partition once it is
/// ready, so implementations need no cross-key transactions.
pub trait StateStore: Send + Sync + 'static {
    /// Reads one field. `Ok(None)` if it was never written.
    fn get(
        &self,
        key: &SessionKey,
        field: Field,
    ) -> impl std::future::Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Writes one field, replacing any previous value.
    fn put(
        &self,
        key: &SessionKey,
        field: Field,
        value: String,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
