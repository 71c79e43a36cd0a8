//! Error types for the session layer.

use plank_auth::AuthError;
use plank_protocol::{ProtocolError, SessionKey};
use plank_store::StoreError;

use crate::EngineError;

/// Errors that can occur during session operations.
///
/// The first four variants are the client-facing taxonomy and carry an HTTP
/// status via [`GameError::status`]. The rest are infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No session is stored under this key.
    #[error("session {0} not found")]
    NotFound(SessionKey),

    /// No engine exists for the requested game.
    #[error(transparent)]
    UnknownGame(#[from] EngineError),

    /// The connection did not authenticate.
    #[error("forbidden: {0}")]
    Forbidden(#[from] AuthError),

    /// The session was already initialized. Initialization is not
    /// idempotent: a second call would overwrite the committed state.
    #[error("session {0} already initialized")]
    AlreadyInitialized(SessionKey),

    /// The actor instance is gone. Retry on a fresh instance.
    #[error("session {0} is unavailable")]
    Unavailable(SessionKey),

    /// Persisting or loading state failed. The actor instance stops.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A fatal error inside the actor, reported to whoever was waiting.
    #[error("session {key} failed: {reason}")]
    ActorFailed { key: SessionKey, reason: String },
}

impl GameError {
    /// The HTTP status code that describes this error to a client.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::UnknownGame(_) => 404,
            Self::Forbidden(_) => 403,
            Self::AlreadyInitialized(_) => 409,
            Self::Unavailable(_) => 503,
            Self::Store(_) | Self::Protocol(_) | Self::ActorFailed { .. } => 500,
        }
    }

    /// The message sent to clients. Infrastructure details stay in the logs.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::UnknownGame(_) => "Game not found",
            Self::Forbidden(_) => "Forbidden",
            Self::AlreadyInitialized(_) => "Game already initialized",
            Self::Unavailable(_) => "Game unavailable",
            Self::Store(_) | Self::Protocol(_) | Self::ActorFailed { .. } => {
                "Internal server error"
            }
        }
    }

    /// Returns `true` if this error must stop the actor instance that hit it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Protocol(_))
    }
}
