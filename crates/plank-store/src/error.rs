//! Error types for the storage layer.

use plank_protocol::SessionKey;

/// Errors that can occur while reading or writing session state.
///
/// None of these are "the session doesn't exist"; a missing session is
/// `Ok(None)`. A `StoreError` means the store itself misbehaved, and the
/// actor that hit it is expected to fail.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be parsed.
    #[error("stored data for {key} is corrupt: {reason}")]
    Corrupt { key: SessionKey, reason: String },

    /// The session key can't be used as a storage key (e.g. it contains
    /// path separators).
    #[error("invalid storage key: {0}")]
    InvalidKey(SessionKey),
}
