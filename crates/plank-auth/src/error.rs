//! Error types for the auth layer.

/// Errors that can occur while issuing or checking credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request carried no bearer token or subprotocol token at all.
    #[error("missing credential")]
    MissingCredential,

    /// The nonce is unknown or its TTL has elapsed. The two cases are
    /// deliberately indistinguishable to callers.
    #[error("unknown or expired nonce")]
    UnknownNonce,

    /// The backing credential store could not be reached.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}
