//! Authentication hook for validating participant identity.
//!
//! The session layer only needs one question answered: "who is holding
//! this token?" [`Authenticator`] is that question as a trait, so tests
//! can swap in a fake and production can put something other than guest
//! nonces behind it.

use std::sync::Arc;

use plank_protocol::{Nonce, ParticipantId};

use crate::{AuthError, CredentialStore};

/// Validates a client's token and returns their identity.
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the given token and returns the participant's identity.
    ///
    /// # Returns
    /// - `Ok(ParticipantId)`: the token is valid
    /// - `Err(AuthError::UnknownNonce)`: unknown or expired
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<ParticipantId, AuthError>> + Send;
}

/// Authenticates guest nonces against a [`CredentialStore`].
pub struct NonceAuthenticator<S: CredentialStore> {
    store: Arc<S>,
}

impl<S: CredentialStore> NonceAuthenticator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: CredentialStore> Clone for NonceAuthenticator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CredentialStore> Authenticator for NonceAuthenticator<S> {
    async fn authenticate(&self, token: &str) -> Result<ParticipantId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        match self.store.lookup(&Nonce::from(token)).await? {
            Some(participant_id) => {
                tracing::debug!(%participant_id, "authenticated guest");
                Ok(participant_id)
            }
            None => Err(AuthError::UnknownNonce),
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively and the token must be a single
/// word (`[A-Za-z0-9_]+`). Returns `None` for anything else.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    let is_word = !token.is_empty()
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_word.then_some(token)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::MemoryCredentialStore;

    async fn authenticator_with(nonce: &str, participant: &str) -> NonceAuthenticator<MemoryCredentialStore> {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .put(Nonce::from(nonce), ParticipantId::from(participant), Duration::from_secs(60))
            .await
            .unwrap();
        NonceAuthenticator::new(store)
    }

    #[tokio::test]
    async fn test_authenticate_known_nonce_succeeds() {
        let auth = authenticator_with("abc123", "user_1").await;
        let pid = auth.authenticate("abc123").await.unwrap();
        assert_eq!(pid, ParticipantId::from("user_1"));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_nonce_fails_closed() {
        let auth = authenticator_with("abc123", "user_1").await;
        let result = auth.authenticate("zzz").await;
        assert!(matches!(result, Err(AuthError::UnknownNonce)));
    }

    #[tokio::test]
    async fn test_authenticate_empty_token_is_missing_credential() {
        let auth = authenticator_with("abc123", "user_1").await;
        let result = auth.authenticate("").await;
        assert!(matches!(result, Err(AuthError::MissingCredential)));
    }

    #[test]
    fn test_bearer_token_extracts_token() {
        assert_eq!(bearer_token("Bearer abc_123"), Some("abc_123"));
    }

    #[test]
    fn test_bearer_token_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER abc"), Some("abc"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
    }

    #[test]
    fn test_bearer_token_rejects_non_word_tokens() {
        assert_eq!(bearer_token("Bearer abc.def"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
