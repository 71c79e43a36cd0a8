//! Guest credential issuance.

use std::time::Duration;

use plank_protocol::{GuestLogin, generate_nonce, generate_participant_id};

use crate::{AuthError, CredentialStore};

/// The only login kind Plank knows about.
pub const GUEST_KIND: &str = "guest";

/// Settings for credential issuance.
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// How long (in seconds) a guest nonce stays valid.
    ///
    /// Default: one hour.
    pub guest_ttl_secs: u64,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            guest_ttl_secs: 60 * 60,
        }
    }
}

impl CredentialConfig {
    pub fn guest_ttl(&self) -> Duration {
        Duration::from_secs(self.guest_ttl_secs)
    }
}

/// Mints a fresh guest identity and records its nonce.
///
/// This is the only write path into the credential store.
pub async fn issue_guest<S: CredentialStore>(
    store: &S,
    config: &CredentialConfig,
) -> Result<GuestLogin, AuthError> {
    let participant_id = generate_participant_id();
    let nonce = generate_nonce();

    store
        .put(nonce.clone(), participant_id.clone(), config.guest_ttl())
        .await?;

    tracing::info!(%participant_id, ttl_secs = config.guest_ttl_secs, "guest credential issued");
    Ok(GuestLogin {
        participant_id,
        nonce,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCredentialStore;

    #[test]
    fn test_credential_config_default_is_one_hour() {
        assert_eq!(CredentialConfig::default().guest_ttl(), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_issue_guest_records_nonce() {
        let store = MemoryCredentialStore::new();
        let login = issue_guest(&store, &CredentialConfig::default()).await.unwrap();

        let found = store.lookup(&login.nonce).await.unwrap();
        assert_eq!(found, Some(login.participant_id));
    }

    #[tokio::test]
    async fn test_issue_guest_twice_gives_distinct_identities() {
        let store = MemoryCredentialStore::new();
        let config = CredentialConfig::default();
        let a = issue_guest(&store, &config).await.unwrap();
        let b = issue_guest(&store, &config).await.unwrap();

        assert_ne!(a.participant_id, b.participant_id);
        assert_ne!(a.nonce, b.nonce);
    }

    #[tokio::test(start_paused = true)]
    async fn test_issued_guest_expires_after_ttl() {
        let store = MemoryCredentialStore::new();
        let config = CredentialConfig { guest_ttl_secs: 5 };
        let login = issue_guest(&store, &config).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(store.lookup(&login.nonce).await.unwrap().is_none());
    }
}
