//! Random identifier generation.
//!
//! Every identifier is lowercase hex drawn from the thread-local CSPRNG,
//! behind a short prefix that makes logs readable at a glance.

use crate::{Nonce, ParticipantId, SessionKey};

/// Random bytes in a session key or participant id (64 bits).
const ID_BYTES: usize = 8;

/// Random bytes in a login nonce (240 bits).
const NONCE_BYTES: usize = 30;

/// Generates a fresh session key, e.g. `game_3f9a0c1d22b4e871`.
pub fn generate_session_key() -> SessionKey {
    SessionKey(format!("game_{}", random_hex(ID_BYTES)))
}

/// Generates a fresh participant id, e.g. `user_09be44a1c0d3f512`.
pub fn generate_participant_id() -> ParticipantId {
    ParticipantId(format!("user_{}", random_hex(ID_BYTES)))
}

/// Generates a login nonce: 60 hex characters, no prefix.
pub fn generate_nonce() -> Nonce {
    Nonce(random_hex(NONCE_BYTES))
}

fn random_hex(len: usize) -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    }

    #[test]
    fn test_session_key_has_prefix_and_sixteen_hex_chars() {
        let key = generate_session_key();
        let hex = key.as_str().strip_prefix("game_").expect("prefix");
        assert_eq!(hex.len(), 16);
        assert!(is_lower_hex(hex));
    }

    #[test]
    fn test_participant_id_has_prefix_and_sixteen_hex_chars() {
        let id = generate_participant_id();
        let hex = id.as_str().strip_prefix("user_").expect("prefix");
        assert_eq!(hex.len(), 16);
        assert!(is_lower_hex(hex));
    }

    #[test]
    fn test_nonce_is_sixty_hex_chars() {
        let nonce = generate_nonce();
        assert_eq!(nonce.as_str().len(), 60);
        assert!(is_lower_hex(nonce.as_str()));
    }

    #[test]
    fn test_generated_keys_do_not_collide() {
        let keys: std::collections::HashSet<_> =
            (0..1000).map(|_| generate_session_key()).collect();
        assert_eq!(keys.len(), 1000);
    }
}
