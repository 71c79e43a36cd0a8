//! Core protocol types for Plank's wire format.
//!
//! Every frame is a JSON object with exactly one top-level key that says
//! what it is:
//!
//! ```text
//! server → client   {"connected": {...}}   first frame after admission
//!                   {"state": <state>}     every engine emission
//!                   {"error": {...}}       admission failure
//! client → server   {"action": <action>}   a player move
//! ```
//!
//! Serde's default *externally tagged* enum representation produces exactly
//! this shape, so [`ServerFrame`] and [`ClientFrame`] are plain enums with
//! `rename_all = "camelCase"`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The globally unique key of one game session, e.g. `game_ab12cd34ef56ab78`.
///
/// Newtype over `String` so a session key can't be passed where a
/// participant id is expected. `#[serde(transparent)]` keeps it a bare
/// string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(pub String);

impl SessionKey {
    /// Borrows the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifies one participant, e.g. `user_09be44a1c0d3f512`.
///
/// Issued at guest login and bound to a [`Nonce`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Borrows the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A short-lived login secret. Presented as a bearer token.
///
/// `Debug` is redacted so nonces never end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(pub String);

impl Nonce {
    /// Borrows the nonce as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Nonce([REDACTED])")
    }
}

impl From<&str> for Nonce {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Stream frames
// ---------------------------------------------------------------------------

/// Session metadata sent once, right after a connection is admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedInfo {
    /// The game kind the session was created with.
    pub display_name: String,
    /// The session this connection is attached to.
    pub session_key: SessionKey,
    /// The current engine state at the moment of admission.
    pub state: Value,
    /// Who this connection authenticated as.
    pub participant_id: ParticipantId,
}

/// Body of an error frame or error response: `{"message": .., "status": ..}`.
///
/// `status` reuses HTTP status codes (403, 404, 400) so the browser client
/// handles stream errors and HTTP errors the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub status: u16,
}

impl ErrorBody {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }
}

/// A frame sent from the server to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerFrame {
    /// Admission succeeded. Always the first frame on a live connection.
    Connected(ConnectedInfo),
    /// An engine emission, broadcast verbatim to every connection.
    State(Value),
    /// Admission failed. The stream stays open but inert afterwards.
    Error(ErrorBody),
}

/// A frame sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientFrame {
    /// A player action, forwarded to the engine untouched.
    Action(Value),
}

// ---------------------------------------------------------------------------
// HTTP response bodies
// ---------------------------------------------------------------------------

/// Response to `GET /login/guest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestLogin {
    pub participant_id: ParticipantId,
    pub nonce: Nonce,
}

/// Response to `GET /game/new/:name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_key: SessionKey,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client matches on exact JSON shapes, so these tests pin
    //! the serde attributes down.

    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_key_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionKey::from("game_1")).unwrap();
        assert_eq!(json, "\"game_1\"");
    }

    #[test]
    fn test_participant_id_display() {
        assert_eq!(ParticipantId::from("user_7").to_string(), "user_7");
    }

    #[test]
    fn test_nonce_debug_is_redacted() {
        let nonce = Nonce::from("super-secret");
        assert!(!format!("{nonce:?}").contains("super-secret"));
    }

    #[test]
    fn test_connected_frame_json_format() {
        let frame = ServerFrame::Connected(ConnectedInfo {
            display_name: "tictactoe".into(),
            session_key: "game_ab12cd34".into(),
            state: json!({ "board": [] }),
            participant_id: "user_1".into(),
        });
        let value = serde_json::to_value(&frame).unwrap();

        assert_eq!(
            value,
            json!({
                "connected": {
                    "displayName": "tictactoe",
                    "sessionKey": "game_ab12cd34",
                    "state": { "board": [] },
                    "participantId": "user_1"
                }
            })
        );
    }

    #[test]
    fn test_state_frame_json_format() {
        let frame = ServerFrame::State(json!([1, 2, 3]));
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value, json!({ "state": [1, 2, 3] }));
    }

    #[test]
    fn test_error_frame_json_format() {
        let frame = ServerFrame::Error(ErrorBody::new(403, "Forbidden"));
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({ "error": { "message": "Forbidden", "status": 403 } })
        );
    }

    #[test]
    fn test_action_frame_decodes() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"action": {"row": 1, "col": 2}}"#).unwrap();
        assert_eq!(frame, ClientFrame::Action(json!({ "row": 1, "col": 2 })));
    }

    #[test]
    fn test_unknown_client_frame_is_rejected() {
        let result: Result<ClientFrame, _> =
            serde_json::from_str(r#"{"flyToMoon": 9000}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_bare_action_without_envelope_is_rejected() {
        let result: Result<ClientFrame, _> =
            serde_json::from_str(r#"{"row": 1, "col": 2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_guest_login_json_format() {
        let login = GuestLogin {
            participant_id: "user_1".into(),
            nonce: "abc".into(),
        };
        let value = serde_json::to_value(&login).unwrap();
        assert_eq!(value, json!({ "participantId": "user_1", "nonce": "abc" }));
    }

    #[test]
    fn test_session_created_json_format() {
        let created = SessionCreated {
            session_key: "game_1".into(),
        };
        let value = serde_json::to_value(&created).unwrap();
        assert_eq!(value, json!({ "sessionKey": "game_1" }));
    }
}
