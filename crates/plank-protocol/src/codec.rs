//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The session actor doesn't care HOW frames are serialized, only that
//! something implements [`Codec`]. [`JsonCodec`] is the one the browser
//! client speaks.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec is shared by every
/// connection task for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use plank_protocol::{Codec, JsonCodec, ServerFrame};
///
/// let codec = JsonCodec;
/// let frame = ServerFrame::State(serde_json::json!({ "count": 1 }));
///
/// let bytes = codec.encode(&frame).unwrap();
/// assert_eq!(bytes, br#"{"state":{"count":1}}"#);
///
/// let decoded: ServerFrame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientFrame;

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<ClientFrame, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_non_string_map_key_returns_encode_error() {
        // JSON object keys must be strings.
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], 1);
        let result = JsonCodec.encode(&map);
        assert!(matches!(result, Err(ProtocolError::Encode(_))));
    }
}
