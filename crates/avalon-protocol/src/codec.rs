//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The dispatcher never cares how bytes are produced; it only needs
//! something implementing [`Codec`]. [`JsonCodec`] is the default and the
//! only one shipped today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use avalon_protocol::{ClientCommand, Codec, GameId, JsonCodec};
///
/// let codec = JsonCodec;
/// let cmd = ClientCommand::StartGame { game_id: GameId(1) };
///
/// let bytes = codec.encode(&cmd).unwrap();
/// let decoded: ClientCommand = codec.decode(&bytes).unwrap();
/// assert_eq!(cmd, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientCommand, GameId};

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result: Result<ClientCommand, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_produces_tagged_json() {
        let bytes = JsonCodec
            .encode(&ClientCommand::ConfirmTeam { game_id: GameId(5) })
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"type\":\"ConfirmTeam\""));
        assert!(text.contains("\"game_id\":5"));
    }
}
