//! Codec seam: how envelopes become bytes and back.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes and decodes wire messages.
///
/// The rest of the stack is codec-agnostic; swapping JSON for a binary
/// format touches nothing but the server builder.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a value from bytes.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// The default JSON codec. Human-readable, easy to debug in DevTools.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Channel, Envelope, Payload, SystemMessage};

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec;
        let envelope = Envelope {
            seq: 1,
            timestamp: 5_000,
            channel: Channel::ReliableOrdered,
            payload: Payload::System(SystemMessage::Heartbeat {
                client_time: 5_000,
            }),
        };
        let bytes = codec.encode(&envelope).unwrap();
        let decoded: Envelope = codec.decode(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_json_codec_decode_garbage_fails() {
        let codec = JsonCodec;
        let result: Result<Envelope, _> = codec.decode(b"not json at all");
        assert!(result.is_err());
    }
}
