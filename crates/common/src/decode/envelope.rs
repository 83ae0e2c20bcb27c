//! Typed payload envelopes (`google.protobuf.Any`): a type URL in field 1
//! and opaque payload bytes in field 2.

use prost::Message;
use serde::{Deserialize, Serialize};

use super::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub type_url: String,
    pub payload: Vec<u8>,
    pub payload_size: usize,
}

impl Envelope {
    /// Payload as display text; non UTF-8 bytes are replaced.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Decode a complete envelope. Truncated or malformed input is an error,
/// unknown fields are skipped.
pub fn decode_envelope(raw: &[u8]) -> Result<Envelope, DecodeError> {
    let any = prost_types::Any::decode(raw)?;
    Ok(Envelope {
        type_url: any.type_url,
        payload_size: any.value.len(),
        payload: any.value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPE_URL: &str = "types.containerd.io/opencontainers/runtime-spec/1/Spec";

    fn encode(type_url: &str, payload: &[u8]) -> Vec<u8> {
        let mut raw = vec![0x0a, type_url.len() as u8];
        raw.extend_from_slice(type_url.as_bytes());
        raw.extend_from_slice(&[0x12, payload.len() as u8]);
        raw.extend_from_slice(payload);
        raw
    }

    #[test]
    fn test_decode() {
        let envelope = decode_envelope(&encode(TYPE_URL, br#"{"ociVersion":"1.1.0"}"#)).unwrap();
        assert_eq!(envelope.type_url, TYPE_URL);
        assert_eq!(envelope.payload_size, 22);
        assert_eq!(envelope.payload_text(), r#"{"ociVersion":"1.1.0"}"#);
    }

    #[test]
    fn test_matches_prost_encoding() {
        let any = prost_types::Any {
            type_url: TYPE_URL.to_string(),
            value: vec![b'o', b'k', 0xff, 0xfe],
        };
        let envelope = decode_envelope(&any.encode_to_vec()).unwrap();
        assert_eq!(envelope.payload, any.value);
        assert_eq!(envelope.payload_text(), "ok\u{fffd}\u{fffd}");
    }

    #[test]
    fn test_unknown_field_skipped() {
        let mut raw = encode(TYPE_URL, b"x");
        // field 5, varint 7
        raw.extend_from_slice(&[0x28, 0x07]);
        let envelope = decode_envelope(&raw).unwrap();
        assert_eq!(envelope.payload, b"x");
    }

    #[test]
    fn test_truncated_length_prefix() {
        let raw = encode(TYPE_URL, b"payload");
        let result = decode_envelope(&raw[..raw.len() - 3]);
        assert!(matches!(result, Err(DecodeError::Envelope(_))));
    }

    #[test]
    fn test_length_beyond_buffer() {
        assert!(decode_envelope(&[0x0a, 0x7f, b'a']).is_err());
    }

    #[test]
    fn test_malformed_varint() {
        assert!(decode_envelope(&[0x0a, 0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_invalid_wire_type() {
        // field 1 with wire type 7
        assert!(decode_envelope(&[0x0f, 0x00]).is_err());
    }
}
