//! Wire envelopes and frame codec.

use coinex_core::error::{ApiError, FrameError};
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::borrow::Cow;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Outbound request: `{id, method, params}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation id minted by the owning session.
    pub id: u64,
    /// Method name, e.g. `server.time` or `depth.subscribe`.
    pub method: String,
    /// Method parameters.
    pub params: Value,
}

impl RequestEnvelope {
    /// Creates a request envelope.
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// Inbound envelope: `{id, code, method?, data, message}`.
///
/// Pushes carry `id: null` (decoded as 0) and the push method name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Correlation id, 0 for unsolicited pushes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    /// Result code, 0 on success.
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: i64,
    /// Push topic, e.g. `depth.update`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Opaque payload.
    #[serde(default)]
    pub data: Value,
    /// Human readable result message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ResponseEnvelope {
    /// Returns true if `code == 0`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Returns the push topic when present and non-empty.
    #[must_use]
    pub fn push_method(&self) -> Option<&str> {
        self.method.as_deref().filter(|m| !m.is_empty())
    }

    /// Converts a nonzero code into an [`ApiError`].
    pub fn into_result(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::new(self.code, self.message))
        }
    }

    /// Deserializes `data` into `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        T::deserialize(&self.data).map_err(|e| FrameError::UnexpectedPayload {
            method: self.method.clone().unwrap_or_default(),
            reason: e.to_string(),
        })
    }

    /// Reads `data.timestamp`, sent either as a number or a decimal string.
    #[must_use]
    pub fn server_timestamp(&self) -> Option<i64> {
        match self.data.get("timestamp")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Codec between envelopes and WebSocket payloads.
///
/// Inbound frames are normally gzip; zlib, raw deflate and plain JSON text
/// are accepted as well. Outbound frames are compact JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Decodes one inbound frame.
    ///
    /// ```
    /// use coinex_gateway::ws::FrameCodec;
    ///
    /// let envelope = FrameCodec::decode(br#"{"id":1,"code":0,"data":{},"message":"OK"}"#).unwrap();
    /// assert_eq!(envelope.id, 1);
    /// ```
    pub fn decode(raw: &[u8]) -> Result<ResponseEnvelope, FrameError> {
        let payload = Self::inflate(raw)?;
        serde_json::from_slice(&payload).map_err(|e| FrameError::Parse {
            reason: e.to_string(),
        })
    }

    /// Encodes a request envelope as compact JSON.
    pub fn encode(envelope: &RequestEnvelope) -> Result<String, FrameError> {
        serde_json::to_string(envelope).map_err(|e| FrameError::Encode {
            reason: e.to_string(),
        })
    }

    fn inflate(raw: &[u8]) -> Result<Cow<'_, [u8]>, FrameError> {
        if raw.starts_with(&GZIP_MAGIC) {
            return read_all(GzDecoder::new(raw)).map(Cow::Owned);
        }
        if looks_like_json(raw) {
            return Ok(Cow::Borrowed(raw));
        }
        read_all(ZlibDecoder::new(raw))
            .or_else(|_| read_all(DeflateDecoder::new(raw)))
            .map(Cow::Owned)
    }
}

fn read_all<R: Read>(mut decoder: R) -> Result<Vec<u8>, FrameError> {
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| FrameError::Decompress {
            reason: e.to_string(),
        })?;
    Ok(out)
}

fn looks_like_json(raw: &[u8]) -> bool {
    raw.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{' || *b == b'[')
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use serde_json::json;
    use std::io::Write;

    pub(crate) fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    const PUSH: &str = r#"{"method":"state.update","data":{"state_list":[{"market":"BTCUSDT"}]},"id":null}"#;

    #[test]
    fn test_decode_gzip_push() {
        let envelope = FrameCodec::decode(&gzip(PUSH)).unwrap();
        assert_eq!(envelope.id, 0);
        assert_eq!(envelope.code, 0);
        assert_eq!(envelope.push_method(), Some("state.update"));
        assert_eq!(envelope.data["state_list"][0]["market"], "BTCUSDT");
    }

    #[test]
    fn test_decode_zlib_and_deflate() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::fast());
        zlib.write_all(PUSH.as_bytes()).unwrap();
        let zlib = zlib.finish().unwrap();
        assert!(FrameCodec::decode(&zlib).unwrap().push_method().is_some());

        let mut deflate = DeflateEncoder::new(Vec::new(), Compression::fast());
        deflate.write_all(PUSH.as_bytes()).unwrap();
        let deflate = deflate.finish().unwrap();
        assert!(FrameCodec::decode(&deflate).unwrap().push_method().is_some());
    }

    #[test]
    fn test_decode_plain_text() {
        let envelope =
            FrameCodec::decode(br#" {"id":7,"code":20001,"data":null,"message":"bad"}"#).unwrap();
        assert_eq!(envelope.id, 7);
        assert!(!envelope.is_success());
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.code, 20001);
        assert_eq!(err.message, "bad");
    }

    #[test]
    fn test_decode_malformed() {
        let err = FrameCodec::decode(&[0x1f, 0x8b, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, FrameError::Decompress { .. }));

        let err = FrameCodec::decode(&gzip("not json")).unwrap_err();
        assert!(matches!(err, FrameError::Parse { .. }));
        assert!(err.is_malformed_frame());
    }

    #[test]
    fn test_encode_compact() {
        let envelope = RequestEnvelope::new(3, "server.ping", json!({}));
        assert_eq!(
            FrameCodec::encode(&envelope).unwrap(),
            r#"{"id":3,"method":"server.ping","params":{}}"#
        );
    }

    #[test]
    fn test_server_timestamp_forms() {
        let numeric = FrameCodec::decode(br#"{"id":1,"code":0,"data":{"timestamp":1700490703564},"message":"OK"}"#).unwrap();
        assert_eq!(numeric.server_timestamp(), Some(1_700_490_703_564));

        let string = FrameCodec::decode(br#"{"id":1,"code":0,"data":{"timestamp":"1700490703564"},"message":"OK"}"#).unwrap();
        assert_eq!(string.server_timestamp(), Some(1_700_490_703_564));

        let missing = FrameCodec::decode(br#"{"id":1,"code":0,"data":{},"message":"OK"}"#).unwrap();
        assert_eq!(missing.server_timestamp(), None);
    }

    #[test]
    fn test_data_as_reports_method() {
        let envelope = FrameCodec::decode(br#"{"method":"bbo.update","data":[1,2]}"#).unwrap();
        let err = envelope.data_as::<std::collections::BTreeMap<String, i64>>().unwrap_err();
        assert!(err.to_string().contains("bbo.update"));
    }
}
