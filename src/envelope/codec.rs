//! JSON envelope wrapping a payload together with its span context.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::trace::{B3Map, B3Propagator, ContextError, Propagator, SpanContext};
use crate::{Error, Result};

/// JSON field holding the serialized span context.
pub const CONTEXT_FIELD: &str = "natsSpanContextB3Map";

/// JSON field holding the base64 encoded payload.
pub const DATA_FIELD: &str = "data";

/// A serialized span context as found in an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextToken {
    /// A B3 header map (the form written by this crate).
    Map(B3Map),
    /// A B3 single header string, written by older senders.
    Single(String),
}

impl ContextToken {
    /// Returns `true` if the token carries nothing at all.
    pub fn is_empty(&self) -> bool {
        match self {
            ContextToken::Map(map) => map.is_empty(),
            ContextToken::Single(value) => value.is_empty(),
        }
    }

    /// Parses the span context held in the token.
    pub fn decode(&self) -> std::result::Result<SpanContext, ContextError> {
        match self {
            ContextToken::Map(map) => map.decode(),
            ContextToken::Single(value) => {
                let headers = HashMap::from([(B3Propagator::B3.to_string(), value.clone())]);
                B3Propagator::single().extract(&headers)
            },
        }
    }
}

impl From<B3Map> for ContextToken {
    fn from(map: B3Map) -> Self {
        ContextToken::Map(map)
    }
}

/// The result of unwrapping a payload.
///
/// `context` is `None` when the bytes were not an envelope; `payload` is then
/// the original bytes, unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    context: Option<ContextToken>,
    payload: Bytes,
}

impl Envelope {
    /// An envelope-less payload.
    pub fn absent(payload: Bytes) -> Self {
        Self { context: None, payload }
    }

    /// Returns the context token, if the bytes were an envelope.
    pub fn context(&self) -> Option<&ContextToken> {
        self.context.as_ref()
    }

    /// Returns the unwrapped payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Splits the envelope into its token and payload.
    pub fn into_parts(self) -> (Option<ContextToken>, Bytes) {
        (self.context, self.payload)
    }
}

#[derive(Serialize)]
struct WireEnvelope<'a> {
    #[serde(rename = "natsSpanContextB3Map")]
    context: &'a B3Map,
    data: String,
}

/// Wraps and unwraps payloads in the JSON envelope.
///
/// The canonical wire shape is
/// `{"natsSpanContextB3Map": {...}, "data": "<base64>"}`. With `legacy`
/// enabled (the default) older shapes are also decoded: a B3 single header
/// string in place of the map, and a data field holding an arbitrary JSON
/// value whose raw text becomes the payload.
///
/// ## Example
///
/// ```rust
/// use bytes::Bytes;
/// use natstrace::envelope::EnvelopeCodec;
/// use natstrace::trace::{B3Map, SpanContext, SpanId, TraceId};
///
/// let codec = EnvelopeCodec::default();
/// let token = B3Map::encode(&SpanContext::new(TraceId::from_u64(1), SpanId::new(1)));
///
/// let wrapped = codec.wrap(br#"{"Name":"bob"}"#, &token).unwrap();
/// let envelope = codec.unwrap(wrapped);
/// assert_eq!(envelope.payload(), &Bytes::from_static(br#"{"Name":"bob"}"#));
///
/// // Anything else passes through untouched
/// let plain = Bytes::from_static(b"hello");
/// assert_eq!(codec.unwrap(plain.clone()).payload(), &plain);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, bon::Builder)]
pub struct EnvelopeCodec {
    /// Accept historical envelope shapes on decode.
    #[builder(default = true)]
    legacy: bool,
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EnvelopeCodec {
    /// A codec that accepts only the canonical shape.
    pub fn strict() -> Self {
        Self { legacy: false }
    }

    /// Returns `true` if historical shapes are accepted.
    pub fn legacy(&self) -> bool {
        self.legacy
    }

    /// Wraps `payload` and `token` into an envelope.
    pub fn wrap(&self, payload: &[u8], token: &B3Map) -> Result<Bytes> {
        let wire = WireEnvelope { context: token, data: STANDARD.encode(payload) };
        Ok(Bytes::from(serde_json::to_vec(&wire)?))
    }

    /// Unwraps `bytes`, treating anything that is not a valid envelope as an
    /// envelope-less payload.
    pub fn unwrap(&self, bytes: Bytes) -> Envelope {
        match self.try_unwrap(&bytes) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => Envelope::absent(bytes),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring malformed envelope");
                Envelope::absent(bytes)
            },
        }
    }

    /// Unwraps `bytes`.
    ///
    /// Returns `Ok(None)` when the bytes are not a JSON object or have no
    /// context field, and `MalformedEnvelope` when the context field is
    /// present but the token or data cannot be decoded.
    pub fn try_unwrap(&self, bytes: &[u8]) -> Result<Option<Envelope>> {
        let Ok(fields) = serde_json::from_slice::<HashMap<String, Box<RawValue>>>(bytes) else {
            return Ok(None);
        };
        let Some(raw_context) = fields.get(CONTEXT_FIELD).filter(|raw| raw.get() != "null") else {
            return Ok(None);
        };

        let context = self.decode_token(raw_context)?;
        let payload = match fields.get(DATA_FIELD) {
            None => Bytes::new(),
            Some(raw) => self.decode_data(raw)?,
        };

        Ok(Some(Envelope { context: Some(context), payload }))
    }

    fn decode_token(&self, raw: &RawValue) -> Result<ContextToken> {
        if let Ok(map) = serde_json::from_str::<B3Map>(raw.get()) {
            return Ok(ContextToken::Map(map));
        }
        if self.legacy {
            if let Ok(single) = serde_json::from_str::<String>(raw.get()) {
                return Ok(ContextToken::Single(single));
            }
        }
        Err(Error::malformed_envelope(format!("unsupported {} value", CONTEXT_FIELD)))
    }

    fn decode_data(&self, raw: &RawValue) -> Result<Bytes> {
        let text = raw.get();
        if text == "null" {
            return Ok(Bytes::new());
        }
        if let Ok(encoded) = serde_json::from_str::<String>(text) {
            return Ok(Bytes::from(STANDARD.decode(encoded)?));
        }
        if self.legacy {
            return Ok(Bytes::copy_from_slice(text.as_bytes()));
        }
        Err(Error::malformed_envelope(format!("{} is not a base64 string", DATA_FIELD)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::trace::{SpanId, TraceId};
    use test_case::test_case;

    fn token() -> B3Map {
        B3Map::encode(&SpanContext::new(TraceId::from_u64(1), SpanId::new(1)).with_sampled(true))
    }

    #[test]
    fn test_wrap_canonical_shape() {
        let wrapped = EnvelopeCodec::default().wrap(b"hello", &token()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&wrapped).unwrap();

        assert_eq!(json["data"], "aGVsbG8=");
        assert_eq!(json[CONTEXT_FIELD]["x-b3-traceid"], "0000000000000001");
        assert_eq!(json[CONTEXT_FIELD]["x-b3-sampled"], "1");
    }

    #[test]
    fn test_roundtrip_envelope_shaped_payload() {
        let codec = EnvelopeCodec::default();
        let inner = codec.wrap(b"inner", &token()).unwrap();
        let outer = codec.wrap(&inner, &token()).unwrap();

        let envelope = codec.unwrap(outer);
        assert_eq!(envelope.context(), Some(&ContextToken::Map(token())));
        assert_eq!(envelope.payload(), &inner);
    }

    #[test_case(b"hello" ; "plain text")]
    #[test_case(br#"{"Name":"bob","Id":1}"# ; "json object")]
    #[test_case(br#"[1,2,3]"# ; "json array")]
    #[test_case(br#"{"data":"aGVsbG8="}"# ; "data without context")]
    #[test_case(br#"{"natsSpanContextB3Map":null,"data":"aGVsbG8="}"# ; "null context")]
    #[test_case(b"" ; "empty")]
    fn test_not_an_envelope(bytes: &[u8]) {
        let codec = EnvelopeCodec::default();
        assert!(codec.try_unwrap(bytes).unwrap().is_none());

        let original = Bytes::copy_from_slice(bytes);
        let envelope = codec.unwrap(original.clone());
        assert!(envelope.context().is_none());
        assert_eq!(envelope.payload(), &original);
    }

    #[test]
    fn test_malformed_envelope_passes_through() {
        let codec = EnvelopeCodec::default();
        let bytes = Bytes::from_static(br#"{"natsSpanContextB3Map":{},"data":"!!not base64!!"}"#);

        let err = codec.try_unwrap(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);

        let envelope = codec.unwrap(bytes.clone());
        assert!(envelope.context().is_none());
        assert_eq!(envelope.payload(), &bytes);
    }

    #[test]
    fn test_non_string_map_values_are_malformed() {
        let codec = EnvelopeCodec::default();
        let err = codec
            .try_unwrap(br#"{"natsSpanContextB3Map":{"x-b3-traceid":1},"data":""}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);
    }

    #[test]
    fn test_null_and_absent_data_are_empty() {
        let codec = EnvelopeCodec::strict();
        let bytes = br#"{"natsSpanContextB3Map":{},"data":null}"#;
        let envelope = codec.try_unwrap(bytes).unwrap().unwrap();
        assert!(envelope.payload().is_empty());

        let envelope = codec.try_unwrap(br#"{"natsSpanContextB3Map":{}}"#).unwrap().unwrap();
        assert!(envelope.payload().is_empty());
        assert_eq!(envelope.context(), Some(&ContextToken::Map(B3Map::new())));
    }

    #[test]
    fn test_legacy_single_header_token() {
        let codec = EnvelopeCodec::default();
        let bytes =
            br#"{"natsSpanContextB3Map":"0000000000000001-0000000000000002-1","data":"aGk="}"#;

        let envelope = codec.try_unwrap(bytes).unwrap().unwrap();
        assert_eq!(envelope.payload(), &Bytes::from_static(b"hi"));

        let ctx = envelope.context().unwrap().decode().unwrap();
        assert_eq!(ctx.trace_id(), TraceId::from_u64(1));
        assert_eq!(ctx.span_id(), SpanId::new(2));
        assert_eq!(ctx.sampled(), Some(true));
    }

    #[test]
    fn test_legacy_raw_json_data() {
        let codec = EnvelopeCodec::default();
        let bytes = br#"{"natsSpanContextB3Map":{},"data":{"Name":"bob","Id":1}}"#;

        let envelope = codec.try_unwrap(bytes).unwrap().unwrap();
        assert_eq!(envelope.payload(), &Bytes::from_static(br#"{"Name":"bob","Id":1}"#));
    }

    #[test]
    fn test_strict_rejects_legacy_shapes() {
        let codec = EnvelopeCodec::strict();
        assert!(!codec.legacy());

        let single = br#"{"natsSpanContextB3Map":"1-2-1","data":""}"#;
        assert_eq!(codec.try_unwrap(single).unwrap_err().kind(), ErrorKind::MalformedEnvelope);

        let raw = br#"{"natsSpanContextB3Map":{},"data":[1,2]}"#;
        assert_eq!(codec.try_unwrap(raw).unwrap_err().kind(), ErrorKind::MalformedEnvelope);
    }

    #[test]
    fn test_builder_default_is_legacy() {
        assert!(EnvelopeCodec::builder().build().legacy());
        assert!(!EnvelopeCodec::builder().legacy(false).build().legacy());
    }

    #[test]
    fn test_empty_token_detection() {
        assert!(ContextToken::Map(B3Map::new()).is_empty());
        assert!(ContextToken::Single(String::new()).is_empty());
        assert!(!ContextToken::Map(token()).is_empty());
    }
}
