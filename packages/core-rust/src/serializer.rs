//! Serializer contract and the built-in JSON, `MsgPack`, and composite serializers.
//!
//! The trait is object-safe through `erased_serde`, so it can be shared as
//! `Arc<dyn Serializer>` while every codec still sees the caller's concrete
//! type. Typed conversion happens in [`to_payload`](dyn Serializer::to_payload)
//! and [`from_payload`](dyn Serializer::from_payload).

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::de::value::UnitDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::Serialize;

use crate::error::{Direction, SerializationError};
use crate::payload::{essence, Payload};

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_MSGPACK: &str = "application/msgpack";

/// Callback handed a codec-specific deserializer positioned at the payload body.
pub type DecodeVisitor<'a> = &'a mut dyn for<'de> FnMut(
    &mut dyn erased_serde::Deserializer<'de>,
) -> Result<(), erased_serde::Error>;

// ---------------------------------------------------------------------------
// Serializer trait
// ---------------------------------------------------------------------------

/// Converts values to and from payloads for one or more content types.
pub trait Serializer: Send + Sync + fmt::Debug {
    /// Content type this serializer tags outbound payloads with.
    fn content_type(&self) -> &str;

    /// Encodes a value into a payload.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::Encode` if the value cannot be represented.
    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Payload, SerializationError>;

    /// Runs `visitor` against a deserializer over the payload body.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::Decode` for malformed bodies or a failing
    /// visitor, and `SerializationError::UnsupportedContentType` when the
    /// payload is tagged with a content type this serializer does not handle.
    fn deserialize(&self, payload: &Payload, visitor: DecodeVisitor<'_>) -> Result<(), SerializationError>;

    /// Whether this serializer can decode payloads tagged with `content_type`.
    fn accepts(&self, content_type: &str) -> bool {
        essence(content_type) == essence(self.content_type())
    }
}

impl dyn Serializer + '_ {
    /// Encodes a typed value.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::Encode` if `T`'s `Serialize` impl fails or
    /// the codec cannot represent the value.
    pub fn to_payload<T: Serialize>(&self, value: &T) -> Result<Payload, SerializationError> {
        self.serialize(value)
    }

    /// Decodes a payload into `T`. The codec drives `T`'s `Deserialize` impl
    /// directly; no numeric or string coercion is applied.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::Decode` on malformed input or type mismatch.
    pub fn from_payload<T: DeserializeOwned>(&self, payload: &Payload) -> Result<T, SerializationError> {
        let mut decoded = None;
        self.deserialize(
            payload,
            &mut |de: &mut dyn erased_serde::Deserializer<'_>| -> Result<(), erased_serde::Error> {
                decoded = Some(erased_serde::deserialize::<T>(de)?);
                Ok(())
            },
        )?;
        let content_type = payload.content_type().unwrap_or(self.content_type());
        decoded.ok_or_else(|| SerializationError::decode(content_type, "serializer produced no value"))
    }
}

/// Rejects payloads tagged with a content type the serializer does not handle.
fn check_content_type(serializer: &dyn Serializer, payload: &Payload) -> Result<(), SerializationError> {
    match payload.content_type() {
        Some(ct) if !serializer.accepts(ct) => Err(SerializationError::UnsupportedContentType {
            content_type: ct.to_string(),
            direction: Direction::Decode,
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// JsonSerializer
// ---------------------------------------------------------------------------

/// UTF-8 JSON serializer tagging payloads with `application/json`.
///
/// JSON has no NaN or infinity; `serde_json` writes non-finite floats as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn content_type(&self) -> &str {
        APPLICATION_JSON
    }

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Payload, SerializationError> {
        let body = serde_json::to_vec(value).map_err(|e| SerializationError::encode(APPLICATION_JSON, e))?;
        Ok(Payload::new(APPLICATION_JSON, body))
    }

    fn deserialize(&self, payload: &Payload, visitor: DecodeVisitor<'_>) -> Result<(), SerializationError> {
        check_content_type(self, payload)?;
        let mut de = serde_json::Deserializer::from_slice(payload.body());
        visitor(&mut <dyn erased_serde::Deserializer>::erase(&mut de))
            .map_err(|e| SerializationError::decode(APPLICATION_JSON, e))?;
        // Trailing input after the value is malformed.
        de.end().map_err(|e| SerializationError::decode(APPLICATION_JSON, e))
    }
}

// ---------------------------------------------------------------------------
// MsgPackSerializer
// ---------------------------------------------------------------------------

/// `MsgPack` serializer using named-field encoding (`rmp_serde::to_vec_named`).
///
/// Values go straight through `rmp_serde`, so binary blobs, non-string map
/// keys, and non-finite floats survive a round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

impl Serializer for MsgPackSerializer {
    fn content_type(&self) -> &str {
        APPLICATION_MSGPACK
    }

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Payload, SerializationError> {
        let body =
            rmp_serde::to_vec_named(value).map_err(|e| SerializationError::encode(APPLICATION_MSGPACK, e))?;
        Ok(Payload::new(APPLICATION_MSGPACK, body))
    }

    fn deserialize(&self, payload: &Payload, visitor: DecodeVisitor<'_>) -> Result<(), SerializationError> {
        check_content_type(self, payload)?;
        let mut de = rmp_serde::Deserializer::new(payload.body().as_ref());
        visitor(&mut <dyn erased_serde::Deserializer>::erase(&mut de))
            .map_err(|e| SerializationError::decode(APPLICATION_MSGPACK, e))
    }
}

// ---------------------------------------------------------------------------
// CompositeSerializer
// ---------------------------------------------------------------------------

/// Selects a serializer by the payload's content type.
///
/// Outbound values are always encoded by the first (primary) serializer.
/// Inbound payloads are routed by content type:
/// - untyped and empty -> unit (`()`, `None`)
/// - untyped with a body -> primary serializer
/// - typed -> first serializer that accepts the type, else
///   `UnsupportedContentType`
#[derive(Debug, Clone)]
pub struct CompositeSerializer {
    primary: Arc<dyn Serializer>,
    rest: Vec<Arc<dyn Serializer>>,
}

impl CompositeSerializer {
    /// Creates a composite whose primary serializer is `primary`.
    #[must_use]
    pub fn new(primary: Arc<dyn Serializer>) -> Self {
        Self {
            primary,
            rest: Vec::new(),
        }
    }

    /// Adds a serializer consulted for decoding after those already present.
    #[must_use]
    pub fn with(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.rest.push(serializer);
        self
    }

    fn all(&self) -> impl Iterator<Item = &Arc<dyn Serializer>> {
        std::iter::once(&self.primary).chain(self.rest.iter())
    }

    fn select(&self, content_type: &str) -> Option<&Arc<dyn Serializer>> {
        self.all().find(|s| s.accepts(content_type))
    }
}

impl Serializer for CompositeSerializer {
    fn content_type(&self) -> &str {
        self.primary.content_type()
    }

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Payload, SerializationError> {
        self.primary.serialize(value)
    }

    fn deserialize(&self, payload: &Payload, visitor: DecodeVisitor<'_>) -> Result<(), SerializationError> {
        match payload.content_type() {
            None if payload.is_empty() => {
                let unit: UnitDeserializer<erased_serde::Error> = ().into_deserializer();
                visitor(&mut <dyn erased_serde::Deserializer>::erase(unit))
                    .map_err(|e| SerializationError::decode(self.content_type(), e))
            }
            None => self.primary.deserialize(payload, visitor),
            Some(ct) => match self.select(ct) {
                Some(serializer) => serializer.deserialize(payload, visitor),
                None => {
                    tracing::debug!(content_type = ct, "no serializer accepts content type");
                    Err(SerializationError::UnsupportedContentType {
                        content_type: ct.to_string(),
                        direction: Direction::Decode,
                    })
                }
            },
        }
    }

    fn accepts(&self, content_type: &str) -> bool {
        self.select(content_type).is_some()
    }
}

/// Shared default serializer: JSON primary, `MsgPack` accepted on decode.
#[must_use]
pub fn default_serializer() -> Arc<dyn Serializer> {
    static DEFAULT: OnceLock<Arc<dyn Serializer>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| {
            Arc::new(CompositeSerializer::new(Arc::new(JsonSerializer)).with(Arc::new(MsgPackSerializer)))
        })
        .clone()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use bytes::Bytes;
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::Value;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Counted {
        character_count: i64,
    }

    #[test]
    fn json_tags_payload_and_is_deterministic() {
        let serializer: &dyn Serializer = &JsonSerializer;
        let value = BTreeMap::from([("b", 2), ("a", 1)]);

        let first = serializer.to_payload(&value).unwrap();
        let second = serializer.to_payload(&value).unwrap();

        assert_eq!(first.content_type(), Some(APPLICATION_JSON));
        assert_eq!(first.body(), second.body());
        assert_eq!(&first.body()[..], br#"{"a":1,"b":2}"#);
    }

    #[test]
    fn json_decodes_typed_struct() {
        let serializer: &dyn Serializer = &JsonSerializer;
        let payload = Payload::new(APPLICATION_JSON, &br#"{ "characterCount": 17 }"#[..]);
        let out: Counted = serializer.from_payload(&payload).unwrap();
        assert_eq!(out, Counted { character_count: 17 });
    }

    #[test]
    fn json_rejects_type_mismatch_without_coercion() {
        let serializer: &dyn Serializer = &JsonSerializer;
        let payload = Payload::new(APPLICATION_JSON, &br#""17""#[..]);
        let err = serializer.from_payload::<i64>(&payload).unwrap_err();
        assert!(matches!(err, SerializationError::Decode { .. }));
    }

    #[test]
    fn json_rejects_trailing_input() {
        let serializer: &dyn Serializer = &JsonSerializer;
        let payload = Payload::new(APPLICATION_JSON, &b"1 2"[..]);
        let err = serializer.from_payload::<i64>(&payload).unwrap_err();
        assert!(matches!(err, SerializationError::Decode { .. }));
    }

    #[test]
    fn json_rejects_foreign_content_type() {
        let serializer: &dyn Serializer = &JsonSerializer;
        let payload = Payload::new("text/plain", &b"hello"[..]);
        let err = serializer.from_payload::<Value>(&payload).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::UnsupportedContentType { direction: Direction::Decode, .. }
        ));
    }

    #[test]
    fn json_accepts_content_type_parameters() {
        let serializer: &dyn Serializer = &JsonSerializer;
        let payload = Payload::new("application/json; charset=utf-8", &b"42"[..]);
        assert_eq!(serializer.from_payload::<u8>(&payload).unwrap(), 42);
    }

    #[test]
    fn msgpack_encodes_and_decodes_struct() {
        let serializer: &dyn Serializer = &MsgPackSerializer;
        let payload = serializer.to_payload(&Counted { character_count: 11 }).unwrap();
        assert_eq!(payload.content_type(), Some(APPLICATION_MSGPACK));

        let decoded: Counted = serializer.from_payload(&payload).unwrap();
        assert_eq!(decoded.character_count, 11);
    }

    #[test]
    fn msgpack_decodes_integer_keyed_map() {
        let serializer: &dyn Serializer = &MsgPackSerializer;
        let map = HashMap::from([(1_u32, "one".to_string()), (2, "two".to_string())]);
        let body = rmp_serde::to_vec_named(&map).unwrap();

        let decoded: HashMap<u32, String> = serializer
            .from_payload(&Payload::new(APPLICATION_MSGPACK, body))
            .unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn msgpack_keeps_nan() {
        let serializer: &dyn Serializer = &MsgPackSerializer;
        let payload = serializer.to_payload(&f64::NAN).unwrap();
        // 0xcb: float 64 marker, not nil.
        assert_eq!(payload.body()[0], 0xcb);

        let decoded: f64 = serializer.from_payload(&payload).unwrap();
        assert!(decoded.is_nan());
    }

    #[test]
    fn msgpack_keeps_binary() {
        let serializer: &dyn Serializer = &MsgPackSerializer;
        let blob = Bytes::from_static(&[0x00, 0xff, 0x10]);
        let payload = serializer.to_payload(&blob).unwrap();
        // 0xc4: bin 8 marker.
        assert_eq!(payload.body()[0], 0xc4);

        let decoded: Bytes = serializer.from_payload(&payload).unwrap();
        assert_eq!(decoded, blob);
    }

    #[test]
    fn composite_routes_by_content_type() {
        let serializer = default_serializer();
        let msgpack: &dyn Serializer = &MsgPackSerializer;
        let packed = msgpack.to_payload(&"some string").unwrap();
        let json = Payload::new(APPLICATION_JSON, &br#""some string""#[..]);

        let a: String = serializer.from_payload(&packed).unwrap();
        let b: String = serializer.from_payload(&json).unwrap();
        assert_eq!(a, b);
        assert_eq!(serializer.content_type(), APPLICATION_JSON);
    }

    #[test]
    fn composite_decodes_empty_untyped_payload_as_unit() {
        let serializer = default_serializer();
        serializer.from_payload::<()>(&Payload::default()).unwrap();
        let none: Option<String> = serializer.from_payload(&Payload::default()).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn composite_decodes_untyped_body_with_primary() {
        let serializer = default_serializer();
        let n: u32 = serializer.from_payload(&Payload::untyped(&b"7"[..])).unwrap();
        assert_eq!(n, 7);
    }

    #[test]
    fn composite_rejects_unknown_content_type() {
        let serializer = default_serializer();
        let err = serializer
            .from_payload::<String>(&Payload::new("application/xml", &b"<a/>"[..]))
            .unwrap_err();
        assert!(matches!(
            err,
            SerializationError::UnsupportedContentType { ref content_type, .. } if content_type == "application/xml"
        ));
    }

    proptest! {
        #[test]
        fn malformed_json_never_decodes(body in "[^\"]{1,16}[{\\[]") {
            // Every generated body ends with an unterminated opener, so it is never valid JSON.
            let serializer: &dyn Serializer = &JsonSerializer;
            let payload = Payload::new(APPLICATION_JSON, body.into_bytes());
            let result = serializer.from_payload::<Value>(&payload);
            prop_assert!(
                matches!(result, Err(SerializationError::Decode { .. })),
                "expected decode error, got {:?}",
                result
            );
        }

        #[test]
        fn decoding_twice_yields_equal_values(s in ".*", n in any::<i64>()) {
            let serializer = default_serializer();
            let payload = serializer.to_payload(&(s.clone(), n)).unwrap();
            let first: (String, i64) = serializer.from_payload(&payload).unwrap();
            let second: (String, i64) = serializer.from_payload(&payload).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first, (s, n));
        }
    }
}
