//! CBOR encoding helpers and the tag conventions used by ISO/IEC 18013-5.
//!
//! Maps are kept as ordered `(key, value)` lists so that encoding follows insertion order.
//! Digests and signatures are computed over these exact bytes.
use std::io::Cursor;

use ciborium::Value;
use coset::CoseError;
use serde::{de, Serialize};
use thiserror::Error;

/// Date/time text string (RFC 3339), used for `tdate` values.
pub const TAG_TDATE: u64 = 0;
/// Embedded CBOR data item carried as a byte string.
pub const TAG_ENCODED_CBOR: u64 = 24;
/// RFC 8943 `full-date` text string.
pub const TAG_FULL_DATE: u64 = 1004;

#[derive(Debug, Error)]
pub enum CborError {
    /// CBOR decoding failure.
    #[error("CBOR decoding failure: {0}")]
    DecodeFailed(String),
    /// CBOR encoding failure.
    #[error("CBOR encoding failure: {0}")]
    EncodeFailed(String),
    /// Structural failure reported by the COSE layer.
    #[error("CBOR structure error: {0}")]
    Cose(CoseError),
}

impl From<CoseError> for CborError {
    fn from(e: CoseError) -> Self {
        CborError::Cose(e)
    }
}

pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, CborError>
where
    T: Serialize,
{
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CborError::EncodeFailed(e.to_string()))?;
    Ok(buf)
}

pub fn from_slice<T>(slice: &[u8]) -> Result<T, CborError>
where
    T: de::DeserializeOwned,
{
    ciborium::from_reader(Cursor::new(slice)).map_err(|e| CborError::DecodeFailed(e.to_string()))
}

/// Convert a JSON value into CBOR, keeping object key order.
///
/// Integers stay integers; numbers that only fit a float become CBOR floats.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::Integer(u.into())
            } else if let Some(i) = n.as_i64() {
                Value::Integer(i.into())
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (Value::Text(k.clone()), from_json(v)))
                .collect(),
        ),
    }
}

/// A plain JSON rendering of a CBOR value.
///
/// Byte strings become base64url (unpadded) strings, date tags collapse to their text and
/// non-text map keys are rendered through their JSON form.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => {
            let i = i128::from(*i);
            if let Ok(u) = u64::try_from(i) {
                u.into()
            } else if let Ok(s) = i64::try_from(i) {
                s.into()
            } else {
                serde_json::Value::String(i.to_string())
            }
        }
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Bytes(b) => {
            serde_json::Value::String(base64::encode_config(b, base64::URL_SAFE_NO_PAD))
        }
        Value::Text(t) => serde_json::Value::String(t.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::Text(t) => t.clone(),
                        other => to_json(other).to_string(),
                    };
                    (key, to_json(v))
                })
                .collect(),
        ),
        Value::Tag(_, inner) => to_json(inner),
        _ => serde_json::Value::Null,
    }
}

/// Strip date tags (0 and 1004) so that values read back as the text they were built from.
pub fn untag_dates(value: Value) -> Value {
    match value {
        Value::Tag(TAG_TDATE | TAG_FULL_DATE, inner) => untag_dates(*inner),
        Value::Array(items) => Value::Array(items.into_iter().map(untag_dates).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, untag_dates(v)))
                .collect(),
        ),
        other => other,
    }
}

pub(crate) fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub(crate) fn into_map(value: Value, want: &'static str) -> coset::Result<Vec<(Value, Value)>> {
    value
        .into_map()
        .map_err(|_| CoseError::UnexpectedItem("non-map", want))
}

pub(crate) fn into_array(value: Value, want: &'static str) -> coset::Result<Vec<Value>> {
    value
        .into_array()
        .map_err(|_| CoseError::UnexpectedItem("non-array", want))
}

pub(crate) fn into_text(value: Value, want: &'static str) -> coset::Result<String> {
    value
        .into_text()
        .map_err(|_| CoseError::UnexpectedItem("non-text", want))
}

pub(crate) fn into_u64(value: Value, want: &'static str) -> coset::Result<u64> {
    let integer = value
        .into_integer()
        .map_err(|_| CoseError::UnexpectedItem("non-integer", want))?;
    u64::try_from(integer).map_err(|_| CoseError::OutOfRangeIntegerValue)
}

/// Remove the entry with the given text key from a decoded map.
pub(crate) fn take(map: &mut Vec<(Value, Value)>, key: &str) -> Option<Value> {
    let position = map
        .iter()
        .position(|(k, _)| matches!(k, Value::Text(t) if t == key))?;
    Some(map.remove(position).1)
}

pub(crate) fn require(
    map: &mut Vec<(Value, Value)>,
    key: &str,
    want: &'static str,
) -> coset::Result<Value> {
    take(map, key).ok_or(CoseError::UnexpectedItem("missing field", want))
}

/// Look up a text key in a map without consuming it.
pub(crate) fn lookup<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(t) if t == key))
        .map(|(_, v)| v)
}
