//! Support for embedded
//! [CBOR Data Items](https://www.ietf.org/rfc/rfc8949.html#name-encoded-cbor-data-item),
//! also known as a tagged data item with tag number 24.

use ciborium::Value;
use coset::{AsCborValue, CborSerializable, CoseError};

use crate::cbor::{self, CborError, TAG_ENCODED_CBOR};

/// A wrapper for a struct that is to be encoded as a CBOR tagged item, with tag number 24.
///
/// The byte representation of the inner item is kept alongside the decoded value. Re-encoding a
/// decoded `Tag24` reproduces the original bytes, which is what digests and signatures cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag24<T> {
    inner: T,
    pub inner_bytes: Vec<u8>,
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Expected a CBOR byte string, received: '{0:?}'")]
    InvalidTag24(Box<Value>),
    #[error("Expected a CBOR tagged data item with tag number 24, received: '{0:?}'")]
    NotATag24(Value),
    #[error("Unable to encode value as CBOR: {0:?}")]
    UnableToEncode(CoseError),
    #[error("Unable to decode bytes to inner type: {0:?}")]
    UnableToDecode(CoseError),
}

impl<T> Tag24<T> {
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Encoding of the complete tagged item, `#6.24(bstr .cbor T)`.
    pub fn tagged_bytes(&self) -> Result<Vec<u8>, CborError> {
        cbor::to_vec(&Value::Tag(
            TAG_ENCODED_CBOR,
            Box::new(Value::Bytes(self.inner_bytes.clone())),
        ))
    }
}

impl<T: CborSerializable + Clone> Tag24<T> {
    pub fn new(inner: T) -> Result<Tag24<T>> {
        let inner_bytes = inner.clone().to_vec().map_err(Error::UnableToEncode)?;
        Ok(Self { inner, inner_bytes })
    }
}

impl<T: CborSerializable> Tag24<T> {
    pub fn from_bytes(inner_bytes: Vec<u8>) -> coset::Result<Tag24<T>> {
        let inner = T::from_slice(&inner_bytes)?;
        Ok(Self { inner, inner_bytes })
    }
}

impl<T: CborSerializable> TryFrom<Value> for Tag24<T> {
    type Error = Error;

    fn try_from(v: Value) -> Result<Tag24<T>> {
        match v {
            Value::Tag(TAG_ENCODED_CBOR, inner_value) => match *inner_value {
                Value::Bytes(inner_bytes) => {
                    let inner = T::from_slice(&inner_bytes).map_err(Error::UnableToDecode)?;
                    Ok(Tag24 { inner, inner_bytes })
                }
                other => Err(Error::InvalidTag24(Box::new(other))),
            },
            _ => Err(Error::NotATag24(v)),
        }
    }
}

impl<T> From<Tag24<T>> for Value {
    fn from(Tag24 { inner_bytes, .. }: Tag24<T>) -> Value {
        Value::Tag(TAG_ENCODED_CBOR, Box::new(Value::Bytes(inner_bytes)))
    }
}

impl<T> AsRef<T> for Tag24<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

impl<T: CborSerializable> CborSerializable for Tag24<T> {}
impl<T: CborSerializable> AsCborValue for Tag24<T> {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        match value {
            Value::Tag(TAG_ENCODED_CBOR, inner_value) => match *inner_value {
                Value::Bytes(inner_bytes) => Self::from_bytes(inner_bytes),
                _ => Err(CoseError::UnexpectedItem("non-bstr", "bstr .cbor")),
            },
            _ => Err(CoseError::UnexpectedItem("untagged item", "tag 24")),
        }
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(self.into())
    }
}
