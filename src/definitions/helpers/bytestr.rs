use ciborium::Value;
use coset::{AsCborValue, CoseError};

/// A CBOR byte string (major type 2).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ByteStr(Vec<u8>);

impl From<Vec<u8>> for ByteStr {
    fn from(bytes: Vec<u8>) -> ByteStr {
        ByteStr(bytes)
    }
}

impl From<ByteStr> for Vec<u8> {
    fn from(ByteStr(bytes): ByteStr) -> Vec<u8> {
        bytes
    }
}

impl AsRef<[u8]> for ByteStr {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<ByteStr> for Value {
    fn from(ByteStr(bytes): ByteStr) -> Value {
        Value::Bytes(bytes)
    }
}

impl AsCborValue for ByteStr {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        value
            .into_bytes()
            .map(ByteStr)
            .map_err(|_| CoseError::UnexpectedItem("non-bstr", "bstr"))
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(self.into())
    }
}
impl coset::CborSerializable for ByteStr {}
