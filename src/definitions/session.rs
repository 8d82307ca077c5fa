//! Session transcript and handover data binding a presentation to one transaction.
use ciborium::Value;
use coset::{AsCborValue, CborSerializable, CoseError};

use crate::cbor::{self, CborError};
use crate::definitions::helpers::Tag24;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("handover must have 3 or 4 elements, received {0}")]
    InvalidLength(usize),
}

/// Out-of-band channel binding data, a three or four element array.
#[derive(Clone, Debug, PartialEq)]
pub struct Handover(Vec<Value>);

impl Handover {
    pub fn new(items: Vec<Value>) -> Result<Self, Error> {
        if !(3..=4).contains(&items.len()) {
            return Err(Error::InvalidLength(items.len()));
        }
        Ok(Self(items))
    }

    /// OpenID4VP handover: `[mdocGeneratedNonce, clientId, responseUri, verifierNonce]`.
    pub fn oid4vp(
        mdoc_generated_nonce: &str,
        client_id: &str,
        response_uri: &str,
        nonce: &str,
    ) -> Self {
        Self(
            [mdoc_generated_nonce, client_id, response_uri, nonce]
                .into_iter()
                .map(cbor::text)
                .collect(),
        )
    }

    pub fn items(&self) -> &[Value] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for Handover {
    type Error = Error;

    fn try_from(items: Vec<String>) -> Result<Self, Error> {
        Self::new(items.into_iter().map(Value::Text).collect())
    }
}

/// `SessionTranscript = [DeviceEngagementBytes, EReaderKeyBytes, Handover]`.
///
/// Engagement happens out of band, so both the device engagement and the reader key are null.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionTranscript {
    pub handover: Handover,
}

impl SessionTranscript {
    pub fn new(handover: Handover) -> Self {
        Self { handover }
    }

    /// `SessionTranscriptBytes`, the tag-24 wrapped transcript as a verifier computes it.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CborError> {
        Tag24::new(self.clone())
            .map_err(|e| CborError::EncodeFailed(e.to_string()))?
            .tagged_bytes()
    }
}

impl CborSerializable for SessionTranscript {}
impl AsCborValue for SessionTranscript {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let items = cbor::into_array(value, "SessionTranscript")?;
        match <[Value; 3]>::try_from(items) {
            Ok([Value::Null, Value::Null, handover]) => {
                let handover = cbor::into_array(handover, "Handover")?;
                Handover::new(handover)
                    .map(Self::new)
                    .map_err(|_| CoseError::UnexpectedItem("array", "3 or 4 element Handover"))
            }
            _ => Err(CoseError::UnexpectedItem(
                "array",
                "[null, null, Handover] SessionTranscript",
            )),
        }
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Array(vec![
            Value::Null,
            Value::Null,
            Value::Array(self.handover.0),
        ]))
    }
}
