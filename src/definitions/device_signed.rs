//! This module contains the definitions related to device signing.
//!
//! [DeviceSigned] carries the device-asserted namespaces and the [DeviceAuth] proving possession
//! of the device key bound in the MSO. The signature covers the
//! [DeviceAuthentication] structure, which embeds the session transcript of the transaction.
use ciborium::Value;
use coset::{AsCborValue, CborSerializable, CoseMac0, CoseSign1, CoseError};

use crate::cbor::{self, CborError};
use crate::cose::{sign1, CoseVerifier};
use crate::definitions::{helpers::Tag24, session::SessionTranscript};

/// Represents a device-signed structure.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSigned {
    pub namespaces: DeviceNamespacesBytes,
    pub device_auth: DeviceAuth,
}

pub type DeviceNamespacesBytes = Tag24<DeviceNamespaces>;

/// Device-asserted elements per namespace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceNamespaces(Vec<(String, Vec<(String, Value)>)>);

impl DeviceNamespaces {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceAuth {
    Signature(CoseSign1),
    Mac(CoseMac0),
}

/// `DeviceAuthentication = ["DeviceAuthentication", SessionTranscript, DocType, DeviceNameSpacesBytes]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceAuthentication {
    pub session_transcript: SessionTranscript,
    pub doc_type: String,
    pub namespaces_bytes: DeviceNamespacesBytes,
}

pub type DeviceAuthenticationBytes = Tag24<DeviceAuthentication>;

const DEVICE_AUTHENTICATION: &str = "DeviceAuthentication";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unable to encode value as CBOR: {0}")]
    UnableToEncode(CborError),
    #[error("device authentication is a MAC, which is not supported")]
    MacUnsupported,
    #[error("device signature is invalid: {0}")]
    InvalidSignature(#[from] sign1::Error),
}

impl DeviceAuthentication {
    pub fn new(
        session_transcript: SessionTranscript,
        doc_type: String,
        namespaces_bytes: DeviceNamespacesBytes,
    ) -> Self {
        Self {
            session_transcript,
            doc_type,
            namespaces_bytes,
        }
    }

    /// `DeviceAuthenticationBytes`, the detached payload of the device signature.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CborError> {
        Tag24::new(self.clone())
            .map_err(|e| CborError::EncodeFailed(e.to_string()))?
            .tagged_bytes()
    }
}

impl DeviceSigned {
    /// Check the device signature against the transaction it claims to belong to.
    pub fn verify<V: CoseVerifier + ?Sized>(
        &self,
        session_transcript: &SessionTranscript,
        doc_type: &str,
        verifier: &V,
    ) -> Result<(), Error> {
        let DeviceAuth::Signature(cose_sign1) = &self.device_auth else {
            return Err(Error::MacUnsupported);
        };
        let payload = DeviceAuthentication::new(
            session_transcript.clone(),
            doc_type.to_string(),
            self.namespaces.clone(),
        )
        .to_bytes()
        .map_err(Error::UnableToEncode)?;
        sign1::verify(cose_sign1, Some(&payload), verifier)?;
        Ok(())
    }
}

impl CborSerializable for DeviceNamespaces {}
impl AsCborValue for DeviceNamespaces {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        cbor::into_map(value, "DeviceNameSpaces")?
            .into_iter()
            .map(|(ns, items)| {
                let items = cbor::into_map(items, "DeviceSignedItems")?
                    .into_iter()
                    .map(|(k, v)| Ok((cbor::into_text(k, "DataElementIdentifier")?, v)))
                    .collect::<coset::Result<Vec<_>>>()?;
                Ok((cbor::into_text(ns, "NameSpace")?, items))
            })
            .collect::<coset::Result<_>>()
            .map(DeviceNamespaces)
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(
            self.0
                .into_iter()
                .map(|(ns, items)| {
                    (
                        Value::Text(ns),
                        Value::Map(
                            items
                                .into_iter()
                                .map(|(k, v)| (Value::Text(k), v))
                                .collect(),
                        ),
                    )
                })
                .collect(),
        ))
    }
}

impl AsCborValue for DeviceAuth {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "DeviceAuth")?;
        if let Some(signature) = cbor::take(&mut map, "deviceSignature") {
            return Ok(DeviceAuth::Signature(CoseSign1::from_cbor_value(signature)?));
        }
        if let Some(mac) = cbor::take(&mut map, "deviceMac") {
            return Ok(DeviceAuth::Mac(CoseMac0::from_cbor_value(mac)?));
        }
        Err(CoseError::UnexpectedItem(
            "map",
            "deviceSignature or deviceMac",
        ))
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        let entry = match self {
            DeviceAuth::Signature(s) => (cbor::text("deviceSignature"), s.to_cbor_value()?),
            DeviceAuth::Mac(m) => (cbor::text("deviceMac"), m.to_cbor_value()?),
        };
        Ok(Value::Map(vec![entry]))
    }
}

impl CborSerializable for DeviceSigned {}
impl AsCborValue for DeviceSigned {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "DeviceSigned")?;
        Ok(Self {
            namespaces: DeviceNamespacesBytes::from_cbor_value(cbor::require(
                &mut map,
                "nameSpaces",
                "nameSpaces",
            )?)?,
            device_auth: DeviceAuth::from_cbor_value(cbor::require(
                &mut map,
                "deviceAuth",
                "deviceAuth",
            )?)?,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(vec![
            (cbor::text("nameSpaces"), self.namespaces.into()),
            (cbor::text("deviceAuth"), self.device_auth.to_cbor_value()?),
        ]))
    }
}

impl CborSerializable for DeviceAuthentication {}
impl AsCborValue for DeviceAuthentication {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let items = cbor::into_array(value, "DeviceAuthentication")?;
        let [context, transcript, doc_type, namespaces] = <[Value; 4]>::try_from(items)
            .map_err(|_| CoseError::UnexpectedItem("array", "4 element DeviceAuthentication"))?;
        if cbor::into_text(context, "context")? != DEVICE_AUTHENTICATION {
            return Err(CoseError::UnexpectedItem(
                "text",
                "\"DeviceAuthentication\" context",
            ));
        }
        Ok(Self {
            session_transcript: SessionTranscript::from_cbor_value(transcript)?,
            doc_type: cbor::into_text(doc_type, "DocType")?,
            namespaces_bytes: DeviceNamespacesBytes::from_cbor_value(namespaces)?,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Array(vec![
            cbor::text(DEVICE_AUTHENTICATION),
            self.session_transcript.to_cbor_value()?,
            Value::Text(self.doc_type),
            self.namespaces_bytes.into(),
        ]))
    }
}
