use ciborium::Value;
use coset::{AsCborValue, CborSerializable, CoseError};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::cbor;
use crate::definitions::{DeviceSigned, IssuerSigned};

/// Represents a device response.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceResponse {
    /// The version of the response.
    pub version: String,

    /// The documents associated with the response.
    pub documents: Vec<Document>,

    /// The status of the response.
    pub status: Status,
}

/// Represents a document.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub doc_type: String,
    pub issuer_signed: IssuerSigned,
    pub device_signed: DeviceSigned,
    /// Per-element errors, keyed by namespace then element identifier.
    pub errors: Option<Errors>,
}

pub type Errors = Vec<(String, Vec<(String, DocumentErrorCode)>)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentErrorCode {
    DataNotReturned,
    ApplicationSpecific(i64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum Status {
    OK,
    GeneralError,
    CborDecodingError,
    CborValidationError,
}

impl DeviceResponse {
    pub const VERSION: &'static str = "1.0";
}

impl From<Status> for u64 {
    fn from(s: Status) -> u64 {
        match s {
            Status::OK => 0,
            Status::GeneralError => 10,
            Status::CborDecodingError => 11,
            Status::CborValidationError => 12,
        }
    }
}

impl TryFrom<u64> for Status {
    type Error = CoseError;

    fn try_from(n: u64) -> coset::Result<Status> {
        match n {
            0 => Ok(Status::OK),
            10 => Ok(Status::GeneralError),
            11 => Ok(Status::CborDecodingError),
            12 => Ok(Status::CborValidationError),
            _ => Err(CoseError::UnexpectedItem("integer", "status 0, 10, 11 or 12")),
        }
    }
}

impl From<DocumentErrorCode> for i64 {
    fn from(c: DocumentErrorCode) -> i64 {
        match c {
            DocumentErrorCode::DataNotReturned => 0,
            DocumentErrorCode::ApplicationSpecific(i) => i,
        }
    }
}

impl From<i64> for DocumentErrorCode {
    fn from(i: i64) -> DocumentErrorCode {
        match i {
            0 => DocumentErrorCode::DataNotReturned,
            i => DocumentErrorCode::ApplicationSpecific(i),
        }
    }
}

fn errors_to_cbor_value(errors: Errors) -> Value {
    Value::Map(
        errors
            .into_iter()
            .map(|(ns, elements)| {
                (
                    Value::Text(ns),
                    Value::Map(
                        elements
                            .into_iter()
                            .map(|(e, code)| (Value::Text(e), Value::Integer(i64::from(code).into())))
                            .collect(),
                    ),
                )
            })
            .collect(),
    )
}

fn cbor_value_to_errors(value: Value) -> coset::Result<Errors> {
    cbor::into_map(value, "Errors")?
        .into_iter()
        .map(|(ns, elements)| {
            let elements = cbor::into_map(elements, "ErrorItems")?
                .into_iter()
                .map(|(e, code)| {
                    let code = code
                        .into_integer()
                        .ok()
                        .and_then(|i| i64::try_from(i).ok())
                        .ok_or(CoseError::UnexpectedItem("value", "ErrorCode"))?;
                    Ok((cbor::into_text(e, "DataElementIdentifier")?, code.into()))
                })
                .collect::<coset::Result<Vec<_>>>()?;
            Ok((cbor::into_text(ns, "NameSpace")?, elements))
        })
        .collect()
}

impl CborSerializable for Document {}
impl AsCborValue for Document {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "Document")?;
        Ok(Document {
            doc_type: cbor::into_text(cbor::require(&mut map, "docType", "docType")?, "docType")?,
            issuer_signed: IssuerSigned::from_cbor_value(cbor::require(
                &mut map,
                "issuerSigned",
                "issuerSigned",
            )?)?,
            device_signed: DeviceSigned::from_cbor_value(cbor::require(
                &mut map,
                "deviceSigned",
                "deviceSigned",
            )?)?,
            errors: cbor::take(&mut map, "errors")
                .map(cbor_value_to_errors)
                .transpose()?,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        let mut map = vec![
            (cbor::text("docType"), Value::Text(self.doc_type)),
            (cbor::text("issuerSigned"), self.issuer_signed.to_cbor_value()?),
            (cbor::text("deviceSigned"), self.device_signed.to_cbor_value()?),
        ];
        if let Some(errors) = self.errors {
            map.push((cbor::text("errors"), errors_to_cbor_value(errors)));
        }
        Ok(Value::Map(map))
    }
}

impl CborSerializable for DeviceResponse {}
impl AsCborValue for DeviceResponse {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "DeviceResponse")?;
        let documents = match cbor::take(&mut map, "documents") {
            Some(documents) => cbor::into_array(documents, "documents")?
                .into_iter()
                .map(Document::from_cbor_value)
                .collect::<coset::Result<_>>()?,
            None => Vec::new(),
        };
        Ok(Self {
            version: cbor::into_text(cbor::require(&mut map, "version", "version")?, "version")?,
            documents,
            status: cbor::into_u64(cbor::require(&mut map, "status", "status")?, "status")?
                .try_into()?,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        let mut map = vec![(cbor::text("version"), Value::Text(self.version))];
        if !self.documents.is_empty() {
            map.push((
                cbor::text("documents"),
                Value::Array(
                    self.documents
                        .into_iter()
                        .map(Document::to_cbor_value)
                        .collect::<coset::Result<_>>()?,
                ),
            ));
        }
        map.push((
            cbor::text("status"),
            Value::Integer(u64::from(self.status).into()),
        ));
        Ok(Value::Map(map))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn errors_roundtrip() {
        let errors: Errors = vec![(
            "org.iso.18013.5.1".into(),
            vec![
                ("portrait".into(), DocumentErrorCode::DataNotReturned),
                ("nationality".into(), DocumentErrorCode::ApplicationSpecific(-2)),
            ],
        )];
        let value = errors_to_cbor_value(errors.clone());
        assert_eq!(cbor_value_to_errors(value).unwrap(), errors);
    }

    #[test]
    fn status_codes() {
        assert_eq!(u64::from(Status::OK), 0);
        assert_eq!(Status::try_from(11).unwrap(), Status::CborDecodingError);
        assert!(Status::try_from(1).is_err());
    }

    #[test]
    fn empty_response() {
        let response = DeviceResponse {
            version: DeviceResponse::VERSION.into(),
            documents: vec![],
            status: Status::GeneralError,
        };
        let bytes = response.clone().to_vec().unwrap();
        assert_eq!(DeviceResponse::from_slice(&bytes).unwrap(), response);
    }
}
