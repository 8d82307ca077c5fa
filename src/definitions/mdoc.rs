//! The issued mdoc as stored by the holder: `{ version, documents: [{ docType, issuerSigned }], status }`.
use ciborium::Value;
use coset::{AsCborValue, CborSerializable};

use crate::cbor;
use crate::definitions::{device_response::Status, IssuerSigned};

#[derive(Clone, Debug, PartialEq)]
pub struct IssuedMdoc {
    pub version: String,
    pub documents: Vec<IssuedDocument>,
    pub status: Status,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IssuedDocument {
    pub doc_type: String,
    pub issuer_signed: IssuerSigned,
}

impl IssuedMdoc {
    pub const VERSION: &'static str = "1.0";

    pub fn new(documents: Vec<IssuedDocument>) -> Self {
        Self {
            version: Self::VERSION.to_string(),
            documents,
            status: Status::OK,
        }
    }
}

impl CborSerializable for IssuedDocument {}
impl AsCborValue for IssuedDocument {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "Document")?;
        Ok(Self {
            doc_type: cbor::into_text(cbor::require(&mut map, "docType", "docType")?, "docType")?,
            issuer_signed: IssuerSigned::from_cbor_value(cbor::require(
                &mut map,
                "issuerSigned",
                "issuerSigned",
            )?)?,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(vec![
            (cbor::text("docType"), Value::Text(self.doc_type)),
            (cbor::text("issuerSigned"), self.issuer_signed.to_cbor_value()?),
        ]))
    }
}

impl CborSerializable for IssuedMdoc {}
impl AsCborValue for IssuedMdoc {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "mdoc")?;
        let documents = cbor::into_array(cbor::require(&mut map, "documents", "documents")?, "documents")?
            .into_iter()
            .map(IssuedDocument::from_cbor_value)
            .collect::<coset::Result<_>>()?;
        Ok(Self {
            version: cbor::into_text(cbor::require(&mut map, "version", "version")?, "version")?,
            documents,
            status: cbor::into_u64(cbor::require(&mut map, "status", "status")?, "status")?
                .try_into()?,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(vec![
            (cbor::text("version"), Value::Text(self.version)),
            (
                cbor::text("documents"),
                Value::Array(
                    self.documents
                        .into_iter()
                        .map(IssuedDocument::to_cbor_value)
                        .collect::<coset::Result<_>>()?,
                ),
            ),
            (
                cbor::text("status"),
                Value::Integer(u64::from(self.status).into()),
            ),
        ]))
    }
}
