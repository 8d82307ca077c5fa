use ciborium::Value;
use coset::{AsCborValue, CborSerializable, CoseError};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::cbor;
use crate::definitions::{helpers::ByteStr, DeviceKeyInfo, ValidityInfo};

pub type DigestId = u64;

/// Mobile Security Object, the issuer-signed digest commitments of an mdoc.
#[derive(Clone, Debug, PartialEq)]
pub struct Mso {
    pub version: String,
    pub digest_algorithm: DigestAlgorithm,
    pub value_digests: ValueDigests,
    pub device_key_info: DeviceKeyInfo,
    pub doc_type: String,
    pub validity_info: ValidityInfo,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum DigestAlgorithm {
    #[strum(serialize = "SHA-256")]
    SHA256,
    #[strum(serialize = "SHA-384")]
    SHA384,
    #[strum(serialize = "SHA-512")]
    SHA512,
}

impl Mso {
    pub const VERSION: &'static str = "1.0";
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        DigestAlgorithm::SHA256
    }
}

/// Digests of one namespace, in digest ID order of assignment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DigestIds(Vec<(DigestId, ByteStr)>);

impl DigestIds {
    pub fn get(&self, id: DigestId) -> Option<&ByteStr> {
        self.0.iter().find(|(i, _)| *i == id).map(|(_, d)| d)
    }

    pub fn insert(&mut self, id: DigestId, digest: ByteStr) {
        self.0.push((id, digest));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(DigestId, ByteStr)> {
        self.0.iter()
    }
}

/// `valueDigests`, keyed by namespace in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueDigests(Vec<(String, DigestIds)>);

impl ValueDigests {
    pub fn get(&self, namespace: &str) -> Option<&DigestIds> {
        self.0.iter().find(|(ns, _)| ns == namespace).map(|(_, d)| d)
    }

    /// Set the digests of a namespace, replacing any earlier entry at its original position.
    pub fn insert(&mut self, namespace: String, digests: DigestIds) {
        match self.0.iter_mut().find(|(ns, _)| *ns == namespace) {
            Some(entry) => entry.1 = digests,
            None => self.0.push((namespace, digests)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, DigestIds)> {
        self.0.iter()
    }
}

impl AsCborValue for DigestAlgorithm {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        cbor::into_text(value, "digestAlgorithm")?
            .parse()
            .map_err(|_| CoseError::UnexpectedItem("unknown algorithm", "SHA-256/384/512"))
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(cbor::text(self.as_ref()))
    }
}

impl AsCborValue for DigestIds {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        cbor::into_map(value, "DigestIDs")?
            .into_iter()
            .map(|(k, v)| Ok((cbor::into_u64(k, "DigestID")?, ByteStr::from_cbor_value(v)?)))
            .collect::<coset::Result<_>>()
            .map(DigestIds)
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(
            self.0
                .into_iter()
                .map(|(id, digest)| (Value::Integer(id.into()), digest.into()))
                .collect(),
        ))
    }
}

impl AsCborValue for ValueDigests {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        cbor::into_map(value, "ValueDigests")?
            .into_iter()
            .map(|(k, v)| Ok((cbor::into_text(k, "NameSpace")?, DigestIds::from_cbor_value(v)?)))
            .collect::<coset::Result<_>>()
            .map(ValueDigests)
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(
            self.0
                .into_iter()
                .map(|(ns, digests)| Ok((Value::Text(ns), digests.to_cbor_value()?)))
                .collect::<coset::Result<_>>()?,
        ))
    }
}

impl CborSerializable for Mso {}
impl AsCborValue for Mso {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "MobileSecurityObject")?;
        Ok(Self {
            version: cbor::into_text(cbor::require(&mut map, "version", "version")?, "version")?,
            digest_algorithm: DigestAlgorithm::from_cbor_value(cbor::require(
                &mut map,
                "digestAlgorithm",
                "digestAlgorithm",
            )?)?,
            value_digests: ValueDigests::from_cbor_value(cbor::require(
                &mut map,
                "valueDigests",
                "valueDigests",
            )?)?,
            device_key_info: DeviceKeyInfo::from_cbor_value(cbor::require(
                &mut map,
                "deviceKeyInfo",
                "deviceKeyInfo",
            )?)?,
            doc_type: cbor::into_text(cbor::require(&mut map, "docType", "docType")?, "docType")?,
            validity_info: ValidityInfo::from_cbor_value(cbor::require(
                &mut map,
                "validityInfo",
                "validityInfo",
            )?)?,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(vec![
            (cbor::text("version"), Value::Text(self.version)),
            (
                cbor::text("digestAlgorithm"),
                self.digest_algorithm.to_cbor_value()?,
            ),
            (cbor::text("valueDigests"), self.value_digests.to_cbor_value()?),
            (
                cbor::text("deviceKeyInfo"),
                self.device_key_info.to_cbor_value()?,
            ),
            (cbor::text("docType"), Value::Text(self.doc_type)),
            (cbor::text("validityInfo"), self.validity_info.to_cbor_value()?),
        ]))
    }
}
