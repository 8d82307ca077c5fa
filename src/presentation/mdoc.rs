//! Decoding of issued mdocs.
//!
//! [Mdoc] keeps the decoded issuer-signed items next to a flattened [Attributes] view. The items
//! are kept with their original encoding, so a presentation discloses exactly the bytes the
//! issuer digested.
use ciborium::Value;
use coset::CborSerializable;

use crate::{
    cbor::{self, CborError},
    cose::{sign1, CoseVerifier},
    crypto::{self, CryptoProvider, OsCrypto},
    definitions::{
        helpers::{tag24, Tag24},
        namespaces::org_iso_18013_5_1::{self, age_over, OrgIso18013_5_1, FIELDS, NAMESPACE},
        DigestId, IssuedMdoc, IssuerSigned, IssuerSignedItemBytes, Mso,
    },
    issuance::X5Chain,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to decode mdoc: {0}")]
    Decode(CborError),
    #[error("mdoc is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("mdoc contains no documents")]
    NoDocuments,
    #[error("document has no {NAMESPACE} namespace")]
    MissingDefaultNamespace,
    #[error("issuerAuth carries no MSO")]
    MissingMso,
    #[error("unable to decode MSO: {0}")]
    Mso(tag24::Error),
    #[error("MSO has no digest {digest_id} in namespace {namespace}")]
    MissingDigest {
        namespace: String,
        digest_id: DigestId,
    },
    #[error("digest of {namespace}/{element} does not match the MSO")]
    DigestMismatch { namespace: String, element: String },
    #[error(transparent)]
    Crypto(#[from] crypto::Error),
    #[error("issuer signature is invalid: {0}")]
    InvalidSignature(#[from] sign1::Error),
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// A decoded mdoc holding a single mDL document.
#[derive(Debug, Clone, PartialEq)]
pub struct Mdoc {
    raw: Vec<u8>,
    doc_type: String,
    issuer_signed: IssuerSigned,
    attributes: Attributes,
}

/// Flattened name to value view of the elements of a document.
///
/// The mDL namespace comes first in schema order, then its `age_over_NN` elements by age, then
/// its remaining elements and finally the other namespaces, both in encoded order. Dates are
/// given as their text. A name that appears in several namespaces keeps its first value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, Value)>);

impl Mdoc {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mdoc = IssuedMdoc::from_slice(bytes).map_err(|e| Error::Decode(e.into()))?;
        let document = mdoc.documents.into_iter().next().ok_or(Error::NoDocuments)?;
        let attributes = Attributes::from_issuer_signed(&document.issuer_signed)?;
        Ok(Self {
            raw: bytes.to_vec(),
            doc_type: document.doc_type,
            issuer_signed: document.issuer_signed,
            attributes,
        })
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        Self::decode(&hex::decode(hex.trim())?)
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn issuer_signed(&self) -> &IssuerSigned {
        &self.issuer_signed
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Typed view of the mDL namespace.
    pub fn mdl(&self) -> Result<OrgIso18013_5_1, org_iso_18013_5_1::Error> {
        let elements: Vec<(String, Value)> = self
            .issuer_signed
            .namespaces
            .get(NAMESPACE)
            .unwrap_or_default()
            .iter()
            .map(element)
            .collect();
        OrgIso18013_5_1::from_attributes(&elements)
    }

    /// The bytes this mdoc was decoded from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn hex(&self) -> String {
        hex::encode(&self.raw)
    }

    /// The Mobile Security Object signed in `issuerAuth`.
    pub fn mso(&self) -> Result<Mso> {
        let payload = self
            .issuer_signed
            .issuer_auth
            .payload
            .as_deref()
            .ok_or(Error::MissingMso)?;
        let value: Value = cbor::from_slice(payload).map_err(Error::Decode)?;
        Ok(Tag24::<Mso>::try_from(value).map_err(Error::Mso)?.into_inner())
    }

    /// Recompute the digest of every item and compare it with the MSO.
    pub fn verify_digests(&self) -> Result<()> {
        let mso = self.mso()?;
        for (namespace, items) in self.issuer_signed.namespaces.iter() {
            for item in items {
                let digest_id = item.as_ref().digest_id;
                let expected = mso
                    .value_digests
                    .get(namespace)
                    .and_then(|digests| digests.get(digest_id))
                    .ok_or_else(|| Error::MissingDigest {
                        namespace: namespace.clone(),
                        digest_id,
                    })?;
                let tagged = item.tagged_bytes().map_err(Error::Decode)?;
                let actual = OsCrypto.hash(mso.digest_algorithm, &tagged)?;
                if expected.as_ref() != actual.as_slice() {
                    return Err(Error::DigestMismatch {
                        namespace: namespace.clone(),
                        element: item.as_ref().element_identifier.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The issuer certificate chain carried in the `issuerAuth` header.
    pub fn x5chain(&self) -> anyhow::Result<X5Chain> {
        X5Chain::from_header(&self.issuer_signed.issuer_auth.unprotected)
    }

    /// Check `issuerAuth` against the issuer key.
    pub fn verify_issuer_signature<V: CoseVerifier + ?Sized>(&self, verifier: &V) -> Result<()> {
        sign1::verify(&self.issuer_signed.issuer_auth, None, verifier)?;
        Ok(())
    }
}

impl Attributes {
    fn from_issuer_signed(issuer_signed: &IssuerSigned) -> Result<Self> {
        let mdl: Vec<(String, Value)> = issuer_signed
            .namespaces
            .get(NAMESPACE)
            .ok_or(Error::MissingDefaultNamespace)?
            .iter()
            .map(element)
            .collect();

        let mut attributes = Attributes::default();
        for spec in FIELDS {
            if let Some((name, value)) = mdl.iter().find(|(name, _)| name == spec.identifier) {
                attributes.push(name, value);
            }
        }
        for age in 1..=age_over::MAX_AGE {
            let identifier = age_over::identifier(age.into());
            if let Some((name, value)) = mdl.iter().find(|(name, _)| *name == identifier) {
                attributes.push(name, value);
            }
        }
        for (name, value) in mdl.iter() {
            attributes.push(name, value);
        }

        for (namespace, items) in issuer_signed.namespaces.iter() {
            if namespace == NAMESPACE {
                continue;
            }
            for (name, value) in items.iter().map(element) {
                attributes.push(&name, &value);
            }
        }
        Ok(attributes)
    }

    fn push(&mut self, name: &str, value: &Value) {
        if self.get(name).is_none() {
            self.0.push((name.to_string(), value.clone()));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object of the attributes, in view order.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(name, value)| (name.clone(), cbor::to_json(value)))
                .collect(),
        )
    }
}

fn element(item: &IssuerSignedItemBytes) -> (String, Value) {
    let item = item.as_ref();
    (
        item.element_identifier.clone(),
        cbor::untag_dates(item.element_value.clone()),
    )
}
