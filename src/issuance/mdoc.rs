use ciborium::Value;
use coset::{iana, CborSerializable};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{
    cose::{sign1::PreparedCoseSign1, CoseSigner},
    crypto::{CryptoProvider, OsCrypto},
    definitions::{
        helpers::Tag24,
        namespaces::org_iso_18013_5_1::{self, element_from_json, DOC_TYPE, NAMESPACE},
        CoseKey, DigestAlgorithm, DigestIds, FullDate, IssuedDocument, IssuedMdoc,
        IssuerNamespaces, IssuerSigned, IssuerSignedItemBytes, Mso, ValidityInfo, ValueDigests,
    },
    issuance::{
        digest::{derive_age_over, process_attribute, ElementTags},
        x5chain::X5Chain,
        Error,
    },
};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Builder of a single-document mdoc.
///
/// Namespaces are digested as they are added. The first [MdocBuilder::save] (or
/// [MdocBuilder::prepare]) seals the digests: later saves re-sign the same items, and adding
/// further namespaces fails.
///
/// Unless [MdocBuilder::issued_at] is set, the signing time is read from the clock each time it
/// is needed: when a namespace with a birth date is added, and again when the MSO is built.
#[derive(Debug, Clone)]
pub struct MdocBuilder<C = OsCrypto> {
    crypto: C,
    doc_type: String,
    digest_algorithm: DigestAlgorithm,
    validity_period: Option<Duration>,
    issued_at: Option<OffsetDateTime>,
    element_tags: ElementTags,
    validation: bool,
    device_key: Option<CoseKey>,
    x5chain: Option<X5Chain>,
    namespaces: IssuerNamespaces,
    value_digests: ValueDigests,
    sealed: bool,
}

/// An incomplete mdoc, requiring a remotely signed signature to be completed.
#[derive(Debug, Clone)]
pub struct PreparedMdoc {
    doc_type: String,
    namespaces: IssuerNamespaces,
    prepared_sig: PreparedCoseSign1,
}

impl Default for MdocBuilder<OsCrypto> {
    fn default() -> Self {
        Self::with_crypto(OsCrypto)
    }
}

impl MdocBuilder<OsCrypto> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: CryptoProvider> MdocBuilder<C> {
    /// Use `crypto` for salts and digests.
    pub fn with_crypto(crypto: C) -> Self {
        Self {
            crypto,
            doc_type: DOC_TYPE.to_string(),
            digest_algorithm: DigestAlgorithm::default(),
            validity_period: None,
            issued_at: None,
            element_tags: ElementTags::default(),
            validation: true,
            device_key: None,
            x5chain: None,
            namespaces: IssuerNamespaces::default(),
            value_digests: ValueDigests::default(),
            sealed: false,
        }
    }

    /// Set the time between signing and the end of validity. Required.
    pub fn validity_period(mut self, validity_period: Duration) -> Self {
        self.validity_period = Some(validity_period);
        self
    }

    /// Set the digest algorithm to be used for hashing the data elements.
    pub fn digest_algorithm(mut self, digest_algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = digest_algorithm;
        self
    }

    /// Set the document type. Defaults to the mDL document type.
    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = doc_type.into();
        self
    }

    /// Set the signing time, which is also the start of validity and the reference instant for
    /// derived age elements. Defaults to the current time.
    pub fn issued_at(mut self, issued_at: OffsetDateTime) -> Self {
        self.issued_at = Some(truncate_to_seconds(issued_at));
        self
    }

    /// Replace the tags applied to element values.
    pub fn element_tags(mut self, element_tags: ElementTags) -> Self {
        self.element_tags = element_tags;
        self
    }

    /// Enable or disable schema validation of the mDL namespace. Enabled by default.
    pub fn validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the public key of the device this mdoc is bound to. Required.
    pub fn device_key(mut self, device_key: CoseKey) -> Self {
        self.device_key = Some(device_key);
        self
    }

    /// Set the x5chain of the issuing key. Required.
    pub fn x5chain(mut self, x5chain: X5Chain) -> Self {
        self.x5chain = Some(x5chain);
        self
    }

    /// Add the elements of a namespace, in order.
    ///
    /// Elements of the mDL namespace are validated, and a birth date yields the derived
    /// `age_over_21` and `age_over_{age}` elements directly after it. Adding a namespace again
    /// replaces its earlier elements.
    pub fn add_namespace(
        &mut self,
        namespace: impl Into<String>,
        elements: Vec<(String, Value)>,
    ) -> Result<()> {
        if self.sealed {
            return Err(Error::Sealed);
        }
        let namespace = namespace.into();
        for (i, (identifier, _)) in elements.iter().enumerate() {
            if elements[..i].iter().any(|(other, _)| other == identifier) {
                return Err(Error::DuplicateElement(identifier.clone()));
            }
        }

        let elements = if namespace == NAMESPACE {
            let now = self.signing_time();
            if self.validation {
                org_iso_18013_5_1::validate(&elements, now.date()).map_err(Error::Validation)?;
            }
            self.with_derived_elements(elements, now)?
        } else {
            elements
        };

        let mut items: Vec<IssuerSignedItemBytes> = Vec::with_capacity(elements.len());
        let mut digests = DigestIds::default();
        for (digest_id, (identifier, value)) in (0u64..).zip(elements) {
            let (item, digest) = process_attribute(
                &self.crypto,
                self.digest_algorithm,
                &self.element_tags,
                digest_id,
                identifier,
                value,
            )?;
            items.push(item);
            digests.insert(digest_id, digest);
        }

        debug!(
            "digested {} elements of namespace {} with {}",
            items.len(),
            namespace,
            self.digest_algorithm
        );
        self.value_digests.insert(namespace.clone(), digests);
        self.namespaces.insert(namespace, items);
        Ok(())
    }

    /// Add the elements of a namespace given as a JSON object, keeping its key order.
    pub fn add_namespace_json(
        &mut self,
        namespace: impl Into<String>,
        elements: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        let namespace = namespace.into();
        let elements = elements
            .iter()
            .map(|(identifier, json)| {
                let value = if namespace == NAMESPACE {
                    element_from_json(identifier, json)
                } else {
                    crate::cbor::from_json(json)
                };
                (identifier.clone(), value)
            })
            .collect();
        self.add_namespace(namespace, elements)
    }

    fn with_derived_elements(
        &self,
        elements: Vec<(String, Value)>,
        now: OffsetDateTime,
    ) -> Result<Vec<(String, Value)>> {
        let mut expanded = Vec::with_capacity(elements.len() + 2);
        for (identifier, value) in elements.iter() {
            expanded.push((identifier.clone(), value.clone()));
            if identifier != "birth_date" {
                continue;
            }
            let birth_date = FullDate::try_from(value)
                .map_err(|_| Error::InvalidFullDate(identifier.clone()))?;
            for (derived, flag) in derive_age_over(birth_date, now) {
                if elements.iter().any(|(given, _)| *given == derived) {
                    debug!("keeping the supplied {derived} instead of the derived one");
                    continue;
                }
                expanded.push((derived, flag));
            }
        }
        Ok(expanded)
    }

    /// The Mobile Security Object over the namespaces added so far.
    pub fn build_mso(&self) -> Result<Mso> {
        let validity_period = self
            .validity_period
            .ok_or(Error::MissingParameter("validity_period"))?;
        if !validity_period.is_positive() {
            return Err(Error::InvalidValidityPeriod(validity_period));
        }
        let device_key = self
            .device_key
            .clone()
            .ok_or(Error::MissingParameter("device_key"))?;
        if self.namespaces.is_empty() {
            return Err(Error::MissingParameter("namespaces"));
        }
        let signed = self.signing_time();
        let valid_until = signed
            .checked_add(validity_period)
            .ok_or(Error::InvalidValidityPeriod(validity_period))?;

        Ok(Mso {
            version: Mso::VERSION.to_string(),
            digest_algorithm: self.digest_algorithm,
            value_digests: self.value_digests.clone(),
            device_key_info: device_key.into(),
            doc_type: self.doc_type.clone(),
            validity_info: ValidityInfo {
                signed,
                valid_from: signed,
                valid_until,
                expected_update: None,
            },
        })
    }

    fn signing_time(&self) -> OffsetDateTime {
        self.issued_at
            .unwrap_or_else(|| truncate_to_seconds(OffsetDateTime::now_utc()))
    }

    /// Prepare the mdoc for remote signing.
    ///
    /// The signature algorithm which the mdoc will be signed with must be known ahead of time as
    /// it is a required field in the signature headers.
    pub fn prepare(&mut self, signature_algorithm: iana::Algorithm) -> Result<PreparedMdoc> {
        let x5chain = self
            .x5chain
            .as_ref()
            .ok_or(Error::MissingParameter("x5chain"))?;
        let mso = self.build_mso()?;
        let signed = mso.validity_info.signed;
        let mso_bytes = Tag24::new(mso)?.tagged_bytes()?;

        let prepared_sig =
            PreparedCoseSign1::new(signature_algorithm, x5chain.to_header(), mso_bytes, false);
        self.sealed = true;

        debug!(
            "prepared MSO for {} signed at {}",
            self.doc_type, signed
        );
        Ok(PreparedMdoc {
            doc_type: self.doc_type.clone(),
            namespaces: self.namespaces.clone(),
            prepared_sig,
        })
    }

    /// Sign the MSO and encode the mdoc.
    pub fn save<S: CoseSigner + ?Sized>(&mut self, signer: &S) -> Result<Vec<u8>> {
        let prepared = self.prepare(signer.algorithm())?;
        let signature = signer
            .try_sign_payload(prepared.signature_payload())
            .map_err(Error::Signing)?;
        prepared.complete(signature)
    }
}

impl PreparedMdoc {
    /// Retrieve the payload for a remote signature.
    pub fn signature_payload(&self) -> &[u8] {
        self.prepared_sig.signature_payload()
    }

    /// Supply the remotely signed signature to complete and encode the prepared mdoc.
    pub fn complete(self, signature: Vec<u8>) -> Result<Vec<u8>> {
        let PreparedMdoc {
            doc_type,
            namespaces,
            prepared_sig,
        } = self;

        let document = IssuedDocument {
            doc_type,
            issuer_signed: IssuerSigned {
                namespaces,
                issuer_auth: prepared_sig.finalize(signature),
            },
        };
        Ok(IssuedMdoc::new(vec![document]).to_vec()?)
    }
}

fn truncate_to_seconds(t: OffsetDateTime) -> OffsetDateTime {
    t.replace_nanosecond(0).unwrap_or(t)
}
