//! Selective disclosure of an issued mdoc to a verifier.
//!
//! [DeviceResponseBuilder] picks the items a presentation definition asks for, passes the issuer
//! signature through unchanged and signs a `DeviceAuthentication` bound to the session
//! transcript with the device key.
use ciborium::Value;
use coset::{CborSerializable, Header};
use tracing::{debug, info, warn};

use crate::{
    cbor::CborError,
    cose::{sign1, CoseSigner},
    definitions::{
        device_response::Errors,
        helpers::Tag24,
        oid4vp::{FieldPath, FieldPathError, PresentationDefinition},
        session, CoseKey, DeviceAuth, DeviceAuthentication, DeviceNamespaces, DeviceResponse,
        DeviceSigned, Document, DocumentErrorCode, Handover, IssuerNamespaces, IssuerSigned,
        IssuerSignedItemBytes, SessionTranscript, Status,
    },
    presentation::Mdoc,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing parameter: '{0}'")]
    MissingParameter(&'static str),
    #[error("invalid handover: {0}")]
    InvalidHandover(#[from] session::Error),
    #[error("presentation definition has no input descriptor for {0}")]
    NoMatchingInputDescriptor(String),
    #[error(transparent)]
    InvalidFieldPath(#[from] FieldPathError),
    #[error("MAC device authentication is not supported")]
    MacUnsupported,
    #[error("unable to sign device authentication: {0}")]
    Signing(signature::Error),
    #[error(transparent)]
    Cbor(#[from] CborError),
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// A requested element the document does not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureOmission {
    pub namespace: String,
    pub element_identifier: String,
}

/// The outcome of [DeviceResponseBuilder::generate].
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub response: DeviceResponse,
    /// CBOR encoding of `response`.
    pub bytes: Vec<u8>,
    pub omissions: Vec<DisclosureOmission>,
}

enum Authenticator<'a> {
    Signature(&'a dyn CoseSigner),
    Mac,
}

/// Builder of a `DeviceResponse` for one mdoc.
pub struct DeviceResponseBuilder<'a> {
    mdoc: &'a Mdoc,
    presentation_definition: Option<PresentationDefinition>,
    handover: Option<Vec<Value>>,
    authenticator: Option<Authenticator<'a>>,
    report_omissions_as_errors: bool,
}

impl<'a> DeviceResponseBuilder<'a> {
    pub fn from_mdoc(mdoc: &'a Mdoc) -> Self {
        Self {
            mdoc,
            presentation_definition: None,
            handover: None,
            authenticator: None,
            report_omissions_as_errors: false,
        }
    }

    pub fn using_presentation_definition(
        mut self,
        presentation_definition: PresentationDefinition,
    ) -> Self {
        self.presentation_definition = Some(presentation_definition);
        self
    }

    /// Set the three or four element handover of the session transcript.
    pub fn using_handover(mut self, handover: impl Into<Vec<Value>>) -> Self {
        self.handover = Some(handover.into());
        self
    }

    /// Authenticate with a signature by the device key bound in the MSO.
    pub fn authenticate_with_signature(mut self, device_key: &'a dyn CoseSigner) -> Self {
        self.authenticator = Some(Authenticator::Signature(device_key));
        self
    }

    /// Authenticate with a MAC keyed with the reader's ephemeral key.
    ///
    /// Not supported: [Self::generate] fails with [Error::MacUnsupported].
    pub fn authenticate_with_mac(mut self, _reader_key: CoseKey) -> Self {
        self.authenticator = Some(Authenticator::Mac);
        self
    }

    /// Record omitted elements in the `errors` of the returned document.
    pub fn report_omissions_as_errors(mut self, report: bool) -> Self {
        self.report_omissions_as_errors = report;
        self
    }

    pub fn generate(&self) -> Result<Presentation> {
        let presentation_definition = self
            .presentation_definition
            .as_ref()
            .ok_or(Error::MissingParameter("presentation_definition"))?;
        let handover = self
            .handover
            .clone()
            .ok_or(Error::MissingParameter("handover"))?;
        let signer = match self
            .authenticator
            .as_ref()
            .ok_or(Error::MissingParameter("authenticator"))?
        {
            Authenticator::Signature(signer) => *signer,
            Authenticator::Mac => {
                debug!("MAC device authentication requested");
                return Err(Error::MacUnsupported);
            }
        };
        let session_transcript = SessionTranscript::new(Handover::new(handover)?);

        let doc_type = self.mdoc.doc_type();
        if presentation_definition.input_descriptors.len() > 1 {
            warn!(
                "presentation definition has {} input descriptors, only {} is processed",
                presentation_definition.input_descriptors.len(),
                doc_type
            );
        }
        let input_descriptor = presentation_definition
            .input_descriptor(doc_type)
            .ok_or_else(|| Error::NoMatchingInputDescriptor(doc_type.to_string()))?;

        let mut disclosed: Vec<(String, Vec<IssuerSignedItemBytes>)> = Vec::new();
        let mut omissions = Vec::new();
        for field in input_descriptor.constraints.fields.iter() {
            let paths = field
                .path
                .iter()
                .map(|path| path.parse::<FieldPath>())
                .collect::<Result<Vec<_>, _>>()?;
            let Some(first) = paths.first() else {
                continue;
            };
            match paths.iter().find_map(|path| self.find(path)) {
                Some((path, item)) => select(&mut disclosed, &path.namespace, item),
                None => {
                    info!(
                        namespace = first.namespace.as_str(),
                        element = first.element_identifier.as_str(),
                        "requested element is not in the mdoc"
                    );
                    omissions.push(DisclosureOmission {
                        namespace: first.namespace.clone(),
                        element_identifier: first.element_identifier.clone(),
                    });
                }
            }
        }
        debug!(
            "disclosing {} elements of {}, {} omitted",
            disclosed.iter().map(|(_, items)| items.len()).sum::<usize>(),
            doc_type,
            omissions.len()
        );

        let mut namespaces = IssuerNamespaces::default();
        for (namespace, items) in disclosed {
            namespaces.insert(namespace, items);
        }

        let device_namespaces = Tag24::new(DeviceNamespaces::default())
            .map_err(|e| CborError::EncodeFailed(e.to_string()))?;
        let device_authentication = DeviceAuthentication::new(
            session_transcript,
            doc_type.to_string(),
            device_namespaces.clone(),
        )
        .to_bytes()?;
        let device_signature =
            sign1::sign(signer, Header::default(), device_authentication, true)
                .map_err(Error::Signing)?;

        let errors = (self.report_omissions_as_errors && !omissions.is_empty())
            .then(|| omission_errors(&omissions));
        let response = DeviceResponse {
            version: DeviceResponse::VERSION.to_string(),
            documents: vec![Document {
                doc_type: doc_type.to_string(),
                issuer_signed: IssuerSigned {
                    namespaces,
                    issuer_auth: self.mdoc.issuer_signed().issuer_auth.clone(),
                },
                device_signed: DeviceSigned {
                    namespaces: device_namespaces,
                    device_auth: DeviceAuth::Signature(device_signature),
                },
                errors,
            }],
            status: Status::OK,
        };
        let bytes = response.clone().to_vec().map_err(CborError::from)?;

        Ok(Presentation {
            response,
            bytes,
            omissions,
        })
    }

    fn find<'p>(&self, path: &'p FieldPath) -> Option<(&'p FieldPath, &'a IssuerSignedItemBytes)> {
        let mdoc: &'a Mdoc = self.mdoc;
        mdoc.issuer_signed()
            .namespaces
            .get(&path.namespace)?
            .iter()
            .find(|item| item.as_ref().element_identifier == path.element_identifier)
            .map(|item| (path, item))
    }
}

fn select(
    disclosed: &mut Vec<(String, Vec<IssuerSignedItemBytes>)>,
    namespace: &str,
    item: &IssuerSignedItemBytes,
) {
    match disclosed.iter_mut().find(|(ns, _)| ns == namespace) {
        Some((_, items)) => {
            if !items.contains(item) {
                items.push(item.clone());
            }
        }
        None => disclosed.push((namespace.to_string(), vec![item.clone()])),
    }
}

fn omission_errors(omissions: &[DisclosureOmission]) -> Errors {
    let mut errors: Errors = Vec::new();
    for omission in omissions {
        let entry = (
            omission.element_identifier.clone(),
            DocumentErrorCode::DataNotReturned,
        );
        match errors.iter_mut().find(|(ns, _)| *ns == omission.namespace) {
            Some((_, elements)) => elements.push(entry),
            None => errors.push((omission.namespace.clone(), vec![entry])),
        }
    }
    errors
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::definitions::oid4vp::{Constraints, Field, InputDescriptor};

    fn definition(id: &str, paths: &[&[&str]]) -> PresentationDefinition {
        PresentationDefinition {
            id: "mdl-test".into(),
            input_descriptors: vec![InputDescriptor {
                id: id.into(),
                format: None,
                constraints: Constraints {
                    limit_disclosure: Some("required".into()),
                    fields: paths
                        .iter()
                        .map(|alternatives| Field {
                            path: alternatives.iter().map(|p| p.to_string()).collect(),
                            intent_to_retain: false,
                        })
                        .collect(),
                },
            }],
        }
    }

    #[test]
    fn omissions_grouped_by_namespace() {
        let omissions = vec![
            DisclosureOmission {
                namespace: "a".into(),
                element_identifier: "x".into(),
            },
            DisclosureOmission {
                namespace: "b".into(),
                element_identifier: "y".into(),
            },
            DisclosureOmission {
                namespace: "a".into(),
                element_identifier: "z".into(),
            },
        ];
        let errors = omission_errors(&omissions);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].0, "a");
        assert_eq!(
            errors[0].1,
            vec![
                ("x".to_string(), DocumentErrorCode::DataNotReturned),
                ("z".to_string(), DocumentErrorCode::DataNotReturned),
            ]
        );
    }

    #[test]
    fn definition_paths_parse() {
        let definition = definition(
            crate::DOC_TYPE,
            &[&["$['org.iso.18013.5.1']['family_name']", "$.family_name"]],
        );
        let field = &definition.input_descriptors[0].constraints.fields[0];
        assert!(field.path[0].parse::<FieldPath>().is_ok());
        assert!(field.path[1].parse::<FieldPath>().is_err());
    }
}
