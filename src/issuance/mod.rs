//! Issuance of mdocs.
//!
//! [MdocBuilder] collects namespaces of elements, salts and digests every element, signs the
//! digests into a Mobile Security Object and packages everything as an mdoc.
pub mod digest;
pub mod mdoc;
pub mod x5chain;

pub use digest::ElementTags;
pub use mdoc::{MdocBuilder, PreparedMdoc};
pub use x5chain::X5Chain;

use coset::CoseError;

use crate::cbor::CborError;
use crate::crypto;
use crate::definitions::{helpers::tag24, namespaces::org_iso_18013_5_1::ValidationReport};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing parameter: '{0}'")]
    MissingParameter(&'static str),
    #[error("validity period must be positive, received {0}")]
    InvalidValidityPeriod(time::Duration),
    #[error("invalid elements: {0}")]
    Validation(ValidationReport),
    #[error("element '{element}' is registered with unsupported tag {tag}")]
    UnsupportedEncoding { element: String, tag: u64 },
    #[error("element '{0}' is not a valid full-date")]
    InvalidFullDate(String),
    #[error("element '{0}' is given more than once")]
    DuplicateElement(String),
    #[error("the mdoc has been saved, its digests can no longer change")]
    Sealed,
    #[error("unable to sign the MSO: {0}")]
    Signing(signature::Error),
    #[error(transparent)]
    Crypto(#[from] crypto::Error),
    #[error(transparent)]
    Cbor(#[from] CborError),
}

impl From<CoseError> for Error {
    fn from(e: CoseError) -> Self {
        Error::Cbor(CborError::Cose(e))
    }
}

impl From<tag24::Error> for Error {
    fn from(e: tag24::Error) -> Self {
        Error::Cbor(CborError::EncodeFailed(e.to_string()))
    }
}
