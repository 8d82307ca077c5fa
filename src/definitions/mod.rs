pub mod device_key;
pub mod device_response;
pub mod device_signed;
pub mod fulldate;
pub mod helpers;
pub mod issuer_signed;
pub mod mdoc;
pub mod mso;
pub mod namespaces;
pub mod oid4vp;
pub mod session;
pub mod validity_info;

pub use device_key::cose_key::{EC2Curve, EC2Y};
pub use device_key::{CoseKey, DeviceKeyInfo};
pub use device_response::{DeviceResponse, Document, DocumentErrorCode, Status};
pub use device_signed::{DeviceAuth, DeviceAuthentication, DeviceNamespaces, DeviceSigned};
pub use fulldate::FullDate;
pub use issuer_signed::{IssuerNamespaces, IssuerSigned, IssuerSignedItem, IssuerSignedItemBytes};
pub use mdoc::{IssuedDocument, IssuedMdoc};
pub use mso::{DigestAlgorithm, DigestId, DigestIds, Mso, ValueDigests};
pub use oid4vp::{FieldPath, InputDescriptor, PresentationDefinition};
pub use session::{Handover, SessionTranscript};
pub use validity_info::ValidityInfo;
