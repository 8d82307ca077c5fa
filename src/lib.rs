//! ISO/IEC 18013-5 mobile driving licence tooling.
//!
//! The crate covers the two halves of the mdoc lifecycle that live on the issuer and the holder:
//!
//! - [issuance]: turning namespaced attributes into individually salted digests, signing them
//!   into a Mobile Security Object (MSO) and packaging the result as an mdoc.
//! - [presentation]: decoding an issued mdoc and deriving a selectively disclosed
//!   `DeviceResponse` for a verifier, authenticated by the device key bound in the MSO.
//!
//! # Example
//!
//! ```ignore
//! use mdltools::issuance::MdocBuilder;
//! use mdltools::presentation::{DeviceResponseBuilder, Mdoc};
//!
//! let mut builder = MdocBuilder::new()
//!     .validity_period(time::Duration::days(365))
//!     .device_key(device_key.verifying_key().into())
//!     .x5chain(x5chain);
//! builder.add_namespace_json("org.iso.18013.5.1", attributes)?;
//! let bytes = builder.save(&issuer_key)?;
//!
//! let mdoc = Mdoc::decode(&bytes)?;
//! let presentation = DeviceResponseBuilder::from_mdoc(&mdoc)
//!     .using_presentation_definition(definition)
//!     .using_handover(handover)
//!     .authenticate_with_signature(&device_key)
//!     .generate()?;
//! ```
pub mod cbor;
pub mod cose;
pub mod crypto;
pub mod definitions;
pub mod issuance;
pub mod presentation;

pub use definitions::namespaces::org_iso_18013_5_1::{DOC_TYPE, NAMESPACE};
