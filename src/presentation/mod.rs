//! Holder side of an issued mdoc: decoding it and presenting a selection of its elements.
pub mod device;
pub mod mdoc;

pub use device::{DeviceResponseBuilder, DisclosureOmission, Presentation};
pub use mdoc::{Attributes, Mdoc};
