pub mod bytestr;
pub mod tag24;

pub use bytestr::ByteStr;
pub use tag24::Tag24;
