//! The issuer certificate chain carried in the `x5chain` header of `issuerAuth`.
//!
//! ```ignore
//! let x5chain = X5Chain::builder()
//!     .with_pem(include_bytes!("../../test/issuance/256-cert.pem"))?
//!     .build()?;
//! ```
use anyhow::{anyhow, Result};
use ciborium::Value;
use coset::{Header, Label};
use x509_cert::{
    certificate::Certificate,
    der::{Decode, Encode},
};

use crate::cose::X5CHAIN_HEADER_LABEL;

/// A DER encoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509 {
    bytes: Vec<u8>,
}

/// A non-empty chain of [X509] certificates, leaf first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X5Chain(Vec<X509>);

impl X5Chain {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// A single certificate is a bare byte string, a longer chain an array of them.
    pub fn into_cbor(&self) -> Value {
        match self.0.as_slice() {
            [cert] => Value::Bytes(cert.bytes.clone()),
            certs => Value::Array(
                certs
                    .iter()
                    .map(|x509| Value::Bytes(x509.bytes.clone()))
                    .collect(),
            ),
        }
    }

    /// Unprotected header carrying the chain.
    pub fn to_header(&self) -> Header {
        Header {
            rest: vec![(Label::Int(X5CHAIN_HEADER_LABEL), self.into_cbor())],
            ..Default::default()
        }
    }

    /// Read the chain back from a COSE header.
    pub fn from_header(header: &Header) -> Result<X5Chain> {
        let value = header
            .rest
            .iter()
            .find(|(label, _)| *label == Label::Int(X5CHAIN_HEADER_LABEL))
            .map(|(_, value)| value)
            .ok_or_else(|| anyhow!("no x5chain header"))?;
        let certs = match value {
            Value::Bytes(bytes) => vec![bytes.as_slice()],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_bytes()
                        .map(Vec::as_slice)
                        .ok_or_else(|| anyhow!("x5chain entry is not a byte string"))
                })
                .collect::<Result<_>>()?,
            _ => return Err(anyhow!("x5chain header is neither bstr nor array")),
        };
        certs
            .into_iter()
            .try_fold(Builder::default(), |builder, der| builder.with_der(der))?
            .build()
    }

    pub fn certificates(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(|x509| x509.bytes.as_slice())
    }
}

#[derive(Default, Debug, Clone)]
pub struct Builder {
    certs: Vec<X509>,
}

impl Builder {
    /// Adds a PEM encoded certificate.
    pub fn with_pem(mut self, data: &[u8]) -> Result<Builder> {
        let bytes = pem_rfc7468::decode_vec(data)
            .map_err(|e| anyhow!("unable to parse pem: {}", e))?
            .1;
        self.certs.push(parse_der(&bytes)?);
        Ok(self)
    }

    /// Adds a DER encoded certificate.
    pub fn with_der(mut self, data: &[u8]) -> Result<Builder> {
        self.certs.push(parse_der(data)?);
        Ok(self)
    }

    pub fn build(self) -> Result<X5Chain> {
        if self.certs.is_empty() {
            return Err(anyhow!(
                "at least one certificate must be given to the builder"
            ));
        }
        Ok(X5Chain(self.certs))
    }
}

fn parse_der(data: &[u8]) -> Result<X509> {
    let cert = Certificate::from_der(data)
        .map_err(|e| anyhow!("unable to parse certificate from der encoding: {}", e))?;
    Ok(X509 {
        bytes: cert
            .to_vec()
            .map_err(|e| anyhow!("unable to convert certificate to bytes: {}", e))?,
    })
}

#[cfg(test)]
pub mod test {
    use super::*;

    static CERT_256: &[u8] = include_bytes!("../../test/issuance/256-cert.pem");

    #[test]
    pub fn self_signed_es256() {
        let x5chain = X5Chain::builder()
            .with_pem(CERT_256)
            .expect("unable to add cert")
            .build()
            .expect("unable to build x5chain");
        assert!(matches!(x5chain.into_cbor(), Value::Bytes(_)));

        let header = x5chain.to_header();
        assert_eq!(X5Chain::from_header(&header).unwrap(), x5chain);
    }

    #[test]
    pub fn chain_of_two() {
        let x5chain = X5Chain::builder()
            .with_pem(CERT_256)
            .unwrap()
            .with_pem(CERT_256)
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(x5chain.into_cbor(), Value::Array(a) if a.len() == 2));
        assert_eq!(x5chain.certificates().count(), 2);
    }

    #[test]
    pub fn empty_chain() {
        assert!(X5Chain::builder().build().is_err());
        assert!(X5Chain::builder().with_der(b"not a certificate").is_err());
    }
}
