//! Random-byte and hashing primitives behind a provider trait.
//!
//! Hardware-backed or platform key stores can plug their own [CryptoProvider] into the
//! issuance builder. Signing lives in [crate::cose].
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::definitions::DigestAlgorithm;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to generate random bytes: {0}")]
    Random(String),
}

/// Source of randomness and message digests.
pub trait CryptoProvider {
    /// Fill `len` bytes from a cryptographically secure source.
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, Error>;

    fn hash(&self, algorithm: DigestAlgorithm, data: &[u8]) -> Result<Vec<u8>, Error>;
}

/// The operating system RNG and the RustCrypto SHA-2 family.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsCrypto;

impl CryptoProvider for OsCrypto {
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::Random(e.to_string()))?;
        Ok(bytes)
    }

    fn hash(&self, algorithm: DigestAlgorithm, data: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(match algorithm {
            DigestAlgorithm::SHA256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::SHA384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::SHA512 => Sha512::digest(data).to_vec(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn random_bytes_are_fresh() {
        let a = OsCrypto.random_bytes(32).unwrap();
        let b = OsCrypto.random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn digest_lengths() {
        for (alg, len) in [
            (DigestAlgorithm::SHA256, 32),
            (DigestAlgorithm::SHA384, 48),
            (DigestAlgorithm::SHA512, 64),
        ] {
            assert_eq!(OsCrypto.hash(alg, b"mdl").unwrap().len(), len);
        }
    }

    #[test]
    fn sha256_known_answer() {
        let digest = OsCrypto.hash(DigestAlgorithm::SHA256, b"abc").unwrap();
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
