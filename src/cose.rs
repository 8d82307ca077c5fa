//! COSE_Sign1 support for issuer and device authentication.
//!
//! Signing keys are abstracted behind [CoseSigner] so that the issuer key and the device key can
//! live in software or in a hardware key store. Implementations for the P-256 and P-384 ECDSA
//! keys of the RustCrypto project are provided.
pub mod sign1;

pub use sign1::PreparedCoseSign1;

use coset::iana;

/// Header label of the `x5chain` parameter (RFC 9360).
pub const X5CHAIN_HEADER_LABEL: i64 = 33;

/// Trait to represent the signature algorithm of a signer or verifier.
pub trait SignatureAlgorithm {
    fn algorithm(&self) -> iana::Algorithm;
}

/// A key able to produce the raw COSE signature over a `Sig_structure`.
pub trait CoseSigner: SignatureAlgorithm {
    /// Sign the to-be-signed bytes, returning the signature in COSE (`r || s`) form.
    fn try_sign_payload(&self, payload: &[u8]) -> Result<Vec<u8>, signature::Error>;
}

/// A key able to check a COSE signature.
pub trait CoseVerifier: SignatureAlgorithm {
    fn verify_payload(&self, payload: &[u8], signature: &[u8]) -> Result<(), signature::Error>;
}

mod es256 {
    use super::{CoseSigner, CoseVerifier, SignatureAlgorithm};
    use coset::iana;
    use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
    use signature::{SignatureEncoding, Signer, Verifier};

    impl SignatureAlgorithm for SigningKey {
        fn algorithm(&self) -> iana::Algorithm {
            iana::Algorithm::ES256
        }
    }

    impl SignatureAlgorithm for VerifyingKey {
        fn algorithm(&self) -> iana::Algorithm {
            iana::Algorithm::ES256
        }
    }

    impl CoseSigner for SigningKey {
        fn try_sign_payload(&self, payload: &[u8]) -> Result<Vec<u8>, signature::Error> {
            let signature: Signature = self.try_sign(payload)?;
            Ok(signature.to_vec())
        }
    }

    impl CoseVerifier for VerifyingKey {
        fn verify_payload(&self, payload: &[u8], signature: &[u8]) -> Result<(), signature::Error> {
            let signature = Signature::from_slice(signature)?;
            self.verify(payload, &signature)
        }
    }
}

mod es384 {
    use super::{CoseSigner, CoseVerifier, SignatureAlgorithm};
    use coset::iana;
    use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
    use signature::{SignatureEncoding, Signer, Verifier};

    impl SignatureAlgorithm for SigningKey {
        fn algorithm(&self) -> iana::Algorithm {
            iana::Algorithm::ES384
        }
    }

    impl SignatureAlgorithm for VerifyingKey {
        fn algorithm(&self) -> iana::Algorithm {
            iana::Algorithm::ES384
        }
    }

    impl CoseSigner for SigningKey {
        fn try_sign_payload(&self, payload: &[u8]) -> Result<Vec<u8>, signature::Error> {
            let signature: Signature = self.try_sign(payload)?;
            Ok(signature.to_vec())
        }
    }

    impl CoseVerifier for VerifyingKey {
        fn verify_payload(&self, payload: &[u8], signature: &[u8]) -> Result<(), signature::Error> {
            let signature = Signature::from_slice(signature)?;
            self.verify(payload, &signature)
        }
    }
}
