use coset::{
    iana, sig_structure_data, CoseSign1, CoseSign1Builder, Header, HeaderBuilder,
    ProtectedHeader, SignatureContext,
};

use crate::cose::{CoseSigner, CoseVerifier};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("COSE_Sign1 has a detached payload but none was supplied")]
    MissingPayload,
    #[error("signature algorithm mismatch: header declares {declared:?}, key uses {key:?}")]
    AlgorithmMismatch {
        declared: Option<iana::Algorithm>,
        key: iana::Algorithm,
    },
    #[error("signature verification failed: {0}")]
    Verification(signature::Error),
}

/// A COSE_Sign1 waiting for its signature.
///
/// The to-be-signed `Sig_structure` is fixed at preparation time, so the signature can be
/// produced elsewhere (a hardware key store, a remote HSM) and supplied afterwards.
#[derive(Debug, Clone)]
pub struct PreparedCoseSign1 {
    cose_sign1: CoseSign1,
    signature_payload: Vec<u8>,
}

impl PreparedCoseSign1 {
    /// Prepare a COSE_Sign1 carrying `payload`.
    ///
    /// With `detached` set, the payload is signed but left out of the encoded structure.
    pub fn new(
        algorithm: iana::Algorithm,
        unprotected: Header,
        payload: Vec<u8>,
        detached: bool,
    ) -> Self {
        let protected = HeaderBuilder::new().algorithm(algorithm).build();
        let signature_payload = sig_structure_data(
            SignatureContext::CoseSign1,
            ProtectedHeader {
                original_data: None,
                header: protected.clone(),
            },
            None,
            &[],
            &payload,
        );

        let mut builder = CoseSign1Builder::new()
            .protected(protected)
            .unprotected(unprotected);
        if !detached {
            builder = builder.payload(payload);
        }

        Self {
            cose_sign1: builder.build(),
            signature_payload,
        }
    }

    /// Retrieve the bytes that have to be signed.
    pub fn signature_payload(&self) -> &[u8] {
        &self.signature_payload
    }

    /// Supply the signature to complete the COSE_Sign1.
    pub fn finalize(self, signature: Vec<u8>) -> CoseSign1 {
        let mut cose_sign1 = self.cose_sign1;
        cose_sign1.signature = signature;
        cose_sign1
    }
}

/// Prepare and sign in one step.
pub fn sign<S: CoseSigner + ?Sized>(
    signer: &S,
    unprotected: Header,
    payload: Vec<u8>,
    detached: bool,
) -> Result<CoseSign1, signature::Error> {
    let prepared = PreparedCoseSign1::new(signer.algorithm(), unprotected, payload, detached);
    let signature = signer.try_sign_payload(prepared.signature_payload())?;
    Ok(prepared.finalize(signature))
}

/// Verify a COSE_Sign1.
///
/// `detached_payload` is used when the structure carries no payload of its own.
pub fn verify<V: CoseVerifier + ?Sized>(
    cose_sign1: &CoseSign1,
    detached_payload: Option<&[u8]>,
    verifier: &V,
) -> Result<(), Error> {
    let declared = algorithm_of(cose_sign1);
    if declared != Some(verifier.algorithm()) {
        return Err(Error::AlgorithmMismatch {
            declared,
            key: verifier.algorithm(),
        });
    }

    let payload = cose_sign1
        .payload
        .as_deref()
        .or(detached_payload)
        .ok_or(Error::MissingPayload)?;
    let tbs = sig_structure_data(
        SignatureContext::CoseSign1,
        cose_sign1.protected.clone(),
        None,
        &[],
        payload,
    );
    verifier
        .verify_payload(&tbs, &cose_sign1.signature)
        .map_err(Error::Verification)
}

/// The algorithm declared in the protected header, if it is an assigned one.
pub fn algorithm_of(cose_sign1: &CoseSign1) -> Option<iana::Algorithm> {
    match cose_sign1.protected.header.alg {
        Some(coset::RegisteredLabelWithPrivate::Assigned(alg)) => Some(alg),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use coset::CborSerializable;
    use p256::ecdsa::SigningKey;

    fn key() -> SigningKey {
        SigningKey::random(&mut rand::thread_rng())
    }

    #[test]
    fn attached_roundtrip() {
        let signer = key();
        let signed = sign(&signer, Header::default(), b"payload".to_vec(), false).unwrap();
        let bytes = signed.to_vec().unwrap();
        let decoded = CoseSign1::from_slice(&bytes).unwrap();
        assert_eq!(decoded.payload.as_deref(), Some(&b"payload"[..]));
        verify(&decoded, None, signer.verifying_key()).expect("signature should verify");
    }

    #[test]
    fn detached_requires_payload() {
        let signer = key();
        let signed = sign(&signer, Header::default(), b"payload".to_vec(), true).unwrap();
        assert!(signed.payload.is_none());
        assert!(matches!(
            verify(&signed, None, signer.verifying_key()),
            Err(Error::MissingPayload)
        ));
        verify(&signed, Some(b"payload"), signer.verifying_key()).unwrap();
        assert!(verify(&signed, Some(b"other"), signer.verifying_key()).is_err());
    }

    #[test]
    fn remote_signature() {
        let signer = key();
        let prepared =
            PreparedCoseSign1::new(iana::Algorithm::ES256, Header::default(), vec![1, 2, 3], false);
        let signature = signer.try_sign_payload(prepared.signature_payload()).unwrap();
        let signed = prepared.finalize(signature);
        assert_eq!(algorithm_of(&signed), Some(iana::Algorithm::ES256));
        verify(&signed, None, signer.verifying_key()).unwrap();
    }

    #[test]
    fn wrong_key_fails() {
        let signed = sign(&key(), Header::default(), b"payload".to_vec(), false).unwrap();
        assert!(verify(&signed, None, key().verifying_key()).is_err());
    }
}
