use ciborium::Value;
use coset::iana::Algorithm;
use coset::{AsCborValue, CborSerializable, CoseError};
use p256::elliptic_curve::sec1::ToEncodedPoint;

use crate::cose::CoseVerifier;

/// An implementation of RFC-8152 [COSE_Key](https://datatracker.ietf.org/doc/html/rfc8152#section-13)
/// restricted to the EC2 keys used for device authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKey {
    EC2 { crv: EC2Curve, x: Vec<u8>, y: EC2Y },
}

/// The sign bit or value of the y-coordinate for the EC point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EC2Y {
    Value(Vec<u8>),
    SignBit(bool),
}

/// The RFC-8152 identifier of the curve, for EC2 key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EC2Curve {
    P256,
    P384,
    P521,
}

/// Errors that can occur when converting a COSE_Key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("COSE_Key of kty 'EC2' missing x coordinate")]
    EC2MissingX,
    #[error("COSE_Key of kty 'EC2' missing y coordinate")]
    EC2MissingY,
    #[error("Expected to parse a CBOR bool or bstr for y-coordinate, received: '{0:?}'")]
    InvalidTypeY(Value),
    #[error("This implementation of COSE_Key only supports P-256, P-384 and P-521 elliptic curves")]
    UnsupportedCurve,
    #[error("This implementation of COSE_Key only supports EC2 keys")]
    UnsupportedKeyType,
    #[error("Could not reconstruct coordinates from the provided COSE_Key")]
    InvalidCoseKey,
}

// COSE_Key labels and values (RFC 8152 section 13).
const KTY: i64 = 1;
const KTY_EC2: i64 = 2;
const CRV: i64 = -1;
const X: i64 = -2;
const Y: i64 = -3;

impl EC2Curve {
    fn id(self) -> i64 {
        match self {
            EC2Curve::P256 => 1,
            EC2Curve::P384 => 2,
            EC2Curve::P521 => 3,
        }
    }

    fn from_id(id: i128) -> Result<Self, Error> {
        match id {
            1 => Ok(EC2Curve::P256),
            2 => Ok(EC2Curve::P384),
            3 => Ok(EC2Curve::P521),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl CoseKey {
    pub fn signature_algorithm(&self) -> Algorithm {
        match self {
            CoseKey::EC2 {
                crv: EC2Curve::P256,
                ..
            } => Algorithm::ES256,
            CoseKey::EC2 {
                crv: EC2Curve::P384,
                ..
            } => Algorithm::ES384,
            CoseKey::EC2 {
                crv: EC2Curve::P521,
                ..
            } => Algorithm::ES512,
        }
    }

    /// SEC1 encoding of the public point.
    fn sec1_bytes(&self) -> Vec<u8> {
        let CoseKey::EC2 { x, y, .. } = self;
        match y {
            EC2Y::Value(y) => [&[0x04u8][..], x.as_slice(), y.as_slice()].concat(),
            EC2Y::SignBit(odd) => [&[if *odd { 0x03u8 } else { 0x02 }][..], x.as_slice()].concat(),
        }
    }

    pub fn to_p256_verifying_key(&self) -> Result<p256::ecdsa::VerifyingKey, Error> {
        match self {
            CoseKey::EC2 {
                crv: EC2Curve::P256,
                ..
            } => p256::ecdsa::VerifyingKey::from_sec1_bytes(&self.sec1_bytes())
                .map_err(|_| Error::InvalidCoseKey),
            _ => Err(Error::UnsupportedCurve),
        }
    }

    pub fn to_p384_verifying_key(&self) -> Result<p384::ecdsa::VerifyingKey, Error> {
        match self {
            CoseKey::EC2 {
                crv: EC2Curve::P384,
                ..
            } => p384::ecdsa::VerifyingKey::from_sec1_bytes(&self.sec1_bytes())
                .map_err(|_| Error::InvalidCoseKey),
            _ => Err(Error::UnsupportedCurve),
        }
    }

    /// A signature verifier for this key, for the curves with a signing implementation.
    pub fn verifier(&self) -> Result<Box<dyn CoseVerifier>, Error> {
        let CoseKey::EC2 { crv, .. } = self;
        match crv {
            EC2Curve::P256 => Ok(Box::new(self.to_p256_verifying_key()?)),
            EC2Curve::P384 => Ok(Box::new(self.to_p384_verifying_key()?)),
            EC2Curve::P521 => Err(Error::UnsupportedCurve),
        }
    }
}

fn from_uncompressed(crv: EC2Curve, point: &[u8]) -> CoseKey {
    // Skip the 0x04 uncompressed point marker.
    let coordinates = point.get(1..).unwrap_or_default();
    let (x, y) = coordinates.split_at(coordinates.len() / 2);
    CoseKey::EC2 {
        crv,
        x: x.to_vec(),
        y: EC2Y::Value(y.to_vec()),
    }
}

impl From<&p256::PublicKey> for CoseKey {
    fn from(key: &p256::PublicKey) -> Self {
        from_uncompressed(EC2Curve::P256, key.to_encoded_point(false).as_bytes())
    }
}

impl From<&p256::ecdsa::VerifyingKey> for CoseKey {
    fn from(key: &p256::ecdsa::VerifyingKey) -> Self {
        from_uncompressed(EC2Curve::P256, key.to_encoded_point(false).as_bytes())
    }
}

impl From<&p384::PublicKey> for CoseKey {
    fn from(key: &p384::PublicKey) -> Self {
        from_uncompressed(EC2Curve::P384, key.to_encoded_point(false).as_bytes())
    }
}

impl From<&p384::ecdsa::VerifyingKey> for CoseKey {
    fn from(key: &p384::ecdsa::VerifyingKey) -> Self {
        from_uncompressed(EC2Curve::P384, key.to_encoded_point(false).as_bytes())
    }
}

impl From<EC2Y> for Value {
    fn from(y: EC2Y) -> Value {
        match y {
            EC2Y::Value(s) => Value::Bytes(s),
            EC2Y::SignBit(b) => Value::Bool(b),
        }
    }
}

impl TryFrom<Value> for EC2Y {
    type Error = Error;

    fn try_from(v: Value) -> Result<Self, Error> {
        match v {
            Value::Bytes(s) => Ok(EC2Y::Value(s)),
            Value::Bool(b) => Ok(EC2Y::SignBit(b)),
            _ => Err(Error::InvalidTypeY(v)),
        }
    }
}

impl From<CoseKey> for Value {
    fn from(key: CoseKey) -> Value {
        let CoseKey::EC2 { crv, x, y } = key;
        Value::Map(vec![
            (Value::Integer(KTY.into()), Value::Integer(KTY_EC2.into())),
            (Value::Integer(CRV.into()), Value::Integer(crv.id().into())),
            (Value::Integer(X.into()), Value::Bytes(x)),
            (Value::Integer(Y.into()), y.into()),
        ])
    }
}

impl TryFrom<Value> for CoseKey {
    type Error = Error;

    fn try_from(v: Value) -> Result<Self, Error> {
        let map = v.into_map().map_err(|_| Error::InvalidCoseKey)?;
        let mut kty = None;
        let mut crv = None;
        let mut x = None;
        let mut y = None;
        for (label, value) in map {
            let label = label
                .into_integer()
                .ok()
                .map(i128::from)
                .ok_or(Error::InvalidCoseKey)?;
            match i64::try_from(label) {
                Ok(KTY) => kty = value.into_integer().ok().map(i128::from),
                Ok(CRV) => crv = value.into_integer().ok().map(i128::from),
                Ok(X) => x = value.into_bytes().ok(),
                Ok(Y) => y = Some(EC2Y::try_from(value)?),
                _ => {}
            }
        }
        if kty != Some(KTY_EC2.into()) {
            return Err(Error::UnsupportedKeyType);
        }
        let crv = EC2Curve::from_id(crv.ok_or(Error::UnsupportedCurve)?)?;
        Ok(CoseKey::EC2 {
            crv,
            x: x.ok_or(Error::EC2MissingX)?,
            y: y.ok_or(Error::EC2MissingY)?,
        })
    }
}

impl CborSerializable for CoseKey {}
impl AsCborValue for CoseKey {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        value
            .try_into()
            .map_err(|_| CoseError::UnexpectedItem("invalid key", "EC2 COSE_Key"))
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(self.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use p256::ecdsa::SigningKey;

    #[test]
    fn p256_roundtrip() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let verifying_key = signing_key.verifying_key();
        let cose_key = CoseKey::from(verifying_key);
        let CoseKey::EC2 { x, y, .. } = &cose_key;
        assert_eq!(x.len(), 32);
        assert!(matches!(y, EC2Y::Value(y) if y.len() == 32));

        let bytes = cose_key.clone().to_vec().unwrap();
        let decoded = CoseKey::from_slice(&bytes).unwrap();
        assert_eq!(decoded, cose_key);
        assert_eq!(&decoded.to_p256_verifying_key().unwrap(), verifying_key);
        assert_eq!(decoded.signature_algorithm(), Algorithm::ES256);
    }

    #[test]
    fn label_order() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let value = Value::from(CoseKey::from(signing_key.verifying_key()));
        let labels: Vec<i128> = value
            .into_map()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k.into_integer().unwrap().into())
            .collect();
        assert_eq!(labels, vec![1, -1, -2, -3]);
    }

    #[test]
    fn compressed_point() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let point = signing_key.verifying_key().to_encoded_point(true);
        let key = CoseKey::EC2 {
            crv: EC2Curve::P256,
            x: point.as_bytes()[1..].to_vec(),
            y: EC2Y::SignBit(point.as_bytes()[0] == 0x03),
        };
        assert_eq!(
            &key.to_p256_verifying_key().unwrap(),
            signing_key.verifying_key()
        );
    }

    #[test]
    fn rejects_okp() {
        let okp = Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(1.into())),
            (Value::Integer((-1).into()), Value::Integer(6.into())),
            (Value::Integer((-2).into()), Value::Bytes(vec![0; 32])),
        ]);
        assert!(matches!(
            CoseKey::try_from(okp),
            Err(Error::UnsupportedKeyType)
        ));
    }
}
