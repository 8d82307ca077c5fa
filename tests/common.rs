use anyhow::{Context, Result};
use p256::ecdsa::SigningKey;
use p256::pkcs8::DecodePrivateKey;
use serde_json::json;
use time::{macros::datetime, Duration, OffsetDateTime};

use mdltools::definitions::{Handover, PresentationDefinition};
use mdltools::issuance::{MdocBuilder, X5Chain};

pub const NAMESPACE: &str = "org.iso.18013.5.1";

#[allow(dead_code)]
pub const ISSUED_AT: OffsetDateTime = datetime!(2023-06-15 12:00 UTC);

static ISSUER_CERT: &[u8] = include_bytes!("../test/issuance/256-cert.pem");
static ISSUER_KEY: &str = include_str!("../test/issuance/256-key.pem");

#[allow(dead_code)]
fn main() {}

#[allow(dead_code)]
pub fn issuer_key() -> SigningKey {
    SigningKey::from_pkcs8_pem(ISSUER_KEY).expect("issuer key fixture should parse")
}

/// The elements of John Smith's licence, in issuance order.
#[allow(dead_code)]
pub fn smith_john() -> serde_json::Map<String, serde_json::Value> {
    let json = json!({
        "family_name": "Smith",
        "given_name": "John",
        "birth_date": "1980-06-15",
        "issue_date": "2023-03-01",
        "expiry_date": "2028-03-31",
        "issuing_country": "US",
        "issuing_authority": "NY DMV",
        "document_number": "DL-123456789",
        "portrait": "_9j_4AAQSkZJRg",
        "driving_privileges": [
            {
                "vehicle_category_code": "B",
                "issue_date": "2023-03-01",
                "expiry_date": "2028-03-31"
            }
        ],
        "un_distinguishing_sign": "USA",
        "sex": 1,
        "height": 180
    });
    match json {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// A builder with every required parameter set, issuing for `device_key`.
#[allow(dead_code)]
pub fn builder(device_key: &SigningKey) -> Result<MdocBuilder> {
    let x5chain = X5Chain::builder()
        .with_pem(ISSUER_CERT)
        .context("issuer certificate fixture should parse")?
        .build()?;
    Ok(MdocBuilder::new()
        .validity_period(Duration::days(365))
        .issued_at(ISSUED_AT)
        .device_key(device_key.verifying_key().into())
        .x5chain(x5chain))
}

/// Issue John Smith's licence, returning the mdoc and the key of the device it is bound to.
#[allow(dead_code)]
pub fn issue_smith_john() -> Result<(Vec<u8>, SigningKey)> {
    let device_key = SigningKey::random(&mut rand::thread_rng());
    let mut builder = builder(&device_key)?;
    builder.add_namespace_json(NAMESPACE, &smith_john())?;
    let mdoc = builder.save(&issuer_key())?;
    Ok((mdoc, device_key))
}

/// A definition requesting one element per path from the mDL.
#[allow(dead_code)]
pub fn presentation_definition(paths: &[&str]) -> PresentationDefinition {
    serde_json::from_value(json!({
        "id": "mdl-request",
        "input_descriptors": [
            {
                "id": "org.iso.18013.5.1.mDL",
                "format": {"mso_mdoc": {"alg": ["ES256"]}},
                "constraints": {
                    "limit_disclosure": "required",
                    "fields": paths
                        .iter()
                        .map(|path| json!({"path": [path], "intent_to_retain": false}))
                        .collect::<Vec<_>>()
                }
            }
        ]
    }))
    .expect("presentation definition should deserialize")
}

#[allow(dead_code)]
pub fn handover() -> Handover {
    Handover::oid4vp(
        "mdoc-generated-nonce",
        "verifier.example.com",
        "https://verifier.example.com/response",
        "verifier-nonce",
    )
}
