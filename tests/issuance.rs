mod common;

use anyhow::Result;
use ciborium::Value;
use p256::ecdsa::SigningKey;

use mdltools::cbor;
use mdltools::definitions::{DigestAlgorithm, FullDate};
use mdltools::issuance::{digest::ElementTags, Error, MdocBuilder};
use mdltools::presentation::Mdoc;

use common::NAMESPACE;

fn without(names: &[&str]) -> serde_json::Map<String, serde_json::Value> {
    common::smith_john()
        .into_iter()
        .filter(|(name, _)| !names.contains(&name.as_str()))
        .collect()
}

fn device_key() -> SigningKey {
    SigningKey::random(&mut rand::thread_rng())
}

#[test]
fn decoded_attributes_match_issued_ones() -> Result<()> {
    let (bytes, _) = common::issue_smith_john()?;
    let mdoc = Mdoc::decode(&bytes)?;

    for (name, json) in common::smith_john() {
        let expected = match name.as_str() {
            "portrait" => Value::Bytes(base64::decode_config(
                json.as_str().unwrap(),
                base64::URL_SAFE_NO_PAD,
            )?),
            _ => cbor::from_json(&json),
        };
        assert_eq!(mdoc.get(&name), Some(&expected), "{name}");
    }
    assert_eq!(mdoc.get("family_name"), Some(&Value::Text("Smith".into())));
    assert_eq!(mdoc.get("age_over_21"), Some(&Value::Bool(true)));
    Ok(())
}

#[test]
fn age_over_flags() -> Result<()> {
    let (bytes, _) = common::issue_smith_john()?;
    let mdoc = Mdoc::decode(&bytes)?;
    let age_over: Vec<(&str, &Value)> = mdoc
        .attributes()
        .iter()
        .filter(|(name, _)| name.starts_with("age_over_"))
        .map(|(name, value)| (name.as_str(), value))
        .collect();
    assert_eq!(
        age_over,
        vec![
            ("age_over_21", &Value::Bool(true)),
            ("age_over_43", &Value::Bool(true)),
        ]
    );
    assert_eq!(mdoc.mdl()?.age_over(43), Some(true));
    Ok(())
}

#[test]
fn attributes_in_schema_order() -> Result<()> {
    let device_key = device_key();
    let mut builder = common::builder(&device_key)?;
    let mut reordered = serde_json::Map::new();
    reordered.insert("height".into(), 175.into());
    reordered.extend(without(&["family_name", "height"]));
    reordered.insert("family_name".into(), "Smith".into());
    builder.add_namespace_json(NAMESPACE, &reordered)?;
    builder.add_namespace_json(
        "org.example.loyalty",
        serde_json::json!({"points": 12}).as_object().unwrap(),
    )?;
    let mdoc = Mdoc::decode(&builder.save(&common::issuer_key())?)?;

    let names: Vec<&str> = mdoc.attributes().names().collect();
    assert_eq!(&names[..3], &["family_name", "given_name", "birth_date"]);
    assert_eq!(names.last(), Some(&"points"));
    let height = names.iter().position(|n| *n == "height").unwrap();
    let age_over = names.iter().position(|n| *n == "age_over_21").unwrap();
    assert!(height < age_over);
    Ok(())
}

#[test]
fn digests_match_the_signed_mso() -> Result<()> {
    let (bytes, _) = common::issue_smith_john()?;
    let mdoc = Mdoc::decode(&bytes)?;
    mdoc.verify_digests()?;
    mdoc.verify_issuer_signature(common::issuer_key().verifying_key())?;
    assert_eq!(mdoc.x5chain()?.certificates().count(), 1);

    let mso = mdoc.mso()?;
    assert_eq!(mso.doc_type, mdltools::DOC_TYPE);
    assert_eq!(mso.digest_algorithm, DigestAlgorithm::SHA256);
    assert_eq!(mso.value_digests.get(NAMESPACE).unwrap().len(), 15);
    assert_eq!(mso.validity_info.signed, common::ISSUED_AT);
    Ok(())
}

#[test]
fn sha512_digests() -> Result<()> {
    let device_key = device_key();
    let mut builder = common::builder(&device_key)?.digest_algorithm(DigestAlgorithm::SHA512);
    builder.add_namespace_json(NAMESPACE, &common::smith_john())?;
    let mdoc = Mdoc::decode(&builder.save(&common::issuer_key())?)?;
    mdoc.verify_digests()?;
    let mso = mdoc.mso()?;
    for (_, digest) in mso.value_digests.get(NAMESPACE).unwrap().iter() {
        assert_eq!(digest.as_ref().len(), 64);
    }
    Ok(())
}

#[test]
fn dates_are_full_date_tagged() -> Result<()> {
    let (bytes, _) = common::issue_smith_john()?;
    let mdoc = Mdoc::decode(&bytes)?;
    let items = mdoc.issuer_signed().namespaces.get(NAMESPACE).unwrap();
    let birth_date = items
        .iter()
        .find(|item| item.as_ref().element_identifier == "birth_date")
        .unwrap();
    assert_eq!(
        birth_date.as_ref().element_value,
        Value::from(FullDate::from(time::macros::date!(1980 - 06 - 15)))
    );
    Ok(())
}

#[test]
fn unsupported_tag_issues_nothing() -> Result<()> {
    let device_key = device_key();
    let mut builder = common::builder(&device_key)?
        .element_tags(ElementTags::default().register("document_number", 0));
    let result = builder.add_namespace_json(NAMESPACE, &common::smith_john());
    assert!(matches!(
        result,
        Err(Error::UnsupportedEncoding { ref element, tag: 0 }) if element == "document_number"
    ));
    assert!(matches!(
        builder.save(&common::issuer_key()),
        Err(Error::MissingParameter("namespaces"))
    ));
    Ok(())
}

#[test]
fn validation_lists_every_offending_field() -> Result<()> {
    let device_key = device_key();
    let mut builder = common::builder(&device_key)?;
    let mut elements = without(&["given_name", "portrait"]);
    elements.insert("height".into(), "tall".into());
    elements.insert("favourite_colour".into(), "blue".into());

    match builder.add_namespace_json(NAMESPACE, &elements) {
        Err(Error::Validation(report)) => {
            for element in ["given_name", "portrait", "height", "favourite_colour"] {
                assert!(report.get(element).is_some(), "{element} should be reported");
            }
        }
        other => panic!("expected a validation error, got {other:?}"),
    }

    let mut builder = common::builder(&device_key)?.validation(false);
    builder.add_namespace_json(NAMESPACE, &elements)?;
    Ok(())
}

#[test]
fn builder_requires_configuration() {
    let mut builder = MdocBuilder::new();
    builder
        .add_namespace_json(NAMESPACE, &common::smith_john())
        .unwrap();
    assert!(matches!(
        builder.save(&common::issuer_key()),
        Err(Error::MissingParameter("x5chain"))
    ));
}
