//! This module contains the definition of the [IssuerSigned] struct and related types.
//!
//! [IssuerSigned] carries the disclosed [IssuerSignedItem]s of each namespace, each wrapped in a
//! [Tag24] so that the exact digested bytes travel with the item, together with the
//! `issuerAuth` COSE_Sign1 over the MSO.
use ciborium::Value;
use coset::{AsCborValue, CborSerializable, CoseSign1};

use crate::cbor;
use crate::definitions::{
    helpers::{ByteStr, Tag24},
    DigestId,
};

/// Represents an issuer-signed object.
#[derive(Clone, Debug, PartialEq)]
pub struct IssuerSigned {
    pub namespaces: IssuerNamespaces,
    pub issuer_auth: CoseSign1,
}

pub type IssuerSignedItemBytes = Tag24<IssuerSignedItem>;

/// Represents an item signed by the issuer.
#[derive(Clone, Debug, PartialEq)]
pub struct IssuerSignedItem {
    /// The ID of the digest used for signing.
    pub digest_id: DigestId,

    /// Random bytes associated with the signed item.
    pub random: ByteStr,

    /// The identifier of the element.
    pub element_identifier: String,

    /// The value of the element.
    pub element_value: Value,
}

/// `nameSpaces` of [IssuerSigned]: the items of each namespace, both in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IssuerNamespaces(Vec<(String, Vec<IssuerSignedItemBytes>)>);

impl IssuerNamespaces {
    pub fn get(&self, namespace: &str) -> Option<&[IssuerSignedItemBytes]> {
        self.0
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, items)| items.as_slice())
    }

    /// Set the items of a namespace, replacing any earlier entry at its original position.
    pub fn insert(&mut self, namespace: String, items: Vec<IssuerSignedItemBytes>) {
        match self.0.iter_mut().find(|(ns, _)| *ns == namespace) {
            Some(entry) => entry.1 = items,
            None => self.0.push((namespace, items)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Vec<IssuerSignedItemBytes>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl CborSerializable for IssuerSignedItem {}
impl AsCborValue for IssuerSignedItem {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "IssuerSignedItem")?;
        Ok(Self {
            digest_id: cbor::into_u64(cbor::require(&mut map, "digestID", "digestID")?, "digestID")?,
            random: ByteStr::from_cbor_value(cbor::require(&mut map, "random", "random")?)?,
            element_identifier: cbor::into_text(
                cbor::require(&mut map, "elementIdentifier", "elementIdentifier")?,
                "elementIdentifier",
            )?,
            element_value: cbor::require(&mut map, "elementValue", "elementValue")?,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(vec![
            (cbor::text("digestID"), Value::Integer(self.digest_id.into())),
            (cbor::text("random"), self.random.into()),
            (
                cbor::text("elementIdentifier"),
                Value::Text(self.element_identifier),
            ),
            (cbor::text("elementValue"), self.element_value),
        ]))
    }
}

impl AsCborValue for IssuerNamespaces {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        cbor::into_map(value, "IssuerNameSpaces")?
            .into_iter()
            .map(|(ns, items)| {
                let items = cbor::into_array(items, "IssuerSignedItemBytes")?
                    .into_iter()
                    .map(IssuerSignedItemBytes::from_cbor_value)
                    .collect::<coset::Result<Vec<_>>>()?;
                Ok((cbor::into_text(ns, "NameSpace")?, items))
            })
            .collect::<coset::Result<_>>()
            .map(IssuerNamespaces)
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(
            self.0
                .into_iter()
                .map(|(ns, items)| {
                    (
                        Value::Text(ns),
                        Value::Array(items.into_iter().map(Value::from).collect()),
                    )
                })
                .collect(),
        ))
    }
}

impl CborSerializable for IssuerSigned {}
impl AsCborValue for IssuerSigned {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "IssuerSigned")?;
        let namespaces = cbor::take(&mut map, "nameSpaces")
            .map(IssuerNamespaces::from_cbor_value)
            .transpose()?
            .unwrap_or_default();
        let issuer_auth =
            CoseSign1::from_cbor_value(cbor::require(&mut map, "issuerAuth", "issuerAuth")?)?;
        Ok(Self {
            namespaces,
            issuer_auth,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        let mut map = Vec::with_capacity(2);
        if !self.namespaces.is_empty() {
            map.push((
                cbor::text("nameSpaces"),
                self.namespaces.to_cbor_value()?,
            ));
        }
        map.push((cbor::text("issuerAuth"), self.issuer_auth.to_cbor_value()?));
        Ok(Value::Map(map))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn item(id: DigestId, name: &str, value: Value) -> IssuerSignedItemBytes {
        Tag24::new(IssuerSignedItem {
            digest_id: id,
            random: vec![7u8; 32].into(),
            element_identifier: name.into(),
            element_value: value,
        })
        .unwrap()
    }

    #[test]
    fn item_key_order() {
        let bytes = item(0, "family_name", Value::Text("Smith".into())).inner_bytes;
        let value: Value = cbor::from_slice(&bytes).unwrap();
        let keys: Vec<String> = value
            .into_map()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k.into_text().unwrap())
            .collect();
        assert_eq!(
            keys,
            vec!["digestID", "random", "elementIdentifier", "elementValue"]
        );
    }

    #[test]
    fn issuer_signed_roundtrip() {
        let mut namespaces = IssuerNamespaces::default();
        namespaces.insert(
            "org.iso.18013.5.1".into(),
            vec![
                item(0, "family_name", Value::Text("Smith".into())),
                item(1, "given_name", Value::Text("John".into())),
            ],
        );
        namespaces.insert(
            "org.example.ns".into(),
            vec![item(0, "member", Value::Bool(true))],
        );
        let issuer_signed = IssuerSigned {
            namespaces,
            issuer_auth: coset::CoseSign1Builder::new()
                .payload(vec![1, 2, 3])
                .signature(vec![4, 5, 6])
                .build(),
        };
        let bytes = issuer_signed.clone().to_vec().unwrap();
        let decoded = IssuerSigned::from_slice(&bytes).unwrap();
        assert_eq!(decoded, issuer_signed);
        assert_eq!(decoded.clone().to_vec().unwrap(), bytes);
        let names: Vec<&str> = decoded.namespaces.iter().map(|(ns, _)| ns.as_str()).collect();
        assert_eq!(names, vec!["org.iso.18013.5.1", "org.example.ns"]);
    }
}
