//! Salted digests of individual elements.
//!
//! Each element becomes an `IssuerSignedItem` with a fresh 32 byte salt. Its digest is taken over
//! the tag-24 wrapped encoding, the exact bytes that are later disclosed.
use ciborium::Value;
use time::{OffsetDateTime, Time};

use crate::cbor::TAG_FULL_DATE;
use crate::crypto::CryptoProvider;
use crate::definitions::{
    helpers::{ByteStr, Tag24},
    namespaces::org_iso_18013_5_1::age_over,
    DigestAlgorithm, DigestId, FullDate, IssuerSignedItem, IssuerSignedItemBytes,
};
use crate::issuance::Error;

/// Length of the salt of every element.
pub const SALT_LEN: usize = 32;

/// Age of majority attested for every holder with a birth date.
pub const AGE_OF_MAJORITY: u64 = 21;

const SECONDS_PER_YEAR: i64 = 365 * 24 * 60 * 60;

/// Tags applied to element values before they are digested, keyed by element identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementTags(Vec<(String, u64)>);

impl Default for ElementTags {
    /// The full-date elements of the mDL namespace.
    fn default() -> Self {
        Self::empty()
            .register("birth_date", TAG_FULL_DATE)
            .register("issue_date", TAG_FULL_DATE)
            .register("expiry_date", TAG_FULL_DATE)
    }
}

impl ElementTags {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn register(mut self, element: impl Into<String>, tag: u64) -> Self {
        let element = element.into();
        match self.0.iter_mut().find(|(e, _)| *e == element) {
            Some(entry) => entry.1 = tag,
            None => self.0.push((element, tag)),
        }
        self
    }

    pub fn tag_of(&self, element: &str) -> Option<u64> {
        self.0.iter().find(|(e, _)| e == element).map(|(_, t)| *t)
    }

    /// Apply the registered tag of `element` to `value`.
    ///
    /// Only the full-date tag (1004) can be applied; any other registration fails.
    pub fn maybe_encode_value(&self, element: &str, value: Value) -> Result<Value, Error> {
        match self.tag_of(element) {
            None => Ok(value),
            Some(TAG_FULL_DATE) => match value {
                Value::Tag(TAG_FULL_DATE, _) => Ok(value),
                Value::Text(ref s) => {
                    let date: FullDate = s
                        .parse()
                        .map_err(|_| Error::InvalidFullDate(element.to_string()))?;
                    Ok(date.into())
                }
                _ => Err(Error::InvalidFullDate(element.to_string())),
            },
            Some(tag) => Err(Error::UnsupportedEncoding {
                element: element.to_string(),
                tag,
            }),
        }
    }
}

/// Whole years elapsed between midnight UTC of `birth_date` and `at`, counting 365 day years.
pub fn age_in_years(birth_date: FullDate, at: OffsetDateTime) -> i64 {
    let birth = birth_date.date().with_time(Time::MIDNIGHT).assume_utc();
    (at - birth).whole_seconds().div_euclid(SECONDS_PER_YEAR)
}

/// Elements derived from the birth date: `age_over_21` and `age_over_{age}`.
///
/// `age_over_21` holds whether the holder is 21 or older, `age_over_{age}` is always true. When
/// the holder is exactly 21 only one element is produced. No element is produced for a birth date
/// in the future.
pub fn derive_age_over(birth_date: FullDate, at: OffsetDateTime) -> Vec<(String, Value)> {
    let age = age_in_years(birth_date, at);
    let Ok(age) = u64::try_from(age) else {
        return Vec::new();
    };
    let mut derived = vec![(
        age_over::identifier(AGE_OF_MAJORITY),
        Value::Bool(age >= AGE_OF_MAJORITY),
    )];
    if age != AGE_OF_MAJORITY {
        derived.push((age_over::identifier(age), Value::Bool(true)));
    }
    derived
}

/// Salt, tag and digest one element.
pub fn process_attribute<C: CryptoProvider + ?Sized>(
    crypto: &C,
    digest_algorithm: DigestAlgorithm,
    tags: &ElementTags,
    digest_id: DigestId,
    element_identifier: String,
    element_value: Value,
) -> Result<(IssuerSignedItemBytes, ByteStr), Error> {
    let element_value = tags.maybe_encode_value(&element_identifier, element_value)?;
    let item = Tag24::new(IssuerSignedItem {
        digest_id,
        random: crypto.random_bytes(SALT_LEN)?.into(),
        element_identifier,
        element_value,
    })?;
    let digest = digest_item(crypto, digest_algorithm, &item)?;
    Ok((item, digest))
}

/// `digest(#6.24(bstr .cbor IssuerSignedItem))`.
pub fn digest_item<C: CryptoProvider + ?Sized>(
    crypto: &C,
    digest_algorithm: DigestAlgorithm,
    item: &IssuerSignedItemBytes,
) -> Result<ByteStr, Error> {
    Ok(crypto
        .hash(digest_algorithm, &item.tagged_bytes()?)?
        .into())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::OsCrypto;
    use sha2::{Digest, Sha256};
    use time::macros::datetime;

    fn date(s: &str) -> FullDate {
        s.parse().unwrap()
    }

    #[test]
    fn full_date_elements_are_tagged() {
        let tags = ElementTags::default();
        assert_eq!(
            tags.maybe_encode_value("birth_date", Value::Text("1980-06-15".into()))
                .unwrap(),
            Value::Tag(1004, Box::new(Value::Text("1980-06-15".into())))
        );
        assert_eq!(
            tags.maybe_encode_value("family_name", Value::Text("Smith".into()))
                .unwrap(),
            Value::Text("Smith".into())
        );
        assert!(matches!(
            tags.maybe_encode_value("issue_date", Value::Integer(1.into())),
            Err(Error::InvalidFullDate(_))
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let tags = ElementTags::default().register("portrait_capture_date", 0);
        assert!(matches!(
            tags.maybe_encode_value("portrait_capture_date", Value::Text("2023-03-01T00:00:00Z".into())),
            Err(Error::UnsupportedEncoding { tag: 0, .. })
        ));
    }

    #[test]
    fn age_uses_365_day_years() {
        let at = datetime!(2023-06-15 12:00 UTC);
        assert_eq!(age_in_years(date("1980-06-15"), at), 43);
        // Leap days push the 365 day anniversary earlier than the calendar one.
        assert_eq!(age_in_years(date("1980-06-25"), at), 43);
        assert_eq!(age_in_years(date("1980-07-15"), at), 42);
    }

    #[test]
    fn age_over_pair() {
        let derived = derive_age_over(date("1980-06-15"), datetime!(2023-06-15 12:00 UTC));
        assert_eq!(
            derived,
            vec![
                ("age_over_21".to_string(), Value::Bool(true)),
                ("age_over_43".to_string(), Value::Bool(true)),
            ]
        );
    }

    #[test]
    fn minor_is_not_over_21() {
        let derived = derive_age_over(date("2010-01-01"), datetime!(2023-06-15 12:00 UTC));
        assert_eq!(
            derived,
            vec![
                ("age_over_21".to_string(), Value::Bool(false)),
                ("age_over_13".to_string(), Value::Bool(true)),
            ]
        );
    }

    #[test]
    fn exactly_21_yields_one_element() {
        let derived = derive_age_over(date("2002-01-01"), datetime!(2023-06-15 12:00 UTC));
        assert_eq!(derived, vec![("age_over_21".to_string(), Value::Bool(true))]);
    }

    #[test]
    fn future_birth_date_yields_nothing() {
        assert!(derive_age_over(date("2030-01-01"), datetime!(2023-06-15 12:00 UTC)).is_empty());
    }

    #[test]
    fn very_old_birth_date_still_attests_majority() {
        let derived = derive_age_over(date("1700-01-01"), datetime!(2023-06-15 12:00 UTC));
        assert_eq!(
            derived,
            vec![
                ("age_over_21".to_string(), Value::Bool(true)),
                ("age_over_323".to_string(), Value::Bool(true)),
            ]
        );
    }

    #[test]
    fn digest_covers_tagged_item() {
        let (item, digest) = process_attribute(
            &OsCrypto,
            DigestAlgorithm::SHA256,
            &ElementTags::default(),
            3,
            "birth_date".into(),
            Value::Text("1980-06-15".into()),
        )
        .unwrap();
        assert_eq!(item.as_ref().digest_id, 3);
        assert_eq!(item.as_ref().random.as_ref().len(), SALT_LEN);
        assert_eq!(
            item.as_ref().element_value,
            Value::Tag(1004, Box::new(Value::Text("1980-06-15".into())))
        );

        let mut tagged = vec![0xd8, 0x18];
        let len = item.inner_bytes.len();
        assert!(len > 23 && len < 256);
        tagged.extend([0x58, len as u8]);
        tagged.extend(&item.inner_bytes);
        assert_eq!(digest.as_ref(), Sha256::digest(&tagged).as_slice());
    }

    #[test]
    fn salts_are_fresh() {
        let tags = ElementTags::default();
        let (a, _) = process_attribute(&OsCrypto, DigestAlgorithm::SHA256, &tags, 0, "a".into(), Value::Null).unwrap();
        let (b, _) = process_attribute(&OsCrypto, DigestAlgorithm::SHA256, &tags, 1, "a".into(), Value::Null).unwrap();
        assert_ne!(a.as_ref().random, b.as_ref().random);
    }
}
