//! The `org.iso.18013.5.1` namespace of the mobile driving licence.
//!
//! [FIELDS] is the schema of the namespace. Its order is the canonical order in which decoded
//! attributes are presented. `age_over_NN` and `biometric_template_xx` are families of elements
//! recognised by pattern rather than listed.
pub mod age_over;
pub mod driving_privileges;
pub mod validation;

use ciborium::Value;
use strum_macros::Display;

use crate::cbor;
use crate::definitions::{helpers::ByteStr, FullDate};

pub use driving_privileges::{Code, DrivingPrivilege};
pub use validation::{validate, ValidationReport, Violation};

pub const NAMESPACE: &str = "org.iso.18013.5.1";
pub const DOC_TYPE: &str = "org.iso.18013.5.1.mDL";

const BIOMETRIC_TEMPLATE_PREFIX: &str = "biometric_template_";

/// CBOR encoding expected for an element value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ElementEncoding {
    #[strum(serialize = "tstr")]
    TextString,
    #[strum(serialize = "bstr")]
    ByteString,
    #[strum(serialize = "uint")]
    UnsignedInt,
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "full-date")]
    FullDate,
    #[strum(serialize = "tdate")]
    TDate,
    #[strum(serialize = "DrivingPrivileges")]
    DrivingPrivileges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub identifier: &'static str,
    pub required: bool,
    pub encoding: ElementEncoding,
}

const fn required(identifier: &'static str, encoding: ElementEncoding) -> FieldSpec {
    FieldSpec {
        identifier,
        required: true,
        encoding,
    }
}

const fn optional(identifier: &'static str, encoding: ElementEncoding) -> FieldSpec {
    FieldSpec {
        identifier,
        required: false,
        encoding,
    }
}

use ElementEncoding as Enc;

pub const FIELDS: &[FieldSpec] = &[
    required("family_name", Enc::TextString),
    required("given_name", Enc::TextString),
    required("birth_date", Enc::FullDate),
    required("issue_date", Enc::FullDate),
    required("expiry_date", Enc::FullDate),
    required("issuing_country", Enc::TextString),
    required("issuing_authority", Enc::TextString),
    required("document_number", Enc::TextString),
    required("portrait", Enc::ByteString),
    required("driving_privileges", Enc::DrivingPrivileges),
    required("un_distinguishing_sign", Enc::TextString),
    optional("administrative_number", Enc::TextString),
    // ISO/IEC 5218
    optional("sex", Enc::UnsignedInt),
    // cm
    optional("height", Enc::UnsignedInt),
    // kg
    optional("weight", Enc::UnsignedInt),
    optional("eye_colour", Enc::TextString),
    optional("hair_colour", Enc::TextString),
    optional("birth_place", Enc::TextString),
    optional("resident_address", Enc::TextString),
    optional("portrait_capture_date", Enc::TDate),
    optional("age_in_years", Enc::UnsignedInt),
    optional("age_birth_year", Enc::UnsignedInt),
    optional("issuing_jurisdiction", Enc::TextString),
    optional("nationality", Enc::TextString),
    optional("resident_city", Enc::TextString),
    optional("resident_state", Enc::TextString),
    optional("resident_postal_code", Enc::TextString),
    optional("resident_country", Enc::TextString),
    optional("family_name_national_character", Enc::TextString),
    optional("given_name_national_character", Enc::TextString),
    optional("signature_usual_mark", Enc::ByteString),
];

/// Schema entry of a listed element.
pub fn field(identifier: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.identifier == identifier)
}

pub fn is_biometric_template(identifier: &str) -> bool {
    identifier
        .strip_prefix(BIOMETRIC_TEMPLATE_PREFIX)
        .map_or(false, |suffix| !suffix.is_empty())
}

fn expects_bytes(identifier: &str) -> bool {
    is_biometric_template(identifier)
        || field(identifier).map_or(false, |spec| spec.encoding == Enc::ByteString)
}

/// Convert a JSON element value into CBOR for this namespace.
///
/// JSON has no byte strings: text given for a `bstr` element is read as base64 (URL-safe or
/// standard alphabet).
pub fn element_from_json(identifier: &str, json: &serde_json::Value) -> Value {
    if let serde_json::Value::String(s) = json {
        if expects_bytes(identifier) {
            let decoded = base64::decode_config(s, base64::URL_SAFE_NO_PAD)
                .or_else(|_| base64::decode(s));
            if let Ok(bytes) = decoded {
                return Value::Bytes(bytes);
            }
        }
    }
    cbor::from_json(json)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing element: {0}")]
    Missing(&'static str),
    #[error("element {0} does not have the expected type")]
    Invalid(String),
    #[error(transparent)]
    DrivingPrivileges(#[from] driving_privileges::Error),
}

/// Typed view of the org.iso.18013.5.1 elements of an mDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgIso18013_5_1 {
    pub family_name: String,
    pub given_name: String,
    pub birth_date: FullDate,
    pub issue_date: FullDate,
    pub expiry_date: FullDate,
    pub issuing_country: String,
    pub issuing_authority: String,
    pub document_number: String,
    pub portrait: ByteStr,
    pub driving_privileges: Vec<DrivingPrivilege>,
    pub un_distinguishing_sign: String,
    pub administrative_number: Option<String>,
    pub sex: Option<u64>,
    pub height: Option<u64>,
    pub weight: Option<u64>,
    pub eye_colour: Option<String>,
    pub hair_colour: Option<String>,
    pub birth_place: Option<String>,
    pub resident_address: Option<String>,
    pub portrait_capture_date: Option<String>,
    pub age_in_years: Option<u64>,
    pub age_birth_year: Option<u64>,
    /// `(NN, value)` for every `age_over_NN` element, by ascending age.
    pub age_over: Vec<(u8, bool)>,
    pub issuing_jurisdiction: Option<String>,
    pub nationality: Option<String>,
    pub resident_city: Option<String>,
    pub resident_state: Option<String>,
    pub resident_postal_code: Option<String>,
    pub resident_country: Option<String>,
    pub biometric_templates: Vec<(String, ByteStr)>,
    pub family_name_national_character: Option<String>,
    pub given_name_national_character: Option<String>,
    pub signature_usual_mark: Option<ByteStr>,
}

struct Elements<'a>(&'a [(String, Value)]);

impl<'a> Elements<'a> {
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn require(&self, name: &'static str) -> Result<&'a Value, Error> {
        self.get(name).ok_or(Error::Missing(name))
    }

    fn text(&self, name: &'static str) -> Result<Option<String>, Error> {
        self.get(name)
            .map(|v| {
                v.as_text()
                    .map(str::to_string)
                    .ok_or_else(|| Error::Invalid(name.to_string()))
            })
            .transpose()
    }

    fn required_text(&self, name: &'static str) -> Result<String, Error> {
        self.text(name)?.ok_or(Error::Missing(name))
    }

    fn uint(&self, name: &'static str) -> Result<Option<u64>, Error> {
        self.get(name)
            .map(|v| {
                v.as_integer()
                    .and_then(|i| u64::try_from(i).ok())
                    .ok_or_else(|| Error::Invalid(name.to_string()))
            })
            .transpose()
    }

    fn bytes(&self, name: &'static str) -> Result<Option<ByteStr>, Error> {
        self.get(name)
            .map(|v| {
                v.as_bytes()
                    .map(|b| ByteStr::from(b.clone()))
                    .ok_or_else(|| Error::Invalid(name.to_string()))
            })
            .transpose()
    }

    fn date(&self, name: &'static str) -> Result<FullDate, Error> {
        FullDate::try_from(self.require(name)?).map_err(|_| Error::Invalid(name.to_string()))
    }

    /// Date-time elements read as their text, whether tagged or not.
    fn tdate(&self, name: &'static str) -> Result<Option<String>, Error> {
        self.get(name)
            .map(|v| match v {
                Value::Tag(_, inner) => inner.as_text(),
                other => other.as_text(),
            })
            .map(|t| {
                t.map(str::to_string)
                    .ok_or_else(|| Error::Invalid(name.to_string()))
            })
            .transpose()
    }
}

impl OrgIso18013_5_1 {
    /// Build the typed view from the elements of the namespace.
    pub fn from_attributes(elements: &[(String, Value)]) -> Result<Self, Error> {
        let e = Elements(elements);

        let mut age_over = Vec::new();
        let mut biometric_templates = Vec::new();
        for (name, value) in elements {
            if let Some(age) = age_over::parse(name) {
                let flag = value
                    .as_bool()
                    .ok_or_else(|| Error::Invalid(name.clone()))?;
                age_over.push((age, flag));
            } else if is_biometric_template(name) {
                let bytes = value
                    .as_bytes()
                    .ok_or_else(|| Error::Invalid(name.clone()))?;
                biometric_templates.push((name.clone(), ByteStr::from(bytes.clone())));
            }
        }
        age_over.sort_by_key(|(age, _)| *age);

        Ok(Self {
            family_name: e.required_text("family_name")?,
            given_name: e.required_text("given_name")?,
            birth_date: e.date("birth_date")?,
            issue_date: e.date("issue_date")?,
            expiry_date: e.date("expiry_date")?,
            issuing_country: e.required_text("issuing_country")?,
            issuing_authority: e.required_text("issuing_authority")?,
            document_number: e.required_text("document_number")?,
            portrait: e.bytes("portrait")?.ok_or(Error::Missing("portrait"))?,
            driving_privileges: driving_privileges::parse(e.require("driving_privileges")?)?,
            un_distinguishing_sign: e.required_text("un_distinguishing_sign")?,
            administrative_number: e.text("administrative_number")?,
            sex: e.uint("sex")?,
            height: e.uint("height")?,
            weight: e.uint("weight")?,
            eye_colour: e.text("eye_colour")?,
            hair_colour: e.text("hair_colour")?,
            birth_place: e.text("birth_place")?,
            resident_address: e.text("resident_address")?,
            portrait_capture_date: e.tdate("portrait_capture_date")?,
            age_in_years: e.uint("age_in_years")?,
            age_birth_year: e.uint("age_birth_year")?,
            age_over,
            issuing_jurisdiction: e.text("issuing_jurisdiction")?,
            nationality: e.text("nationality")?,
            resident_city: e.text("resident_city")?,
            resident_state: e.text("resident_state")?,
            resident_postal_code: e.text("resident_postal_code")?,
            resident_country: e.text("resident_country")?,
            biometric_templates,
            family_name_national_character: e.text("family_name_national_character")?,
            given_name_national_character: e.text("given_name_national_character")?,
            signature_usual_mark: e.bytes("signature_usual_mark")?,
        })
    }

    /// Whether the holder is attested to be at least `age` years old, if the mDL says so.
    pub fn age_over(&self, age: u8) -> Option<bool> {
        self.age_over
            .iter()
            .find(|(nn, _)| *nn == age)
            .map(|(_, flag)| *flag)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn schema_lookup() {
        assert_eq!(
            field("portrait").map(|f| f.encoding),
            Some(ElementEncoding::ByteString)
        );
        assert!(field("family_name").unwrap().required);
        assert!(!field("height").unwrap().required);
        assert!(field("age_over_21").is_none());
        assert!(is_biometric_template("biometric_template_face"));
        assert!(!is_biometric_template("biometric_template_"));
    }

    #[test]
    fn bytes_from_base64() {
        let json = serde_json::json!("_9j_4A");
        assert_eq!(
            element_from_json("portrait", &json),
            Value::Bytes(vec![0xff, 0xd8, 0xff, 0xe0])
        );
        assert_eq!(
            element_from_json("family_name", &json),
            Value::Text("_9j_4A".into())
        );
    }

    #[test]
    fn typed_view() {
        let json = serde_json::json!({
            "family_name": "Smith",
            "given_name": "John",
            "birth_date": "1980-06-15",
            "issue_date": "2023-03-01",
            "expiry_date": "2028-03-31",
            "issuing_country": "US",
            "issuing_authority": "NY DMV",
            "document_number": "01-856-5050",
            "portrait": "_9j_4A",
            "driving_privileges": [{"vehicle_category_code": "C"}],
            "un_distinguishing_sign": "USA",
            "height": 180,
            "age_over_21": true,
            "age_over_18": true,
            "age_over_65": false
        });
        let elements: Vec<(String, Value)> = json
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), element_from_json(k, v)))
            .collect();
        let mdl = OrgIso18013_5_1::from_attributes(&elements).unwrap();
        assert_eq!(mdl.family_name, "Smith");
        assert_eq!(mdl.birth_date.to_string(), "1980-06-15");
        assert_eq!(mdl.height, Some(180));
        assert_eq!(mdl.portrait.as_ref(), &[0xff, 0xd8, 0xff, 0xe0]);
        assert_eq!(mdl.age_over, vec![(18, true), (21, true), (65, false)]);
        assert_eq!(mdl.age_over(65), Some(false));
        assert_eq!(mdl.driving_privileges[0].vehicle_category_code, "C");
        assert_eq!(mdl.sex, None);
    }

    #[test]
    fn typed_view_requires_core_fields() {
        let elements = vec![("family_name".to_string(), Value::Text("Smith".into()))];
        assert!(matches!(
            OrgIso18013_5_1::from_attributes(&elements),
            Err(Error::Missing("given_name"))
        ));
    }
}
