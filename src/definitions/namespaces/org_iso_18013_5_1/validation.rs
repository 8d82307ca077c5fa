//! Schema validation of the elements supplied for the org.iso.18013.5.1 namespace.
use std::fmt;

use ciborium::Value;
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime};

use super::{age_over, driving_privileges, field, is_biometric_template, ElementEncoding, FIELDS};
use crate::cbor::{TAG_FULL_DATE, TAG_TDATE};
use crate::definitions::FullDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Missing,
    WrongType { expected: ElementEncoding },
    InvalidValue(String),
    Undeclared,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Violation::Missing => write!(f, "required element is missing"),
            Violation::WrongType { expected } => write!(f, "expected {expected}"),
            Violation::InvalidValue(reason) => write!(f, "invalid value: {reason}"),
            Violation::Undeclared => write!(f, "element is not part of the namespace"),
        }
    }
}

/// Every offending element, in the order it was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<(String, Violation)>,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} invalid element(s):", self.violations.len())?;
        for (element, violation) in &self.violations {
            write!(f, " {element} ({violation});")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

impl ValidationReport {
    pub fn get(&self, element: &str) -> Option<&Violation> {
        self.violations
            .iter()
            .find(|(e, _)| e == element)
            .map(|(_, v)| v)
    }

    fn push(&mut self, element: &str, violation: Violation) {
        self.violations.push((element.to_string(), violation));
    }
}

/// Check the elements against the namespace schema.
///
/// `today` bounds the birth date. Elements may be given as plain values or already carrying their
/// date tag.
pub fn validate(elements: &[(String, Value)], today: Date) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();

    for spec in FIELDS.iter().filter(|spec| spec.required) {
        if !elements.iter().any(|(name, _)| name == spec.identifier) {
            report.push(spec.identifier, Violation::Missing);
        }
    }

    for (name, value) in elements {
        let encoding = if let Some(spec) = field(name) {
            spec.encoding
        } else if age_over::parse(name).is_some() {
            ElementEncoding::Bool
        } else if is_biometric_template(name) {
            ElementEncoding::ByteString
        } else {
            report.push(name, Violation::Undeclared);
            continue;
        };
        if let Err(violation) = check(encoding, value) {
            report.push(name, violation);
            continue;
        }
        if name == "birth_date" {
            if let Ok(birth_date) = FullDate::try_from(value) {
                if birth_date.date() > today {
                    report.push(
                        name,
                        Violation::InvalidValue(format!("{birth_date} is in the future")),
                    );
                }
            }
        }
    }

    if report.violations.is_empty() {
        Ok(())
    } else {
        Err(report)
    }
}

fn check(encoding: ElementEncoding, value: &Value) -> Result<(), Violation> {
    let wrong_type = Violation::WrongType { expected: encoding };
    match encoding {
        ElementEncoding::TextString if value.is_text() => Ok(()),
        ElementEncoding::ByteString if value.is_bytes() => Ok(()),
        ElementEncoding::Bool if value.is_bool() => Ok(()),
        ElementEncoding::UnsignedInt => match value.as_integer() {
            Some(i) if u64::try_from(i).is_ok() => Ok(()),
            _ => Err(wrong_type),
        },
        ElementEncoding::FullDate => match untag(value, TAG_FULL_DATE) {
            Some(Value::Text(s)) => s
                .parse::<FullDate>()
                .map(|_| ())
                .map_err(|_| Violation::InvalidValue(format!("'{s}' is not a YYYY-MM-DD date"))),
            _ => Err(wrong_type),
        },
        ElementEncoding::TDate => match untag(value, TAG_TDATE) {
            Some(Value::Text(s)) => OffsetDateTime::parse(s, &Rfc3339)
                .map(|_| ())
                .map_err(|_| Violation::InvalidValue(format!("'{s}' is not an RFC 3339 date-time"))),
            _ => Err(wrong_type),
        },
        ElementEncoding::DrivingPrivileges => {
            if !value.is_array() {
                return Err(wrong_type);
            }
            driving_privileges::parse(value)
                .map(|_| ())
                .map_err(|e| Violation::InvalidValue(e.to_string()))
        }
        _ => Err(wrong_type),
    }
}

fn untag(value: &Value, tag: u64) -> Option<&Value> {
    match value {
        Value::Tag(t, inner) if *t == tag => Some(inner),
        Value::Tag(..) => None,
        other => Some(other),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cbor;
    use time::macros::date;

    fn elements(json: serde_json::Value) -> Vec<(String, Value)> {
        cbor::from_json(&json)
            .into_map()
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.into_text().unwrap(), v))
            .collect()
    }

    fn complete() -> serde_json::Value {
        serde_json::json!({
            "family_name": "Smith",
            "given_name": "John",
            "birth_date": "1980-06-15",
            "issue_date": "2023-03-01",
            "expiry_date": "2028-03-31",
            "issuing_country": "US",
            "issuing_authority": "NY DMV",
            "document_number": "01-856-5050",
            "driving_privileges": [{"vehicle_category_code": "C"}],
            "un_distinguishing_sign": "USA",
            "sex": 1,
            "age_over_18": true
        })
    }

    fn with_portrait(json: serde_json::Value) -> Vec<(String, Value)> {
        let mut elements = elements(json);
        elements.push(("portrait".into(), Value::Bytes(vec![0xff, 0xd8])));
        elements
    }

    #[test]
    fn accepts_complete_set() {
        validate(&with_portrait(complete()), date!(2023 - 03 - 01)).unwrap();
    }

    #[test]
    fn reports_every_violation() {
        let mut json = complete();
        json["sex"] = "male".into();
        json["birth_date"] = "15/06/1980".into();
        json["favourite_colour"] = "green".into();
        json.as_object_mut().unwrap().remove("given_name");

        let report = validate(&with_portrait(json), date!(2023 - 03 - 01)).unwrap_err();
        assert_eq!(report.violations.len(), 4);
        assert_eq!(report.get("given_name"), Some(&Violation::Missing));
        assert_eq!(
            report.get("sex"),
            Some(&Violation::WrongType {
                expected: ElementEncoding::UnsignedInt
            })
        );
        assert!(matches!(
            report.get("birth_date"),
            Some(Violation::InvalidValue(_))
        ));
        assert_eq!(report.get("favourite_colour"), Some(&Violation::Undeclared));
    }

    #[test]
    fn portrait_must_be_bytes() {
        let mut json = complete();
        json["portrait"] = "not bytes".into();
        let report = validate(&elements(json), date!(2023 - 03 - 01)).unwrap_err();
        assert_eq!(
            report.get("portrait"),
            Some(&Violation::WrongType {
                expected: ElementEncoding::ByteString
            })
        );
    }

    #[test]
    fn birth_date_in_future() {
        let mut json = complete();
        json["birth_date"] = "2030-01-01".into();
        let report = validate(&with_portrait(json), date!(2023 - 03 - 01)).unwrap_err();
        assert!(matches!(
            report.get("birth_date"),
            Some(Violation::InvalidValue(_))
        ));
    }

    #[test]
    fn tagged_dates_are_accepted() {
        let mut elements = with_portrait(complete());
        for (name, value) in elements.iter_mut() {
            if name == "birth_date" {
                *value = Value::Tag(1004, Box::new(value.clone()));
            }
        }
        validate(&elements, date!(2023 - 03 - 01)).unwrap();
    }
}
