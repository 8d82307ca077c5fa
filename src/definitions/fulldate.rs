use ciborium::Value;
use std::{fmt, str::FromStr};
use time::{format_description::FormatItem, macros::format_description, Date};

use crate::cbor::TAG_FULL_DATE;

const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// An RFC 8943 `full-date`, encoded as `#6.1004(tstr)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FullDate(Date);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a YYYY-MM-DD date: {0}")]
    Parse(#[from] time::error::Parse),
    #[error("expected a full-date text string, received: '{0:?}'")]
    NotAFullDate(Value),
}

impl FullDate {
    pub fn date(&self) -> Date {
        self.0
    }
}

impl From<Date> for FullDate {
    fn from(d: Date) -> FullDate {
        FullDate(d)
    }
}

impl From<FullDate> for Value {
    fn from(d: FullDate) -> Value {
        Value::Tag(TAG_FULL_DATE, Box::new(Value::Text(d.to_string())))
    }
}

/// Accepts both the tagged form and a bare text string.
impl TryFrom<&Value> for FullDate {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self, Error> {
        match v {
            Value::Tag(TAG_FULL_DATE, inner) => match inner.as_ref() {
                Value::Text(s) => s.parse(),
                _ => Err(Error::NotAFullDate(v.clone())),
            },
            Value::Text(s) => s.parse(),
            _ => Err(Error::NotAFullDate(v.clone())),
        }
    }
}

impl fmt::Display for FullDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            <u8>::from(self.0.month()),
            self.0.day()
        )
    }
}

impl FromStr for FullDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Ok(FullDate(Date::parse(s, FORMAT)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fulldate_str_roundtrip() {
        const DATESTR: &str = "2000-02-03";
        let fulldate = FullDate::from_str(DATESTR).expect("unable to parse datestr");
        assert_eq!(DATESTR, fulldate.to_string())
    }

    #[test]
    fn tagged_value() {
        let fulldate: FullDate = "1980-06-15".parse().unwrap();
        let value = Value::from(fulldate);
        assert_eq!(
            value,
            Value::Tag(1004, Box::new(Value::Text("1980-06-15".into())))
        );
        assert_eq!(FullDate::try_from(&value).unwrap(), fulldate);
    }

    #[test]
    fn rejects_bad_dates() {
        assert!("2023-02-30".parse::<FullDate>().is_err());
        assert!("15/06/1980".parse::<FullDate>().is_err());
        assert!(FullDate::try_from(&Value::Integer(1.into())).is_err());
    }
}
