use ciborium::Value;

use crate::cbor;
use crate::definitions::FullDate;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("decode error: {0}")]
    Decode(&'static str),
}

/// One entry of `driving_privileges` in the org.iso.18013.5.1 namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrivingPrivilege {
    pub vehicle_category_code: String,
    pub issue_date: Option<FullDate>,
    pub expiry_date: Option<FullDate>,
    pub codes: Vec<Code>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Code {
    pub code: String,
    pub sign: Option<String>,
    pub value: Option<String>,
}

fn optional_text(
    map: &[(Value, Value)],
    key: &str,
    err: &'static str,
) -> Result<Option<String>, Error> {
    cbor::lookup(map, key)
        .map(|v| v.as_text().map(str::to_string).ok_or(Error::Decode(err)))
        .transpose()
}

fn optional_date(
    map: &[(Value, Value)],
    key: &str,
    err: &'static str,
) -> Result<Option<FullDate>, Error> {
    cbor::lookup(map, key)
        .map(|v| FullDate::try_from(v).map_err(|_| Error::Decode(err)))
        .transpose()
}

impl TryFrom<&Value> for Code {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Error> {
        let map = value.as_map().ok_or(Error::Decode("code is not a map"))?;
        Ok(Code {
            code: optional_text(map, "code", "code is not a string")?
                .ok_or(Error::Decode("code is missing"))?,
            sign: optional_text(map, "sign", "sign is not a string")?,
            value: optional_text(map, "value", "value is not a string")?,
        })
    }
}

impl TryFrom<&Value> for DrivingPrivilege {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Error> {
        let map = value
            .as_map()
            .ok_or(Error::Decode("DrivingPrivilege is not a map"))?;
        let codes = match cbor::lookup(map, "codes") {
            Some(codes) => codes
                .as_array()
                .ok_or(Error::Decode("codes is not an array"))?
                .iter()
                .map(Code::try_from)
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };
        Ok(DrivingPrivilege {
            vehicle_category_code: optional_text(
                map,
                "vehicle_category_code",
                "vehicle_category_code is not a string",
            )?
            .ok_or(Error::Decode("vehicle_category_code is missing"))?,
            issue_date: optional_date(map, "issue_date", "issue_date is not a full-date")?,
            expiry_date: optional_date(map, "expiry_date", "expiry_date is not a full-date")?,
            codes,
        })
    }
}

/// Parse the `driving_privileges` array.
pub fn parse(value: &Value) -> Result<Vec<DrivingPrivilege>, Error> {
    value
        .as_array()
        .ok_or(Error::Decode("driving_privileges is not an array"))?
        .iter()
        .map(DrivingPrivilege::try_from)
        .collect()
}
