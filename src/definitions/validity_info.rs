use ciborium::Value;
use coset::{AsCborValue, CborSerializable, CoseError};
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    OffsetDateTime, UtcOffset,
};

use crate::cbor::{self, TAG_TDATE};

const TDATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Validity of the MSO. All instants are encoded as `tdate` in UTC without fractional seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidityInfo {
    pub signed: OffsetDateTime,
    pub valid_from: OffsetDateTime,
    pub valid_until: OffsetDateTime,
    pub expected_update: Option<OffsetDateTime>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to format date: {0}")]
    Format(#[from] time::error::Format),
    #[error("unable to parse date string as rfc3339 date: {0}")]
    Parse(#[from] time::error::Parse),
}

pub fn to_tdate(t: OffsetDateTime) -> Result<Value, Error> {
    let text = t.to_offset(UtcOffset::UTC).format(TDATE_FORMAT)?;
    Ok(Value::Tag(TAG_TDATE, Box::new(Value::Text(text))))
}

fn from_tdate(v: Value) -> coset::Result<OffsetDateTime> {
    match v {
        Value::Tag(TAG_TDATE, inner) => {
            let text = cbor::into_text(*inner, "tdate")?;
            OffsetDateTime::parse(&text, &Rfc3339)
                .map_err(|_| CoseError::UnexpectedItem("malformed date", "rfc3339 tdate"))
        }
        _ => Err(CoseError::UnexpectedItem("untagged item", "tag 0")),
    }
}

impl CborSerializable for ValidityInfo {}
impl AsCborValue for ValidityInfo {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "ValidityInfo")?;
        let signed = from_tdate(cbor::require(&mut map, "signed", "signed")?)?;
        let valid_from = from_tdate(cbor::require(&mut map, "validFrom", "validFrom")?)?;
        let valid_until = from_tdate(cbor::require(&mut map, "validUntil", "validUntil")?)?;
        let expected_update = cbor::take(&mut map, "expectedUpdate")
            .map(from_tdate)
            .transpose()?;
        Ok(Self {
            signed,
            valid_from,
            valid_until,
            expected_update,
        })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        let date = |t| to_tdate(t).map_err(|_| CoseError::EncodeFailed);
        let mut map = vec![
            (cbor::text("signed"), date(self.signed)?),
            (cbor::text("validFrom"), date(self.valid_from)?),
            (cbor::text("validUntil"), date(self.valid_until)?),
        ];
        if let Some(expected_update) = self.expected_update {
            map.push((cbor::text("expectedUpdate"), date(expected_update)?));
        }
        Ok(Value::Map(map))
    }
}
