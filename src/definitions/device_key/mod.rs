use ciborium::Value;
use coset::{AsCborValue, CborSerializable};

use crate::cbor;

pub mod cose_key;
pub use cose_key::CoseKey;

/// `DeviceKeyInfo` of the MSO, binding the mdoc to the holder's device key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceKeyInfo {
    pub device_key: CoseKey,
}

impl From<CoseKey> for DeviceKeyInfo {
    fn from(device_key: CoseKey) -> Self {
        Self { device_key }
    }
}

impl CborSerializable for DeviceKeyInfo {}
impl AsCborValue for DeviceKeyInfo {
    fn from_cbor_value(value: Value) -> coset::Result<Self> {
        let mut map = cbor::into_map(value, "DeviceKeyInfo")?;
        let device_key =
            CoseKey::from_cbor_value(cbor::require(&mut map, "deviceKey", "deviceKey")?)?;
        Ok(Self { device_key })
    }

    fn to_cbor_value(self) -> coset::Result<Value> {
        Ok(Value::Map(vec![(
            cbor::text("deviceKey"),
            self.device_key.to_cbor_value()?,
        )]))
    }
}
