use crate::{
    config::DEVICE_DETAIL_MAX,
    error::FfsResult,
    json::{
        encode_object_end, encode_object_start, encode_separator, encode_string_field,
        encode_string_key,
    },
    stream::StreamBuffer,
};

const KEY_DEVICE_DETAILS: &str = "deviceDetails";

pub type DeviceDetail = heapless::String<DEVICE_DETAIL_MAX>;

/// Identity the device volunteers to the service. Every entry is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceDetails {
    pub manufacturer: Option<DeviceDetail>,
    pub device_name: Option<DeviceDetail>,
    pub device_model: Option<DeviceDetail>,
    pub device_serial: Option<DeviceDetail>,
    pub product_index: Option<DeviceDetail>,
    pub software_version_index: Option<DeviceDetail>,
    pub firmware_version: Option<DeviceDetail>,
    pub hardware_version: Option<DeviceDetail>,
}

impl DeviceDetails {
    fn entries(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("manufacturer", self.manufacturer.as_deref()),
            ("deviceName", self.device_name.as_deref()),
            ("deviceModel", self.device_model.as_deref()),
            ("deviceSerial", self.device_serial.as_deref()),
            ("productIndex", self.product_index.as_deref()),
            ("softwareVersionIndex", self.software_version_index.as_deref()),
            ("firmwareVersion", self.firmware_version.as_deref()),
            ("hardwareVersion", self.hardware_version.as_deref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, value)| value.is_none())
    }

    /// Writes the `{...}` object with only the present entries.
    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            let mut first = true;
            for (key, value) in self.entries() {
                let Some(value) = value else {
                    continue;
                };
                if !first {
                    encode_separator(out)?;
                }
                first = false;
                encode_string_field(out, key, value)?;
            }
            encode_object_end(out)
        })
    }
}

/// Appends `,"deviceDetails":{...}`; nothing is written when every entry is
/// absent.
pub fn encode_device_details_field(
    destination: &mut StreamBuffer<'_>,
    details: &DeviceDetails,
) -> FfsResult<()> {
    if details.is_empty() {
        return Ok(());
    }
    destination.transaction(|out| {
        encode_separator(out)?;
        encode_string_key(out, KEY_DEVICE_DETAILS)?;
        details.serialize(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{copy_str, FfsError};

    fn details() -> DeviceDetails {
        DeviceDetails {
            manufacturer: Some(copy_str("Acme").unwrap()),
            device_model: Some(copy_str("Lamp \"2\"").unwrap()),
            firmware_version: Some(copy_str("1.0.3").unwrap()),
            ..DeviceDetails::default()
        }
    }

    #[test]
    fn writes_only_present_entries() {
        let mut storage = [0u8; 128];
        let mut out = StreamBuffer::output(&mut storage);
        out.write(b"{\"nonce\":\"n\"").unwrap();
        encode_device_details_field(&mut out, &details()).unwrap();
        out.write(b"}").unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(out.data()).unwrap();
        let object = parsed["deviceDetails"].as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["manufacturer"], "Acme");
        assert_eq!(object["deviceModel"], "Lamp \"2\"");
        assert_eq!(object["firmwareVersion"], "1.0.3");
    }

    #[test]
    fn empty_details_write_nothing() {
        let mut storage = [0u8; 16];
        let mut out = StreamBuffer::output(&mut storage);
        encode_device_details_field(&mut out, &DeviceDetails::default()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn overrun_leaves_stream_untouched() {
        let mut storage = [0u8; 24];
        let mut out = StreamBuffer::output(&mut storage);
        out.write(b"{\"nonce\":\"n\"").unwrap();
        assert_eq!(
            encode_device_details_field(&mut out, &details()),
            Err(FfsError::Overrun)
        );
        assert_eq!(out.data(), b"{\"nonce\":\"n\"");
    }
}
