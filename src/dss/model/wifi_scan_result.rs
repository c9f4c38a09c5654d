use core::fmt::Write as _;

use super::{
    decode_enum, decode_optional_i32, decode_optional_string, decode_quoted, required,
    SecurityProtocol,
};
use crate::{
    config::{BSSID_SIZE, SSID_MAX},
    error::{FfsError, FfsResult},
    json::{
        encode_int32_field, encode_object_end, encode_object_start, encode_quoted_stream_field,
        encode_separator, encode_string_field, parse_object, JsonField, JsonType, JsonValue,
    },
    stream::StreamBuffer,
};

const KEY_SSID: &str = "ssid";
const KEY_BSSID: &str = "bssid";
const KEY_SECURITY_PROTOCOL: &str = "securityProtocol";
const KEY_RSSI: &str = "rssi";
const KEY_FREQUENCY: &str = "frequency";

// "AA:BB:CC:DD:EE:FF"
const BSSID_TEXT_LEN: usize = 3 * BSSID_SIZE - 1;

/// One access point seen by the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiScanResult {
    pub ssid: heapless::Vec<u8, SSID_MAX>,
    pub bssid: Option<[u8; BSSID_SIZE]>,
    pub security_protocol: SecurityProtocol,
    /// dBm; zero means unknown and is not sent.
    pub rssi: i32,
    /// MHz; zero means unknown and is not sent.
    pub frequency: i32,
}

impl WifiScanResult {
    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_quoted_stream_field(out, KEY_SSID, &self.ssid)?;
            if let Some(bssid) = &self.bssid {
                encode_separator(out)?;
                encode_string_field(out, KEY_BSSID, &format_bssid(bssid)?)?;
            }
            encode_separator(out)?;
            encode_string_field(out, KEY_SECURITY_PROTOCOL, self.security_protocol.as_str())?;
            if self.rssi != 0 {
                encode_separator(out)?;
                encode_int32_field(out, KEY_RSSI, self.rssi)?;
            }
            if self.frequency != 0 {
                encode_separator(out)?;
                encode_int32_field(out, KEY_FREQUENCY, self.frequency)?;
            }
            encode_object_end(out)
        })
    }

    pub fn deserialize(value: &JsonValue<'_>) -> FfsResult<Self> {
        let mut object = *value;
        let mut fields = [
            JsonField::new(KEY_SSID, JsonType::String),
            JsonField::new(KEY_BSSID, JsonType::String),
            JsonField::new(KEY_SECURITY_PROTOCOL, JsonType::String),
            JsonField::new(KEY_RSSI, JsonType::Number),
            JsonField::new(KEY_FREQUENCY, JsonType::Number),
        ];
        parse_object(&mut object, &mut fields)?;
        let [ssid, bssid, security_protocol, rssi, frequency] = &fields;
        let bssid = match decode_optional_string::<BSSID_TEXT_LEN>(bssid)? {
            Some(text) => Some(parse_bssid(&text)?),
            None => None,
        };
        Ok(Self {
            ssid: decode_quoted(required(ssid)?)?,
            bssid,
            security_protocol: decode_enum(security_protocol, SecurityProtocol::parse)?,
            rssi: decode_optional_i32(rssi)?.unwrap_or(0),
            frequency: decode_optional_i32(frequency)?.unwrap_or(0),
        })
    }
}

fn format_bssid(bssid: &[u8; BSSID_SIZE]) -> FfsResult<heapless::String<BSSID_TEXT_LEN>> {
    let mut text = heapless::String::new();
    for (idx, byte) in bssid.iter().enumerate() {
        if idx > 0 {
            text.push(':').map_err(|_| FfsError::Overrun)?;
        }
        write!(text, "{byte:02X}").map_err(|_| FfsError::Overrun)?;
    }
    Ok(text)
}

fn parse_bssid(text: &str) -> FfsResult<[u8; BSSID_SIZE]> {
    let bytes = text.as_bytes();
    if bytes.len() != BSSID_TEXT_LEN {
        return Err(FfsError::Error);
    }
    let mut bssid = [0u8; BSSID_SIZE];
    for (idx, octet) in bssid.iter_mut().enumerate() {
        let start = idx * 3;
        if idx > 0 && bytes[start - 1] != b':' {
            return Err(FfsError::Error);
        }
        hex::decode_to_slice(&bytes[start..start + 2], core::slice::from_mut(octet))?;
    }
    Ok(bssid)
}
