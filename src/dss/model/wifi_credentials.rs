use super::{decode_enum, decode_optional_i32, decode_quoted, required, SecurityProtocol};
use crate::{
    config::{SSID_MAX, WIFI_KEY_MAX},
    error::{copy_bytes, FfsResult},
    json::{
        convert_value_to_utf8, encode_int32_field, encode_object_end, encode_object_start,
        encode_quoted_stream_field, encode_separator, encode_stream_field, encode_string_field,
        parse_object, JsonField, JsonType, JsonValue,
    },
    stream::StreamBuffer,
};

const KEY_SSID: &str = "ssid";
const KEY_SECURITY_PROTOCOL: &str = "securityProtocol";
const KEY_KEY: &str = "key";
const KEY_KEY_INDEX: &str = "keyIndex";
const KEY_PRIORITY: &str = "priority";
const KEY_FREQUENCY: &str = "frequency";

const WEP_64_HEX_LEN: usize = 10;
const WEP_128_HEX_LEN: usize = 26;
const WEP_SCRATCH: usize = 128;

/// One network the user shared with the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: heapless::Vec<u8, SSID_MAX>,
    pub security_protocol: SecurityProtocol,
    /// WPA passphrase, or WEP key bytes; empty for open networks.
    pub key: heapless::Vec<u8, WIFI_KEY_MAX>,
    /// WEP only.
    pub key_index: Option<i32>,
    pub priority: Option<i32>,
    pub frequency: Option<i32>,
}

impl WifiCredentials {
    pub fn deserialize(value: &JsonValue<'_>) -> FfsResult<Self> {
        let mut object = *value;
        let mut fields = [
            JsonField::new(KEY_SSID, JsonType::String),
            JsonField::new(KEY_SECURITY_PROTOCOL, JsonType::String),
            JsonField::new(KEY_KEY, JsonType::Any),
            JsonField::new(KEY_KEY_INDEX, JsonType::Number),
            JsonField::new(KEY_PRIORITY, JsonType::Number),
            JsonField::new(KEY_FREQUENCY, JsonType::Number),
        ];
        parse_object(&mut object, &mut fields)?;
        let [ssid, security_protocol, key, key_index, priority, frequency] = &fields;

        let security_protocol = decode_enum(security_protocol, SecurityProtocol::parse)?;
        let (key, key_index) = match security_protocol {
            SecurityProtocol::WpaPsk => (decode_quoted(required(key)?)?, None),
            SecurityProtocol::Wep => (
                decode_wep_key(required(key)?)?,
                decode_optional_i32(key_index)?,
            ),
            SecurityProtocol::Open | SecurityProtocol::Other => (heapless::Vec::new(), None),
        };
        Ok(Self {
            ssid: decode_quoted(required(ssid)?)?,
            security_protocol,
            key,
            key_index,
            priority: decode_optional_i32(priority)?,
            frequency: decode_optional_i32(frequency)?,
        })
    }

    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_quoted_stream_field(out, KEY_SSID, &self.ssid)?;
            encode_separator(out)?;
            encode_string_field(out, KEY_SECURITY_PROTOCOL, self.security_protocol.as_str())?;
            match self.security_protocol {
                SecurityProtocol::WpaPsk => {
                    encode_separator(out)?;
                    encode_quoted_stream_field(out, KEY_KEY, &self.key)?;
                }
                SecurityProtocol::Wep => {
                    encode_separator(out)?;
                    encode_wep_key(out, &self.key)?;
                    if let Some(key_index) = self.key_index {
                        encode_separator(out)?;
                        encode_int32_field(out, KEY_KEY_INDEX, key_index)?;
                    }
                }
                SecurityProtocol::Open | SecurityProtocol::Other => {}
            }
            for (key, value) in [(KEY_PRIORITY, self.priority), (KEY_FREQUENCY, self.frequency)] {
                if let Some(value) = value {
                    encode_separator(out)?;
                    encode_int32_field(out, key, value)?;
                }
            }
            encode_object_end(out)
        })
    }
}

/// WEP keys arrive as text, optionally quoted; 10 or 26 hex digits are the
/// 40- and 104-bit binary forms.
fn decode_wep_key(value: &JsonValue<'_>) -> FfsResult<heapless::Vec<u8, WIFI_KEY_MAX>> {
    let mut scratch = [0u8; WEP_SCRATCH];
    let mut decoded = StreamBuffer::output(&mut scratch);
    convert_value_to_utf8(value, &mut decoded)?;

    let mut text = decoded.data();
    if text.len() >= 2 && text[0] == b'"' && text[text.len() - 1] == b'"' {
        text = &text[1..text.len() - 1];
    }
    let is_hex = text.iter().all(u8::is_ascii_hexdigit);
    if is_hex && (text.len() == WEP_64_HEX_LEN || text.len() == WEP_128_HEX_LEN) {
        let mut key = [0u8; WEP_128_HEX_LEN / 2];
        let key = &mut key[..text.len() / 2];
        hex::decode_to_slice(text, key)?;
        return copy_bytes(key);
    }
    copy_bytes(text)
}

fn encode_wep_key(destination: &mut StreamBuffer<'_>, key: &[u8]) -> FfsResult<()> {
    if key.len() * 2 == WEP_64_HEX_LEN || key.len() * 2 == WEP_128_HEX_LEN {
        let mut text = [0u8; WEP_128_HEX_LEN];
        let text = &mut text[..key.len() * 2];
        hex::encode_to_slice(key, text)?;
        return encode_stream_field(destination, KEY_KEY, text);
    }
    encode_stream_field(destination, KEY_KEY, key)
}
