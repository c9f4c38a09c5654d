use super::{decode_enum, decode_quoted, required, ConnectionState, ErrorDetails, SecurityProtocol};
use crate::{
    config::SSID_MAX,
    error::FfsResult,
    json::{
        encode_object_end, encode_object_start, encode_quoted_stream_field, encode_separator,
        encode_string_field, parse_object, JsonField, JsonType, JsonValue,
    },
    stream::StreamBuffer,
};

const KEY_SSID: &str = "ssid";
const KEY_SECURITY_PROTOCOL: &str = "securityProtocol";
const KEY_CONNECTION_STATE: &str = "wifiConnectionState";
const KEY_ERROR_DETAILS: &str = "errorDetails";

/// Result of one attempt to join a network, reported back to the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiConnectionDetails {
    pub ssid: heapless::Vec<u8, SSID_MAX>,
    pub security_protocol: SecurityProtocol,
    pub state: ConnectionState,
    pub error_details: Option<ErrorDetails>,
}

impl WifiConnectionDetails {
    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_quoted_stream_field(out, KEY_SSID, &self.ssid)?;
            encode_separator(out)?;
            encode_string_field(out, KEY_SECURITY_PROTOCOL, self.security_protocol.as_str())?;
            encode_separator(out)?;
            encode_string_field(out, KEY_CONNECTION_STATE, self.state.as_str())?;
            if let Some(error_details) = &self.error_details {
                error_details.serialize_field(out)?;
            }
            encode_object_end(out)
        })
    }

    pub fn deserialize(value: &JsonValue<'_>) -> FfsResult<Self> {
        let mut object = *value;
        let mut fields = [
            JsonField::new(KEY_SSID, JsonType::String),
            JsonField::new(KEY_SECURITY_PROTOCOL, JsonType::String),
            JsonField::new(KEY_CONNECTION_STATE, JsonType::String),
            JsonField::new(KEY_ERROR_DETAILS, JsonType::Object),
        ];
        parse_object(&mut object, &mut fields)?;
        let [ssid, security_protocol, state, error_details] = &fields;
        let error_details = if error_details.is_empty() {
            None
        } else {
            Some(ErrorDetails::deserialize(&error_details.value)?)
        };
        Ok(Self {
            ssid: decode_quoted(required(ssid)?)?,
            security_protocol: decode_enum(security_protocol, SecurityProtocol::parse)?,
            state: decode_enum(state, ConnectionState::parse)?,
            error_details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::copy_str, json::initialize_object};

    #[test]
    fn round_trips_with_error_details() {
        let attempt = WifiConnectionDetails {
            ssid: heapless::Vec::from_slice(b"Cafe").unwrap(),
            security_protocol: SecurityProtocol::Wep,
            state: ConnectionState::Failed,
            error_details: Some(ErrorDetails {
                operation: Some(copy_str("connect").unwrap()),
                ..ErrorDetails::default()
            }),
        };
        let mut storage = [0u8; 160];
        let mut out = StreamBuffer::output(&mut storage);
        attempt.serialize(&mut out).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(out.data()).unwrap();
        assert_eq!(parsed["wifiConnectionState"], "FAILED");
        assert_eq!(parsed["errorDetails"]["operation"], "connect");

        let object = initialize_object(out.data()).unwrap();
        assert_eq!(WifiConnectionDetails::deserialize(&object).unwrap(), attempt);
    }
}
