use super::{
    decode_bool, decode_optional_string, decode_string, decode_u32, encode_optional_string_field,
    encode_sequence_number, Nonce, RequestHeader, SessionId, WifiCredentials, KEY_CAN_PROCEED,
    KEY_NONCE, KEY_SEQUENCE_NUMBER, KEY_SESSION_ID,
};
use crate::{
    config::WIFI_CREDENTIALS_PAGE_MAX,
    error::{FfsError, FfsResult},
    json::{
        encode_array_end, encode_array_start, encode_boolean_field, encode_object_end,
        encode_object_start, encode_separator, encode_string_field, encode_string_key,
        initialize_object, parse_object, parse_value, JsonField, JsonType, JsonValue,
    },
    stream::StreamBuffer,
};

const KEY_ALL_CREDENTIALS_RETURNED: &str = "allCredentialsReturned";
const KEY_WIFI_CREDENTIALS_LIST: &str = "wifiCredentialsList";

pub type CredentialsPage = heapless::Vec<WifiCredentials, WIFI_CREDENTIALS_PAGE_MAX>;

#[derive(Clone, Copy, Debug)]
pub struct GetWifiCredentialsRequest<'r> {
    pub header: RequestHeader<'r>,
    pub sequence_number: u32,
}

impl GetWifiCredentialsRequest<'_> {
    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            self.header.encode_open(out)?;
            encode_sequence_number(out, self.sequence_number)?;
            encode_object_end(out)
        })
    }
}

/// Decodes the items of a `wifiCredentialsList` array one at a time.
pub struct CredentialsListIter<'a> {
    list: JsonValue<'a>,
    failed: bool,
}

impl<'a> CredentialsListIter<'a> {
    pub const fn new(list: JsonValue<'a>) -> Self {
        Self {
            list,
            failed: false,
        }
    }
}

impl Iterator for CredentialsListIter<'_> {
    type Item = FfsResult<WifiCredentials>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = match parse_value(&mut self.list) {
            Ok(Some(value)) if value.kind() == JsonType::Object => WifiCredentials::deserialize(&value),
            Ok(Some(_)) => Err(FfsError::Error),
            Ok(None) => return None,
            Err(err) => Err(err),
        };
        self.failed = item.is_err();
        Some(item)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetWifiCredentialsResponse {
    pub nonce: Nonce,
    pub session_id: Option<SessionId>,
    pub sequence_number: u32,
    pub all_credentials_returned: bool,
    pub credentials: CredentialsPage,
}

impl GetWifiCredentialsResponse {
    /// `canProceed: false` rejects the page before anything else is decoded.
    pub fn deserialize(json: &[u8]) -> FfsResult<Self> {
        let mut object = initialize_object(json)?;
        let mut fields = [
            JsonField::new(KEY_NONCE, JsonType::String),
            JsonField::new(KEY_SESSION_ID, JsonType::String),
            JsonField::new(KEY_CAN_PROCEED, JsonType::Boolean),
            JsonField::new(KEY_SEQUENCE_NUMBER, JsonType::Number),
            JsonField::new(KEY_ALL_CREDENTIALS_RETURNED, JsonType::Boolean),
            JsonField::new(KEY_WIFI_CREDENTIALS_LIST, JsonType::Array),
        ];
        parse_object(&mut object, &mut fields)?;
        let [nonce, session_id, can_proceed, sequence_number, all_returned, list] = &fields;
        if !decode_bool(can_proceed)? {
            log::warn!("dss: get_wifi_credentials rejected can_proceed=false");
            return Err(FfsError::Error);
        }

        let mut credentials = CredentialsPage::new();
        if !list.is_empty() {
            for item in CredentialsListIter::new(list.value) {
                credentials.push(item?).map_err(|_| FfsError::Overrun)?;
            }
        }
        Ok(Self {
            nonce: decode_string(nonce)?,
            session_id: decode_optional_string(session_id)?,
            sequence_number: decode_u32(sequence_number)?,
            all_credentials_returned: decode_bool(all_returned)?,
            credentials,
        })
    }

    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_string_field(out, KEY_NONCE, &self.nonce)?;
            encode_optional_string_field(out, KEY_SESSION_ID, self.session_id.as_deref())?;
            encode_separator(out)?;
            encode_boolean_field(out, KEY_CAN_PROCEED, true)?;
            encode_sequence_number(out, self.sequence_number)?;
            encode_separator(out)?;
            encode_boolean_field(out, KEY_ALL_CREDENTIALS_RETURNED, self.all_credentials_returned)?;
            encode_separator(out)?;
            encode_string_key(out, KEY_WIFI_CREDENTIALS_LIST)?;
            encode_array_start(out)?;
            for (idx, credentials) in self.credentials.iter().enumerate() {
                if idx > 0 {
                    encode_separator(out)?;
                }
                credentials.serialize(out)?;
            }
            encode_array_end(out)?;
            encode_object_end(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dss::model::SecurityProtocol, error::copy_str};

    fn credentials(ssid: &[u8], key: &[u8]) -> WifiCredentials {
        WifiCredentials {
            ssid: heapless::Vec::from_slice(ssid).unwrap(),
            security_protocol: SecurityProtocol::WpaPsk,
            key: heapless::Vec::from_slice(key).unwrap(),
            key_index: None,
            priority: Some(0),
            frequency: None,
        }
    }

    #[test]
    fn request_ends_with_sequence_number() {
        let request = GetWifiCredentialsRequest {
            header: RequestHeader {
                nonce: "n",
                session_id: Some("s"),
                device_details: None,
            },
            sequence_number: 4,
        };
        let mut storage = [0u8; 96];
        let mut out = StreamBuffer::output(&mut storage);
        request.serialize(&mut out).unwrap();
        assert_eq!(out.data(), br#"{"nonce":"n","sessionId":"s","sequenceNumber":4}"#);
    }

    #[test]
    fn response_round_trips() {
        let mut page = CredentialsPage::new();
        page.push(credentials(b"Home", b"password1")).unwrap();
        page.push(credentials(b"Office", b"password2")).unwrap();
        let response = GetWifiCredentialsResponse {
            nonce: copy_str("n").unwrap(),
            session_id: Some(copy_str("s").unwrap()),
            sequence_number: 1,
            all_credentials_returned: true,
            credentials: page,
        };
        let mut storage = [0u8; 512];
        let mut out = StreamBuffer::output(&mut storage);
        response.serialize(&mut out).unwrap();
        assert_eq!(GetWifiCredentialsResponse::deserialize(out.data()).unwrap(), response);
    }

    #[test]
    fn response_with_can_proceed_false_is_rejected() {
        assert_eq!(
            GetWifiCredentialsResponse::deserialize(
                br#"{"nonce":"n","canProceed":false,"sequenceNumber":1,"allCredentialsReturned":true,"wifiCredentialsList":[]}"#
            ),
            Err(FfsError::Error)
        );
    }

    #[test]
    fn iterator_stops_after_first_bad_item() {
        let list = JsonValue::new(
            JsonType::Array,
            br#"{"ssid":"\"a\"","securityProtocol":"OPEN"}, 7, {"ssid":"\"b\"","securityProtocol":"OPEN"}"#,
        );
        let mut items = CredentialsListIter::new(list);
        assert!(items.next().unwrap().is_ok());
        assert_eq!(items.next().unwrap(), Err(FfsError::Error));
        assert!(items.next().is_none());
    }
}
