use super::{
    decode_bool, decode_string, decode_u32, encode_sequence_number, Nonce, RequestHeader,
    SessionId, WifiScanResult, KEY_CAN_PROCEED, KEY_NONCE, KEY_SEQUENCE_NUMBER, KEY_SESSION_ID,
};
use crate::{
    error::{FfsError, FfsResult},
    json::{
        encode_array_end, encode_array_start, encode_boolean_field, encode_object_end,
        encode_object_start, encode_separator, encode_string_field, encode_string_key,
        encode_uint32_field, initialize_object, parse_object, JsonField, JsonType,
    },
    stream::StreamBuffer,
};

const KEY_WIFI_SCAN_DATA_LIST: &str = "wifiScanDataList";
const KEY_TOTAL_CREDENTIALS_FOUND: &str = "totalCredentialsFound";
const KEY_ALL_CREDENTIALS_FOUND: &str = "allCredentialsFound";

/// One page of scan results, streamed into a bounded buffer.
///
/// `start_serializing` opens the list, `add_item` appends a result or
/// reports [`FfsError::Overrun`] when it would not leave room to close the
/// document, and `finish_serializing` closes it. A rejected item goes first
/// into the next page.
#[derive(Clone, Copy, Debug)]
pub struct PostWifiScanDataRequest<'r> {
    pub header: RequestHeader<'r>,
    pub sequence_number: u32,
}

impl PostWifiScanDataRequest<'_> {
    pub fn start_serializing(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            self.header.encode_open(out)?;
            encode_sequence_number(out, self.sequence_number)?;
            encode_separator(out)?;
            encode_string_key(out, KEY_WIFI_SCAN_DATA_LIST)?;
            encode_array_start(out)
        })
    }

    pub fn add_item(destination: &mut StreamBuffer<'_>, item: &WifiScanResult) -> FfsResult<()> {
        if destination.is_empty() {
            return Err(FfsError::Error);
        }
        destination.transaction(|out| {
            if out.last_written() != Some(b'[') {
                encode_separator(out)?;
            }
            item.serialize(out)?;
            // Keep room for "]}".
            if out.space_size() < 2 {
                return Err(FfsError::Overrun);
            }
            Ok(())
        })
    }

    pub fn finish_serializing(destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_array_end(out)?;
            encode_object_end(out)
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostWifiScanDataResponse {
    pub nonce: Nonce,
    pub session_id: SessionId,
    pub sequence_number: u32,
    pub total_credentials_found: u32,
    pub all_credentials_found: bool,
}

impl PostWifiScanDataResponse {
    /// `canProceed: false` rejects the whole page before anything else is
    /// looked at.
    pub fn deserialize(json: &[u8]) -> FfsResult<Self> {
        let mut object = initialize_object(json)?;
        let mut fields = [
            JsonField::new(KEY_NONCE, JsonType::String),
            JsonField::new(KEY_SESSION_ID, JsonType::String),
            JsonField::new(KEY_CAN_PROCEED, JsonType::Boolean),
            JsonField::new(KEY_SEQUENCE_NUMBER, JsonType::Number),
            JsonField::new(KEY_TOTAL_CREDENTIALS_FOUND, JsonType::Number),
            JsonField::new(KEY_ALL_CREDENTIALS_FOUND, JsonType::Boolean),
        ];
        parse_object(&mut object, &mut fields)?;
        let [nonce, session_id, can_proceed, sequence_number, total, all_found] = &fields;
        if !decode_bool(can_proceed)? {
            log::warn!("dss: post_wifi_scan_data rejected can_proceed=false");
            return Err(FfsError::Error);
        }
        Ok(Self {
            nonce: decode_string(nonce)?,
            session_id: decode_string(session_id)?,
            sequence_number: decode_u32(sequence_number)?,
            total_credentials_found: decode_u32(total)?,
            all_credentials_found: decode_bool(all_found)?,
        })
    }

    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_string_field(out, KEY_NONCE, &self.nonce)?;
            encode_separator(out)?;
            encode_string_field(out, KEY_SESSION_ID, &self.session_id)?;
            encode_separator(out)?;
            encode_boolean_field(out, KEY_CAN_PROCEED, true)?;
            encode_sequence_number(out, self.sequence_number)?;
            encode_separator(out)?;
            encode_uint32_field(out, KEY_TOTAL_CREDENTIALS_FOUND, self.total_credentials_found)?;
            encode_separator(out)?;
            encode_boolean_field(out, KEY_ALL_CREDENTIALS_FOUND, self.all_credentials_found)?;
            encode_object_end(out)
        })
    }
}
