use super::{
    decode_enum, decode_optional_string, decode_string, encode_optional_string_field,
    encode_sequence_number, Nonce, RegistrationState, ReportResult, RequestHeader,
    WifiConnectionDetails, KEY_CAN_PROCEED, KEY_NONCE,
};
use crate::{
    config::{REASON_MAX, WAIT_TIME_MAX},
    error::{FfsError, FfsResult},
    json::{
        encode_array_end, encode_array_start, encode_boolean_field, encode_object_end,
        encode_object_start, encode_separator, encode_string_field, encode_string_key,
        initialize_object, parse_boolean, parse_object, JsonField, JsonType,
    },
    provisionee::ProvisioneeState,
    stream::StreamBuffer,
};

const KEY_CURRENT_STATE: &str = "currentProvisioningState";
const KEY_REGISTRATION_STATE: &str = "registrationState";
const KEY_STATE_TRANSITION_RESULT: &str = "stateTransitionResult";
const KEY_WIFI_NETWORK_INFO_LIST: &str = "wifiNetworkInfoList";
const KEY_NEXT_STATE: &str = "nextProvisioningState";
const KEY_WAIT_TIME: &str = "waitTime";
const KEY_REASON: &str = "reason";

/// Outcome of one local step, with any connection attempts made during it.
///
/// Connection attempts are appended one at a time after
/// `start_serializing`; the list is only opened once the first one fits.
#[derive(Clone, Copy, Debug)]
pub struct ReportRequest<'r> {
    pub header: RequestHeader<'r>,
    pub sequence_number: u32,
    pub current_state: ProvisioneeState,
    pub registration_state: RegistrationState,
    pub result: ReportResult,
}

impl ReportRequest<'_> {
    pub fn start_serializing(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        let current_state = self.current_state.to_dss()?;
        destination.transaction(|out| {
            self.header.encode_open(out)?;
            encode_sequence_number(out, self.sequence_number)?;
            encode_separator(out)?;
            encode_string_field(out, KEY_CURRENT_STATE, current_state)?;
            encode_separator(out)?;
            encode_string_field(out, KEY_REGISTRATION_STATE, self.registration_state.as_str())?;
            encode_separator(out)?;
            encode_string_field(out, KEY_STATE_TRANSITION_RESULT, self.result.as_str())
        })
    }

    pub fn add_connection_attempt(
        destination: &mut StreamBuffer<'_>,
        attempt: &WifiConnectionDetails,
    ) -> FfsResult<()> {
        if destination.is_empty() {
            return Err(FfsError::Error);
        }
        destination.transaction(|out| {
            encode_separator(out)?;
            // Every item ends with '}'; anything else means the list is not open yet.
            if out.last_written() != Some(b'}') {
                encode_string_key(out, KEY_WIFI_NETWORK_INFO_LIST)?;
                encode_array_start(out)?;
            }
            attempt.serialize(out)?;
            // Keep room for "]}".
            if out.space_size() < 2 {
                return Err(FfsError::Overrun);
            }
            Ok(())
        })
    }

    pub fn finish_serializing(destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            if out.last_written() == Some(b'}') {
                encode_array_end(out)?;
            }
            encode_object_end(out)
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportResponse {
    pub nonce: Nonce,
    pub can_proceed: bool,
    /// Absent means "repeat the current step".
    pub next_state: Option<ProvisioneeState>,
    /// ISO-8601 duration to wait before the next step.
    pub wait_time: Option<heapless::String<WAIT_TIME_MAX>>,
    pub reason: Option<heapless::String<REASON_MAX>>,
}

impl ReportResponse {
    pub fn deserialize(json: &[u8]) -> FfsResult<Self> {
        let mut object = initialize_object(json)?;
        let mut fields = [
            JsonField::new(KEY_NONCE, JsonType::String),
            JsonField::new(KEY_CAN_PROCEED, JsonType::Boolean),
            JsonField::new(KEY_NEXT_STATE, JsonType::String),
            JsonField::new(KEY_WAIT_TIME, JsonType::String),
            JsonField::new(KEY_REASON, JsonType::String),
        ];
        parse_object(&mut object, &mut fields)?;
        let [nonce, can_proceed, next_state, wait_time, reason] = &fields;

        let can_proceed = if can_proceed.is_empty() {
            false
        } else {
            parse_boolean(&can_proceed.value)?
        };
        let next_state = if next_state.is_empty() {
            None
        } else {
            Some(decode_enum(next_state, ProvisioneeState::from_dss)?)
        };
        Ok(Self {
            nonce: decode_string(nonce)?,
            can_proceed,
            next_state,
            wait_time: decode_optional_string(wait_time)?,
            reason: decode_optional_string(reason)?,
        })
    }

    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        let next_state = self.next_state.map(ProvisioneeState::to_dss).transpose()?;
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_string_field(out, KEY_NONCE, &self.nonce)?;
            encode_separator(out)?;
            encode_boolean_field(out, KEY_CAN_PROCEED, self.can_proceed)?;
            encode_optional_string_field(out, KEY_NEXT_STATE, next_state)?;
            encode_optional_string_field(out, KEY_WAIT_TIME, self.wait_time.as_deref())?;
            encode_optional_string_field(out, KEY_REASON, self.reason.as_deref())?;
            encode_object_end(out)
        })
    }
}
