//! Typed requests and responses of the device setup service, and their JSON
//! form.
//!
//! Requests borrow what they serialize. Responses own their fields in
//! fixed-capacity strings so the response buffer can be reused as soon as
//! `deserialize` returns.

mod compute_configuration_data;
mod device_details;
mod enums;
mod error_details;
mod get_wifi_credentials;
mod post_wifi_scan_data;
mod registration_details;
mod report;
mod start_pin_based_setup;
mod start_provisioning_session;
mod wifi_connection_details;
mod wifi_credentials;
mod wifi_scan_result;

pub use compute_configuration_data::{
    ComputeConfigurationDataRequest, ComputeConfigurationDataResponse, Configuration,
    ConfigurationEntry, ConfigurationKey,
};
pub use device_details::{encode_device_details_field, DeviceDetails};
pub use enums::{ConnectionState, RegistrationState, ReportResult, SecurityProtocol};
pub use error_details::ErrorDetails;
pub use get_wifi_credentials::{
    CredentialsListIter, CredentialsPage, GetWifiCredentialsRequest, GetWifiCredentialsResponse,
};
pub use post_wifi_scan_data::{PostWifiScanDataRequest, PostWifiScanDataResponse};
pub use registration_details::RegistrationDetails;
pub use report::{ReportRequest, ReportResponse};
pub use start_pin_based_setup::{StartPinBasedSetupRequest, StartPinBasedSetupResponse};
pub use start_provisioning_session::{
    StartProvisioningSessionRequest, StartProvisioningSessionResponse,
};
pub use wifi_connection_details::WifiConnectionDetails;
pub use wifi_credentials::WifiCredentials;
pub use wifi_scan_result::WifiScanResult;

use crate::{
    config::{NONCE_MAX, SESSION_ID_MAX},
    error::{copy_bytes, FfsError, FfsResult},
    json::{
        convert_value_to_string, encode_object_start, encode_separator, encode_string_field,
        encode_uint32_field, parse_boolean, parse_int32, parse_quoted_string, parse_uint32,
        JsonField, JsonValue,
    },
    stream::StreamBuffer,
};

pub type Nonce = heapless::String<NONCE_MAX>;
pub type SessionId = heapless::String<SESSION_ID_MAX>;

pub(crate) const KEY_NONCE: &str = "nonce";
pub(crate) const KEY_SESSION_ID: &str = "sessionId";
pub(crate) const KEY_CAN_PROCEED: &str = "canProceed";
pub(crate) const KEY_SEQUENCE_NUMBER: &str = "sequenceNumber";

// Room for a quoted value in its escaped wire form.
const QUOTED_SCRATCH: usize = 256;

/// Leading fields shared by every request after the session has started.
#[derive(Clone, Copy, Debug)]
pub struct RequestHeader<'r> {
    pub nonce: &'r str,
    pub session_id: Option<&'r str>,
    pub device_details: Option<&'r DeviceDetails>,
}

impl<'r> RequestHeader<'r> {
    /// Opens the request object: `{"nonce":..,"sessionId":..,"deviceDetails":{..}`.
    pub(crate) fn encode_open(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_string_field(out, KEY_NONCE, self.nonce)?;
            if let Some(session_id) = self.session_id {
                encode_separator(out)?;
                encode_string_field(out, KEY_SESSION_ID, session_id)?;
            }
            if let Some(device_details) = self.device_details {
                encode_device_details_field(out, device_details)?;
            }
            Ok(())
        })
    }
}

pub(crate) fn encode_sequence_number(destination: &mut StreamBuffer<'_>, value: u32) -> FfsResult<()> {
    destination.transaction(|out| {
        encode_separator(out)?;
        encode_uint32_field(out, KEY_SEQUENCE_NUMBER, value)
    })
}

pub(crate) fn encode_optional_string_field(
    destination: &mut StreamBuffer<'_>,
    key: &str,
    value: Option<&str>,
) -> FfsResult<()> {
    let Some(value) = value else {
        return Ok(());
    };
    destination.transaction(|out| {
        encode_separator(out)?;
        encode_string_field(out, key, value)
    })
}

pub(crate) fn required<'f, 'a>(field: &'f JsonField<'a>) -> FfsResult<&'f JsonValue<'a>> {
    if field.is_empty() {
        log::debug!("dss: missing field key={}", field.key);
        return Err(FfsError::Error);
    }
    Ok(&field.value)
}

pub(crate) fn decode_string<const N: usize>(field: &JsonField<'_>) -> FfsResult<heapless::String<N>> {
    convert_value_to_string(required(field)?)
}

pub(crate) fn decode_optional_string<const N: usize>(
    field: &JsonField<'_>,
) -> FfsResult<Option<heapless::String<N>>> {
    if field.is_empty() {
        return Ok(None);
    }
    convert_value_to_string(&field.value).map(Some)
}

pub(crate) fn decode_bool(field: &JsonField<'_>) -> FfsResult<bool> {
    parse_boolean(required(field)?)
}

pub(crate) fn decode_u32(field: &JsonField<'_>) -> FfsResult<u32> {
    parse_uint32(required(field)?)
}

pub(crate) fn decode_optional_i32(field: &JsonField<'_>) -> FfsResult<Option<i32>> {
    if field.is_empty() {
        return Ok(None);
    }
    parse_int32(&field.value).map(Some)
}

/// Strips the `\"...\"` wrapper of a quoted string value.
pub(crate) fn decode_quoted<const N: usize>(value: &JsonValue<'_>) -> FfsResult<heapless::Vec<u8, N>> {
    let mut scratch = [0u8; QUOTED_SCRATCH];
    let mut decoded = StreamBuffer::output(&mut scratch);
    parse_quoted_string(value, &mut decoded)?;
    copy_bytes(decoded.data())
}

/// Wire strings that name an enum are short; anything longer is malformed.
pub(crate) fn decode_enum<T>(field: &JsonField<'_>, parse: fn(&str) -> FfsResult<T>) -> FfsResult<T> {
    let text: heapless::String<32> = decode_string(field).map_err(|err| match err {
        FfsError::Overrun => FfsError::Error,
        other => other,
    })?;
    parse(&text)
}
