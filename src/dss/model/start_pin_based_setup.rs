use super::{decode_bool, decode_string, Nonce, RequestHeader, KEY_CAN_PROCEED, KEY_NONCE};
use crate::{
    error::FfsResult,
    json::{
        encode_boolean_field, encode_object_end, encode_object_start, encode_separator,
        encode_string_field, initialize_object, parse_object, JsonField, JsonType,
    },
    stream::StreamBuffer,
};

const KEY_HASHED_PIN: &str = "hashedPin";

/// Written in three calls so the hashed PIN can be appended by whoever holds
/// the PIN, without the request ever owning it.
#[derive(Clone, Copy, Debug)]
pub struct StartPinBasedSetupRequest<'r> {
    pub header: RequestHeader<'r>,
}

impl StartPinBasedSetupRequest<'_> {
    pub fn start_serializing(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        self.header.encode_open(destination)
    }

    pub fn add_hashed_pin(destination: &mut StreamBuffer<'_>, hashed_pin: &str) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_separator(out)?;
            encode_string_field(out, KEY_HASHED_PIN, hashed_pin)
        })
    }

    pub fn finish_serializing(destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        encode_object_end(destination)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartPinBasedSetupResponse {
    pub nonce: Nonce,
    pub can_proceed: bool,
}

impl StartPinBasedSetupResponse {
    pub fn deserialize(json: &[u8]) -> FfsResult<Self> {
        let mut object = initialize_object(json)?;
        let mut fields = [
            JsonField::new(KEY_NONCE, JsonType::String),
            JsonField::new(KEY_CAN_PROCEED, JsonType::Boolean),
        ];
        parse_object(&mut object, &mut fields)?;
        Ok(Self {
            nonce: decode_string(&fields[0])?,
            can_proceed: decode_bool(&fields[1])?,
        })
    }

    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_string_field(out, KEY_NONCE, &self.nonce)?;
            encode_separator(out)?;
            encode_boolean_field(out, KEY_CAN_PROCEED, self.can_proceed)?;
            encode_object_end(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dss::model::DeviceDetails,
        error::{copy_str, FfsError},
    };

    #[test]
    fn request_is_streamed_in_three_parts() {
        let details = DeviceDetails {
            device_serial: Some(copy_str("SN1").unwrap()),
            ..DeviceDetails::default()
        };
        let request = StartPinBasedSetupRequest {
            header: RequestHeader {
                nonce: "n",
                session_id: Some("s"),
                device_details: Some(&details),
            },
        };
        let mut storage = [0u8; 128];
        let mut out = StreamBuffer::output(&mut storage);
        request.start_serializing(&mut out).unwrap();
        StartPinBasedSetupRequest::add_hashed_pin(&mut out, "aGFzaA==").unwrap();
        StartPinBasedSetupRequest::finish_serializing(&mut out).unwrap();

        assert_eq!(
            out.data(),
            br#"{"nonce":"n","sessionId":"s","deviceDetails":{"deviceSerial":"SN1"},"hashedPin":"aGFzaA=="}"#
        );
    }

    #[test]
    fn response_round_trips() {
        let response = StartPinBasedSetupResponse {
            nonce: copy_str("n1").unwrap(),
            can_proceed: true,
        };
        let mut storage = [0u8; 64];
        let mut out = StreamBuffer::output(&mut storage);
        response.serialize(&mut out).unwrap();
        assert_eq!(StartPinBasedSetupResponse::deserialize(out.data()).unwrap(), response);
    }

    #[test]
    fn response_with_string_can_proceed_is_rejected() {
        assert_eq!(
            StartPinBasedSetupResponse::deserialize(br#"{"nonce":"n","canProceed":"true"}"#),
            Err(FfsError::Error)
        );
    }
}
