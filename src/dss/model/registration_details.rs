use super::decode_optional_string;
use crate::{
    config::REGISTRATION_TOKEN_MAX,
    error::FfsResult,
    json::{
        encode_int64_field, encode_object_end, encode_object_start, encode_separator,
        encode_string_field, parse_int64, parse_object, JsonField, JsonType, JsonValue,
    },
    stream::StreamBuffer,
};

const KEY_REGISTRATION_TOKEN: &str = "registrationToken";
const KEY_EXPIRES_AT: &str = "expiresAt";

/// Cloud registration handed to the device during configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationDetails {
    pub registration_token: Option<heapless::String<REGISTRATION_TOKEN_MAX>>,
    /// Seconds since the epoch.
    pub expires_at: Option<i64>,
}

impl RegistrationDetails {
    pub fn deserialize(value: &JsonValue<'_>) -> FfsResult<Self> {
        let mut object = *value;
        let mut fields = [
            JsonField::new(KEY_REGISTRATION_TOKEN, JsonType::String),
            JsonField::new(KEY_EXPIRES_AT, JsonType::Number),
        ];
        parse_object(&mut object, &mut fields)?;
        let expires_at = if fields[1].is_empty() {
            None
        } else {
            Some(parse_int64(&fields[1].value)?)
        };
        Ok(Self {
            registration_token: decode_optional_string(&fields[0])?,
            expires_at,
        })
    }

    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            let mut first = true;
            if let Some(token) = &self.registration_token {
                encode_string_field(out, KEY_REGISTRATION_TOKEN, token)?;
                first = false;
            }
            if let Some(expires_at) = self.expires_at {
                if !first {
                    encode_separator(out)?;
                }
                encode_int64_field(out, KEY_EXPIRES_AT, expires_at)?;
            }
            encode_object_end(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::copy_str, json::initialize_object};

    #[test]
    fn round_trips_with_and_without_fields() {
        for details in [
            RegistrationDetails {
                registration_token: Some(copy_str("tok").unwrap()),
                expires_at: Some(1_700_000_000),
            },
            RegistrationDetails {
                registration_token: None,
                expires_at: Some(-1),
            },
            RegistrationDetails::default(),
        ] {
            let mut storage = [0u8; 96];
            let mut out = StreamBuffer::output(&mut storage);
            details.serialize(&mut out).unwrap();
            let object = initialize_object(out.data()).unwrap();
            assert_eq!(RegistrationDetails::deserialize(&object).unwrap(), details);
        }
    }
}
