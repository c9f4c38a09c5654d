use super::{
    decode_bool, decode_optional_string, decode_string, encode_optional_string_field, Nonce,
    SessionId, KEY_CAN_PROCEED, KEY_NONCE, KEY_SESSION_ID,
};
use crate::{
    config::SALT_MAX,
    error::FfsResult,
    json::{
        encode_boolean_field, encode_object_end, encode_object_start, encode_separator,
        encode_string_field, initialize_object, parse_object, JsonField, JsonType,
    },
    stream::StreamBuffer,
};

const KEY_SALT: &str = "salt";

/// `{"nonce":"..."}`
#[derive(Clone, Copy, Debug)]
pub struct StartProvisioningSessionRequest<'r> {
    pub nonce: &'r str,
}

impl StartProvisioningSessionRequest<'_> {
    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_string_field(out, KEY_NONCE, self.nonce)?;
            encode_object_end(out)
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartProvisioningSessionResponse {
    pub nonce: Nonce,
    pub session_id: SessionId,
    pub can_proceed: bool,
    /// Salt for the PIN hash; absent when the service does not ask for a PIN.
    pub salt: Option<heapless::String<SALT_MAX>>,
}

impl StartProvisioningSessionResponse {
    pub fn deserialize(json: &[u8]) -> FfsResult<Self> {
        let mut object = initialize_object(json)?;
        let mut fields = [
            JsonField::new(KEY_NONCE, JsonType::String),
            JsonField::new(KEY_SESSION_ID, JsonType::String),
            JsonField::new(KEY_CAN_PROCEED, JsonType::Boolean),
            JsonField::new(KEY_SALT, JsonType::String),
        ];
        parse_object(&mut object, &mut fields)?;
        let [nonce, session_id, can_proceed, salt] = &fields;
        Ok(Self {
            nonce: decode_string(nonce)?,
            session_id: decode_string(session_id)?,
            can_proceed: decode_bool(can_proceed)?,
            salt: decode_optional_string(salt)?,
        })
    }

    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            encode_string_field(out, KEY_NONCE, &self.nonce)?;
            encode_separator(out)?;
            encode_string_field(out, KEY_SESSION_ID, &self.session_id)?;
            encode_separator(out)?;
            encode_boolean_field(out, KEY_CAN_PROCEED, self.can_proceed)?;
            encode_optional_string_field(out, KEY_SALT, self.salt.as_deref())?;
            encode_object_end(out)
        })
    }
}
