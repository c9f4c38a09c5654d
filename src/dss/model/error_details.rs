use super::decode_optional_string;
use crate::{
    config::ERROR_DETAIL_MAX,
    error::FfsResult,
    json::{
        encode_object_end, encode_object_start, encode_separator, encode_string_field,
        encode_string_key, parse_object, JsonField, JsonType, JsonValue,
    },
    stream::StreamBuffer,
};

const KEY_ERROR_DETAILS: &str = "errorDetails";
const KEY_OPERATION: &str = "operation";
const KEY_CAUSE: &str = "cause";
const KEY_DETAILS: &str = "details";
const KEY_CODE: &str = "code";

pub type ErrorDetail = heapless::String<ERROR_DETAIL_MAX>;

/// Why a connection attempt failed, as far as the radio can tell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    pub operation: Option<ErrorDetail>,
    pub cause: Option<ErrorDetail>,
    pub details: Option<ErrorDetail>,
    pub code: Option<ErrorDetail>,
}

impl ErrorDetails {
    fn entries(&self) -> [(&'static str, Option<&str>); 4] {
        [
            (KEY_OPERATION, self.operation.as_deref()),
            (KEY_CAUSE, self.cause.as_deref()),
            (KEY_DETAILS, self.details.as_deref()),
            (KEY_CODE, self.code.as_deref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, value)| value.is_none())
    }

    pub fn serialize(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        destination.transaction(|out| {
            encode_object_start(out)?;
            let mut first = true;
            for (key, value) in self.entries() {
                let Some(value) = value else {
                    continue;
                };
                if !first {
                    encode_separator(out)?;
                }
                first = false;
                encode_string_field(out, key, value)?;
            }
            encode_object_end(out)
        })
    }

    /// Appends `,"errorDetails":{...}` unless every entry is absent.
    pub fn serialize_field(&self, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        destination.transaction(|out| {
            encode_separator(out)?;
            encode_string_key(out, KEY_ERROR_DETAILS)?;
            self.serialize(out)
        })
    }

    pub fn deserialize(value: &JsonValue<'_>) -> FfsResult<Self> {
        let mut object = *value;
        let mut fields = [
            JsonField::new(KEY_OPERATION, JsonType::String),
            JsonField::new(KEY_CAUSE, JsonType::String),
            JsonField::new(KEY_DETAILS, JsonType::String),
            JsonField::new(KEY_CODE, JsonType::String),
        ];
        parse_object(&mut object, &mut fields)?;
        let [operation, cause, details, code] = &fields;
        Ok(Self {
            operation: decode_optional_string(operation)?,
            cause: decode_optional_string(cause)?,
            details: decode_optional_string(details)?,
            code: decode_optional_string(code)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::copy_str, json::initialize_object};

    #[test]
    fn separators_sit_between_present_entries_only() {
        let details = ErrorDetails {
            operation: None,
            cause: Some(copy_str("AUTH").unwrap()),
            details: None,
            code: Some(copy_str("15").unwrap()),
        };
        let mut storage = [0u8; 64];
        let mut out = StreamBuffer::output(&mut storage);
        details.serialize(&mut out).unwrap();
        assert_eq!(out.data(), br#"{"cause":"AUTH","code":"15"}"#);

        let object = initialize_object(out.data()).unwrap();
        assert_eq!(ErrorDetails::deserialize(&object).unwrap(), details);
    }

    #[test]
    fn empty_details_are_not_written_as_a_field() {
        let mut storage = [0u8; 8];
        let mut out = StreamBuffer::output(&mut storage);
        ErrorDetails::default().serialize_field(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
