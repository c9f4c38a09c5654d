//! Allocation-free JSON codec over [`StreamBuffer`](crate::stream::StreamBuffer).
//!
//! Decoding never copies: a [`JsonValue`] is a narrowed slice of the input,
//! and parsing an object only narrows further. Strings are decoded on demand
//! into a caller-supplied stream or fixed-capacity string.

use crate::error::{FfsError, FfsResult};

mod decode;
mod encode;

pub use decode::{
    convert_value_to_string, convert_value_to_utf8, encode_utf8, initialize_object, key_matches,
    parse_boolean, parse_int32, parse_int64, parse_key_value_pair, parse_object,
    parse_quoted_string, parse_uint32, parse_value, read_string_as_utf8,
    read_string_as_utf8_in_place, read_string_character, StringCharacter,
};
pub use encode::{
    encode_array_end, encode_array_start, encode_boolean_field, encode_int32_field,
    encode_int64_field, encode_object_end, encode_object_start, encode_quoted_stream_field,
    encode_separator, encode_stream_field, encode_string, encode_string_field, encode_string_key,
    encode_string_value, encode_uint32_field,
};

pub const JSON_TRUE: &[u8] = b"true";
pub const JSON_FALSE: &[u8] = b"false";
pub const JSON_NULL: &[u8] = b"null";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonType {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
    /// Descriptor wildcard: matches a value of any type.
    Any,
}

impl JsonType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Any => "any",
        }
    }
}

/// Typed slice of a JSON document.
///
/// Strings hold the bytes between the quotes (still escaped), objects and
/// arrays the bytes between their brackets. `bytes == None` is the "empty"
/// state of an unmatched descriptor, which is distinct from `""`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonValue<'a> {
    kind: JsonType,
    bytes: Option<&'a [u8]>,
}

impl<'a> JsonValue<'a> {
    pub const fn empty(kind: JsonType) -> Self {
        Self { kind, bytes: None }
    }

    pub const fn new(kind: JsonType, bytes: &'a [u8]) -> Self {
        Self {
            kind,
            bytes: Some(bytes),
        }
    }

    pub const fn kind(&self) -> JsonType {
        self.kind
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_none()
    }

    /// Bytes not consumed yet; an empty value has none.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes.unwrap_or(&[])
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().first().copied()
    }

    fn advance(&mut self, len: usize) {
        if let Some(bytes) = self.bytes {
            self.bytes = Some(&bytes[len.min(bytes.len())..]);
        }
    }

    fn take(&mut self, len: usize) -> FfsResult<&'a [u8]> {
        let bytes = self.bytes();
        if len > bytes.len() {
            return Err(FfsError::Underrun);
        }
        self.bytes = Some(&bytes[len..]);
        Ok(&bytes[..len])
    }
}

/// Expected key and type going into [`parse_object`], matched value coming out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonField<'a> {
    pub key: &'static str,
    pub value: JsonValue<'a>,
}

impl<'a> JsonField<'a> {
    pub const fn new(key: &'static str, kind: JsonType) -> Self {
        Self {
            key,
            value: JsonValue::empty(kind),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// One key/value pair as it appears on the wire; the key is still escaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonPair<'a> {
    pub key: JsonValue<'a>,
    pub value: JsonValue<'a>,
}
