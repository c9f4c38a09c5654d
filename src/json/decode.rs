use super::{JsonField, JsonPair, JsonType, JsonValue, JSON_FALSE, JSON_NULL, JSON_TRUE};
use crate::{
    error::{FfsError, FfsResult},
    stream::{RewriteStep, StreamBuffer},
};

// Largest magnitude that can take one more decimal digit without overflowing i64.
const INT64_ACCUMULATE_LIMIT: u64 = 922_337_203_685_477_580;

/// One decoded character of a JSON string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringCharacter {
    pub code_point: u32,
    pub is_escaped: bool,
}

/// Trims whitespace and strips the outer braces of a JSON document.
pub fn initialize_object(json: &[u8]) -> FfsResult<JsonValue<'_>> {
    let mut begin = 0usize;
    let mut end = json.len();
    while begin < end && is_json_whitespace(json[begin]) {
        begin += 1;
    }
    while end > begin && is_json_whitespace(json[end - 1]) {
        end -= 1;
    }
    if begin >= end {
        return Err(FfsError::Underrun);
    }
    if json[begin] != b'{' || json[end - 1] != b'}' || end - begin < 2 {
        return Err(FfsError::Error);
    }
    Ok(JsonValue::new(JsonType::Object, &json[begin + 1..end - 1]))
}

/// Fills `fields` from the key/value pairs of `source`.
///
/// Unmatched keys are skipped. A type mismatch is [`FfsError::Error`], a key
/// seen twice for the same descriptor is [`FfsError::Overrun`]. Descriptors
/// with no pair on the wire stay empty.
pub fn parse_object<'a>(source: &mut JsonValue<'a>, fields: &mut [JsonField<'a>]) -> FfsResult<()> {
    while let Some(pair) = parse_key_value_pair(source)? {
        for field in fields.iter_mut() {
            if !key_matches(&pair.key, field.key)? {
                continue;
            }
            if field.value.kind != JsonType::Any && field.value.kind != pair.value.kind {
                log::debug!(
                    "json: key={} expected={} got={}",
                    field.key,
                    field.value.kind.as_str(),
                    pair.value.kind.as_str()
                );
                return Err(FfsError::Error);
            }
            if !field.value.is_empty() {
                return Err(FfsError::Overrun);
            }
            field.value = pair.value;
        }
    }
    Ok(())
}

/// Next `"key": value` pair, or `None` once the object is exhausted.
pub fn parse_key_value_pair<'a>(source: &mut JsonValue<'a>) -> FfsResult<Option<JsonPair<'a>>> {
    skip_whitespace(source);
    if source.peek().is_none() {
        return Ok(None);
    }
    if source.peek() != Some(b'"') {
        return Err(FfsError::Error);
    }
    let key = parse_string_value(source)?;
    skip_whitespace(source);
    skip_character(source, b':')?;
    let value = parse_value(source)?.ok_or(FfsError::Underrun)?;
    Ok(Some(JsonPair { key, value }))
}

/// Next value of an object body or array, or `None` when nothing is left.
pub fn parse_value<'a>(source: &mut JsonValue<'a>) -> FfsResult<Option<JsonValue<'a>>> {
    skip_whitespace(source);
    let Some(first) = source.peek() else {
        return Ok(None);
    };
    let value = match first {
        b'"' => parse_string_value(source)?,
        b't' | b'f' => {
            let literal = parse_literal(source);
            if literal != JSON_TRUE && literal != JSON_FALSE {
                return Err(FfsError::Error);
            }
            JsonValue::new(JsonType::Boolean, literal)
        }
        b'n' => {
            let literal = parse_literal(source);
            if literal != JSON_NULL {
                return Err(FfsError::Error);
            }
            JsonValue::new(JsonType::Null, literal)
        }
        b'{' => parse_nested_value(source, JsonType::Object, b'{', b'}')?,
        b'[' => parse_nested_value(source, JsonType::Array, b'[', b']')?,
        _ => {
            let literal = parse_literal(source);
            match literal.first() {
                Some(b'-' | b'0'..=b'9') => JsonValue::new(JsonType::Number, literal),
                _ => return Err(FfsError::Error),
            }
        }
    };
    skip_comma(source)?;
    Ok(Some(value))
}

/// Decodes one character, resolving escapes and multi-byte UTF-8.
pub fn read_string_character(source: &mut JsonValue<'_>) -> FfsResult<Option<StringCharacter>> {
    let Some(first) = source.peek() else {
        return Ok(None);
    };
    source.advance(1);

    if first == b'\\' {
        let escape = source.take(1)?[0];
        let code_point = match escape {
            b'"' | b'\\' | b'/' => escape as u32,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => 0x0a,
            b'r' => 0x0d,
            b't' => 0x09,
            b'u' => read_unicode_escape(source)?,
            _ => return Err(FfsError::Error),
        };
        return Ok(Some(StringCharacter {
            code_point,
            is_escaped: true,
        }));
    }

    if first < 0x80 {
        return Ok(Some(StringCharacter {
            code_point: first as u32,
            is_escaped: false,
        }));
    }

    let (mut code_point, continuation) = if first & 0xe0 == 0xc0 {
        ((first & 0x1f) as u32, 1)
    } else if first & 0xf0 == 0xe0 {
        ((first & 0x0f) as u32, 2)
    } else if first & 0xf8 == 0xf0 {
        ((first & 0x07) as u32, 3)
    } else {
        return Err(FfsError::Error);
    };
    for &byte in source.take(continuation)? {
        if byte & 0xc0 != 0x80 {
            return Err(FfsError::Error);
        }
        code_point = (code_point << 6) | (byte & 0x3f) as u32;
    }
    Ok(Some(StringCharacter {
        code_point,
        is_escaped: false,
    }))
}

/// Code point of a `\uXXXX` escape whose `\u` was already consumed. A high
/// surrogate must be followed by an escaped low surrogate; the pair becomes
/// one supplementary code point.
fn read_unicode_escape(source: &mut JsonValue<'_>) -> FfsResult<u32> {
    let unit = parse_hex_u16(source.take(4)?)? as u32;
    match unit {
        0xd800..=0xdbff => {
            if !source.bytes().starts_with(b"\\u") {
                return Err(FfsError::Error);
            }
            source.advance(2);
            let low = parse_hex_u16(source.take(4)?)? as u32;
            if !(0xdc00..=0xdfff).contains(&low) {
                return Err(FfsError::Error);
            }
            Ok(0x1_0000 + ((unit - 0xd800) << 10) + (low - 0xdc00))
        }
        0xdc00..=0xdfff => Err(FfsError::Error),
        _ => Ok(unit),
    }
}

/// UTF-8 bytes for `code_point`; anything from 0x200000 up is rejected.
pub fn encode_utf8(code_point: u32) -> FfsResult<([u8; 4], usize)> {
    let cp = code_point;
    if cp < 0x80 {
        Ok(([cp as u8, 0, 0, 0], 1))
    } else if cp < 0x800 {
        Ok(([0xc0 | ((cp >> 6) & 0x1f) as u8, 0x80 | (cp & 0x3f) as u8, 0, 0], 2))
    } else if cp < 0x10000 {
        Ok((
            [
                0xe0 | ((cp >> 12) & 0x0f) as u8,
                0x80 | ((cp >> 6) & 0x3f) as u8,
                0x80 | (cp & 0x3f) as u8,
                0,
            ],
            3,
        ))
    } else if cp < 0x20_0000 {
        Ok((
            [
                0xf0 | ((cp >> 18) & 0x07) as u8,
                0x80 | ((cp >> 12) & 0x3f) as u8,
                0x80 | ((cp >> 6) & 0x3f) as u8,
                0x80 | (cp & 0x3f) as u8,
            ],
            4,
        ))
    } else {
        Err(FfsError::Error)
    }
}

/// Decodes the string value `source` into `destination` as UTF-8.
///
/// All or nothing: on failure `destination` keeps its previous data.
pub fn read_string_as_utf8(source: &JsonValue<'_>, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
    let mut source = *source;
    destination.transaction(|out| {
        while let Some(character) = read_string_character(&mut source)? {
            let (bytes, len) = encode_utf8(character.code_point)?;
            out.write(&bytes[..len])?;
        }
        Ok(())
    })
}

/// Decodes the escaped JSON string held in the data region of `stream`,
/// writing the UTF-8 result over it.
pub fn read_string_as_utf8_in_place(stream: &mut StreamBuffer<'_>) -> FfsResult<()> {
    stream.rewrite_data_in_place(|rest| {
        let mut source = JsonValue::new(JsonType::String, rest);
        let Some(character) = read_string_character(&mut source)? else {
            return Ok(None);
        };
        let (bytes, len) = encode_utf8(character.code_point)?;
        Ok(Some(RewriteStep {
            consumed: rest.len() - source.bytes().len(),
            bytes,
            len,
        }))
    })
}

pub fn convert_value_to_utf8(value: &JsonValue<'_>, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
    if value.is_empty() {
        return Err(FfsError::Error);
    }
    read_string_as_utf8(value, destination)
}

/// Decodes a string value into a fixed-capacity string.
pub fn convert_value_to_string<const N: usize>(value: &JsonValue<'_>) -> FfsResult<heapless::String<N>> {
    if value.is_empty() {
        return Err(FfsError::Error);
    }
    let mut source = *value;
    let mut out = heapless::String::new();
    while let Some(character) = read_string_character(&mut source)? {
        let ch = char::from_u32(character.code_point).ok_or(FfsError::Error)?;
        out.push(ch).map_err(|_| FfsError::Overrun)?;
    }
    Ok(out)
}

/// Whether the escaped key `key` decodes to exactly `expected`.
pub fn key_matches(key: &JsonValue<'_>, expected: &str) -> FfsResult<bool> {
    let mut source = *key;
    let mut remaining = expected.as_bytes();
    while let Some(character) = read_string_character(&mut source)? {
        let (bytes, len) = encode_utf8(character.code_point)?;
        if !remaining.starts_with(&bytes[..len]) {
            // Keep validating the rest so malformed keys still fail.
            while read_string_character(&mut source)?.is_some() {}
            return Ok(false);
        }
        remaining = &remaining[len..];
    }
    Ok(remaining.is_empty())
}

/// Decodes a string value whose text is itself wrapped in quotes
/// (`\"TEST\"` on the wire) and writes the inner text to `destination`.
///
/// `destination` needs room for the escaped form; decoding happens in place.
pub fn parse_quoted_string(value: &JsonValue<'_>, destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
    if value.is_empty() {
        return Err(FfsError::Error);
    }
    destination.write_with(|spare| {
        let mut scratch = StreamBuffer::output(spare);
        scratch.write(value.bytes())?;
        read_string_as_utf8_in_place(&mut scratch)?;
        if scratch.data_size() < 2 {
            return Err(FfsError::Error);
        }
        scratch.read_expected(b"\"")?;
        if scratch.last_written() != Some(b'"') {
            return Err(FfsError::Error);
        }
        scratch.unwrite(1)?;
        scratch.compact();
        Ok(scratch.data_size())
    })?;
    Ok(())
}

pub fn parse_int64(value: &JsonValue<'_>) -> FfsResult<i64> {
    if value.kind != JsonType::Number {
        return Err(FfsError::Error);
    }
    let mut digits = value.bytes();
    if digits.is_empty() {
        return Err(FfsError::Underrun);
    }
    let negative = digits[0] == b'-';
    if negative {
        digits = &digits[1..];
        if digits.is_empty() {
            return Err(FfsError::Underrun);
        }
    }
    if digits[0] == b'0' && digits.len() > 1 {
        return Err(FfsError::Error);
    }
    let mut magnitude = 0u64;
    for &digit in digits {
        if !digit.is_ascii_digit() {
            return Err(FfsError::Error);
        }
        if magnitude >= INT64_ACCUMULATE_LIMIT {
            return Err(FfsError::Error);
        }
        magnitude = magnitude * 10 + (digit - b'0') as u64;
    }
    let magnitude = magnitude as i64;
    Ok(if negative { -magnitude } else { magnitude })
}

pub fn parse_int32(value: &JsonValue<'_>) -> FfsResult<i32> {
    i32::try_from(parse_int64(value)?).map_err(|_| FfsError::Error)
}

/// Non-negative values up to `i32::MAX`; the service never sends more.
pub fn parse_uint32(value: &JsonValue<'_>) -> FfsResult<u32> {
    let value = parse_int32(value)?;
    u32::try_from(value).map_err(|_| FfsError::Error)
}

pub fn parse_boolean(value: &JsonValue<'_>) -> FfsResult<bool> {
    if value.kind != JsonType::Boolean {
        return Err(FfsError::Error);
    }
    Ok(value.bytes() == JSON_TRUE)
}

fn parse_string_value<'a>(source: &mut JsonValue<'a>) -> FfsResult<JsonValue<'a>> {
    source.take(1)?;
    let start = source.bytes();
    loop {
        let remaining = source.bytes().len();
        let character = read_string_character(source)?.ok_or(FfsError::Underrun)?;
        if character.code_point == b'"' as u32 && !character.is_escaped {
            return Ok(JsonValue::new(
                JsonType::String,
                &start[..start.len() - remaining],
            ));
        }
    }
}

fn parse_nested_value<'a>(
    source: &mut JsonValue<'a>,
    kind: JsonType,
    open: u8,
    close: u8,
) -> FfsResult<JsonValue<'a>> {
    source.take(1)?;
    let start = source.bytes();
    let mut depth = 1u32;
    let mut in_string = false;
    loop {
        let remaining = source.bytes().len();
        let character = read_string_character(source)?.ok_or(FfsError::Underrun)?;
        if character.is_escaped {
            continue;
        }
        if character.code_point == b'"' as u32 {
            in_string = !in_string;
        }
        if in_string {
            continue;
        }
        if character.code_point == open as u32 {
            depth += 1;
        } else if character.code_point == close as u32 {
            depth -= 1;
            if depth == 0 {
                return Ok(JsonValue::new(kind, &start[..start.len() - remaining]));
            }
        }
    }
}

fn parse_literal<'a>(source: &mut JsonValue<'a>) -> &'a [u8] {
    let bytes = source.bytes();
    let len = bytes
        .iter()
        .position(|&b| is_json_whitespace(b) || b == b',')
        .unwrap_or(bytes.len());
    source.advance(len);
    &bytes[..len]
}

fn parse_hex_u16(digits: &[u8]) -> FfsResult<u16> {
    let mut value = 0u16;
    for &digit in digits {
        let nibble = match digit {
            b'0'..=b'9' => digit - b'0',
            b'a'..=b'f' => digit - b'a' + 10,
            b'A'..=b'F' => digit - b'A' + 10,
            _ => return Err(FfsError::Error),
        };
        value = (value << 4) | nibble as u16;
    }
    Ok(value)
}

const fn is_json_whitespace(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | b'\r' | b' ')
}

fn skip_whitespace(source: &mut JsonValue<'_>) {
    while source.peek().is_some_and(is_json_whitespace) {
        source.advance(1);
    }
}

fn skip_character(source: &mut JsonValue<'_>, expected: u8) -> FfsResult<()> {
    if source.take(1)?[0] != expected {
        return Err(FfsError::Error);
    }
    Ok(())
}

fn skip_comma(source: &mut JsonValue<'_>) -> FfsResult<()> {
    skip_whitespace(source);
    if source.peek().is_some() {
        skip_character(source, b',')?;
    }
    Ok(())
}
