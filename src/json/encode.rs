use super::{JSON_FALSE, JSON_TRUE};
use crate::{
    error::{FfsError, FfsResult},
    stream::StreamBuffer,
};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

pub fn encode_object_start(destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
    destination.write_byte(b'{')
}

pub fn encode_object_end(destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
    destination.write_byte(b'}')
}

pub fn encode_array_start(destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
    destination.write_byte(b'[')
}

pub fn encode_array_end(destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
    destination.write_byte(b']')
}

pub fn encode_separator(destination: &mut StreamBuffer<'_>) -> FfsResult<()> {
    destination.write_byte(b',')
}

/// Writes `source` with JSON string escaping but without the surrounding
/// quotes. Bytes from 0x20 up other than `"` and `\` pass through unchanged,
/// so multi-byte UTF-8 is emitted as-is.
pub fn encode_string(destination: &mut StreamBuffer<'_>, source: &[u8]) -> FfsResult<()> {
    destination.transaction(|out| {
        for &byte in source {
            match byte {
                b'"' => out.write(b"\\\"")?,
                b'\\' => out.write(b"\\\\")?,
                0x00..=0x1f => out.write(&[
                    b'\\',
                    b'u',
                    b'0',
                    b'0',
                    HEX_DIGITS[(byte >> 4) as usize],
                    HEX_DIGITS[(byte & 0x0f) as usize],
                ])?,
                _ => out.write_byte(byte)?,
            }
        }
        Ok(())
    })
}

pub fn encode_string_value(destination: &mut StreamBuffer<'_>, value: &[u8]) -> FfsResult<()> {
    destination.transaction(|out| {
        out.write_byte(b'"')?;
        encode_string(out, value)?;
        out.write_byte(b'"')
    })
}

/// `"key":`
pub fn encode_string_key(destination: &mut StreamBuffer<'_>, key: &str) -> FfsResult<()> {
    destination.transaction(|out| {
        encode_string_value(out, key.as_bytes())?;
        out.write_byte(b':')
    })
}

pub fn encode_string_field(destination: &mut StreamBuffer<'_>, key: &str, value: &str) -> FfsResult<()> {
    encode_stream_field(destination, key, value.as_bytes())
}

pub fn encode_stream_field(destination: &mut StreamBuffer<'_>, key: &str, value: &[u8]) -> FfsResult<()> {
    destination.transaction(|out| {
        encode_string_key(out, key)?;
        encode_string_value(out, value)
    })
}

/// `"key":"\"value\""`: the value travels as a quoted string inside a string.
pub fn encode_quoted_stream_field(
    destination: &mut StreamBuffer<'_>,
    key: &str,
    value: &[u8],
) -> FfsResult<()> {
    destination.transaction(|out| {
        encode_string_key(out, key)?;
        out.write(b"\"\\\"")?;
        encode_string(out, value)?;
        out.write(b"\\\"\"")
    })
}

pub fn encode_boolean_field(destination: &mut StreamBuffer<'_>, key: &str, value: bool) -> FfsResult<()> {
    destination.transaction(|out| {
        encode_string_key(out, key)?;
        out.write(if value { JSON_TRUE } else { JSON_FALSE })
    })
}

pub fn encode_int32_field(destination: &mut StreamBuffer<'_>, key: &str, value: i32) -> FfsResult<()> {
    encode_int64_field(destination, key, value as i64)
}

/// Values above `i32::MAX` are `Error`: the decoder reads `uint32` fields
/// through `int32`, so anything larger could not be read back.
pub fn encode_uint32_field(destination: &mut StreamBuffer<'_>, key: &str, value: u32) -> FfsResult<()> {
    let value = i32::try_from(value).map_err(|_| FfsError::Error)?;
    encode_int64_field(destination, key, value as i64)
}

pub fn encode_int64_field(destination: &mut StreamBuffer<'_>, key: &str, value: i64) -> FfsResult<()> {
    destination.transaction(|out| {
        encode_string_key(out, key)?;
        write_decimal(out, value)
    })
}

fn write_decimal(destination: &mut StreamBuffer<'_>, value: i64) -> FfsResult<()> {
    let mut digits = [0u8; 20];
    let mut idx = digits.len();
    let mut magnitude = value.unsigned_abs();
    loop {
        idx -= 1;
        digits[idx] = b'0' + (magnitude % 10) as u8;
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }
    if value < 0 {
        idx -= 1;
        digits[idx] = b'-';
    }
    destination.write(&digits[idx..])
}
