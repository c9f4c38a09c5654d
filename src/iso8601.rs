//! ISO-8601 durations, as the service sends them in `waitTime`.
//!
//! Supported form: `P[nW][nD][T[nH][nM][n[.fff]S]]`. Calendar units (years,
//! months) have no fixed length and are rejected.

use embassy_time::Duration;

use crate::error::{FfsError, FfsResult};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: u64 = 7 * MS_PER_DAY;
// Keeps the tick conversion inside `Duration` from overflowing.
const MAX_DURATION_MS: u64 = u32::MAX as u64 * MS_PER_SECOND;

// Designators in the order they may appear, with their length in ms.
const DATE_UNITS: [(u8, u64); 2] = [(b'W', MS_PER_WEEK), (b'D', MS_PER_DAY)];
const TIME_UNITS: [(u8, u64); 3] = [
    (b'H', MS_PER_HOUR),
    (b'M', MS_PER_MINUTE),
    (b'S', MS_PER_SECOND),
];

pub fn parse_duration(text: &str) -> FfsResult<Duration> {
    parse_duration_ms(text.as_bytes()).map(Duration::from_millis)
}

fn parse_duration_ms(text: &[u8]) -> FfsResult<u64> {
    if text.first() != Some(&b'P') {
        return Err(FfsError::Error);
    }
    let mut i = 1usize;
    let mut total = 0u64;
    let mut components = 0usize;

    let (date_ms, date_components, next_i) = parse_section(text, i, &DATE_UNITS, false)?;
    total = total.checked_add(date_ms).ok_or(FfsError::Error)?;
    components += date_components;
    i = next_i;

    if i < text.len() && text[i] == b'T' {
        let (time_ms, time_components, next_i) = parse_section(text, i + 1, &TIME_UNITS, true)?;
        if time_components == 0 {
            return Err(FfsError::Error);
        }
        total = total.checked_add(time_ms).ok_or(FfsError::Error)?;
        components += time_components;
        i = next_i;
    }

    if i != text.len() || components == 0 || total > MAX_DURATION_MS {
        return Err(FfsError::Error);
    }
    Ok(total)
}

/// Reads `n<unit>` groups while their designators follow `units` in order.
/// Returns the sum in ms, the number of groups read and the next index.
fn parse_section(
    text: &[u8],
    mut i: usize,
    units: &[(u8, u64)],
    allow_fraction: bool,
) -> FfsResult<(u64, usize, usize)> {
    let mut total = 0u64;
    let mut components = 0usize;
    let mut next_unit = 0usize;

    while i < text.len() && text[i].is_ascii_digit() {
        let (whole, after_whole) = parse_u64_ascii(text, i)?;
        let (fraction_ms, after_fraction) = if text.get(after_whole) == Some(&b'.') {
            let (fraction_ms, next_i) = parse_fraction_ms(text, after_whole + 1)?;
            (Some(fraction_ms), next_i)
        } else {
            (None, after_whole)
        };

        let designator = *text.get(after_fraction).ok_or(FfsError::Error)?;
        let offset = units[next_unit..]
            .iter()
            .position(|(unit, _)| *unit == designator)
            .ok_or(FfsError::Error)?;
        let (unit, unit_ms) = units[next_unit + offset];
        next_unit += offset + 1;

        let mut value = whole.checked_mul(unit_ms).ok_or(FfsError::Error)?;
        if let Some(fraction_ms) = fraction_ms {
            if !allow_fraction || unit != b'S' {
                return Err(FfsError::Error);
            }
            value = value.checked_add(fraction_ms).ok_or(FfsError::Error)?;
        }
        total = total.checked_add(value).ok_or(FfsError::Error)?;
        components += 1;
        i = after_fraction + 1;
    }
    Ok((total, components, i))
}

fn parse_u64_ascii(bytes: &[u8], mut i: usize) -> FfsResult<(u64, usize)> {
    let start = i;
    let mut value = 0u64;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        value = value
            .checked_mul(10)
            .and_then(|value| value.checked_add((bytes[i] - b'0') as u64))
            .ok_or(FfsError::Error)?;
        i += 1;
    }
    if i == start {
        return Err(FfsError::Error);
    }
    Ok((value, i))
}

/// Digits after the decimal point, truncated to milliseconds.
fn parse_fraction_ms(bytes: &[u8], mut i: usize) -> FfsResult<(u64, usize)> {
    let start = i;
    let mut value = 0u64;
    let mut scale = 100u64;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        value += (bytes[i] - b'0') as u64 * scale;
        scale /= 10;
        i += 1;
    }
    if i == start {
        return Err(FfsError::Error);
    }
    Ok((value, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_designator() {
        assert_eq!(parse_duration("PT5S"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("PT2M"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("PT1H"), Ok(Duration::from_secs(3_600)));
        assert_eq!(parse_duration("P1D"), Ok(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("P1W"), Ok(Duration::from_secs(604_800)));
    }

    #[test]
    fn combines_date_and_time_parts() {
        assert_eq!(
            parse_duration("P1DT1H1M1S"),
            Ok(Duration::from_secs(86_400 + 3_600 + 60 + 1))
        );
        assert_eq!(parse_duration("PT0S"), Ok(Duration::from_millis(0)));
    }

    #[test]
    fn fractional_seconds_keep_millisecond_precision() {
        assert_eq!(parse_duration("PT1.5S"), Ok(Duration::from_millis(1_500)));
        assert_eq!(parse_duration("PT0.0259S"), Ok(Duration::from_millis(25)));
    }

    #[test]
    fn rejects_malformed_durations() {
        for text in [
            "", "P", "PT", "5S", "T5S", "P5", "PT5", "P1Y", "P1M", "PT1S2M", "PT1S1S", "P1DT",
            "PT1.5M", "P1.5D", "PT.5S", "PT1.S", "PT5S ", "pt5s",
        ] {
            assert_eq!(parse_duration(text), Err(FfsError::Error), "{text:?}");
        }
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(parse_duration("PT99999999999999999999S"), Err(FfsError::Error));
        assert_eq!(parse_duration("P9999999999999999W"), Err(FfsError::Error));
        assert_eq!(parse_duration("P100000W"), Err(FfsError::Error));
    }
}
