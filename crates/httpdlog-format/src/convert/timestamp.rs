//! Timestamp parsing and timestamp-group combination.
//!
//! All results are UTC epoch microseconds. Three independent parsers feed the
//! group combiner: the bracketed Apache default form, epoch integers at three
//! scales, and a byte-by-byte strftime state machine for `%{...}t` templates.

use chrono::{DateTime, NaiveDate, NaiveTime};

use crate::types::{TimestampKind, MICROS_PER_MSEC, MICROS_PER_SEC};

/// Parse the Apache default timestamp (`10/Oct/2000:13:55:36 -0700`,
/// brackets already stripped by the recognizer) into UTC microseconds.
pub fn parse_apache_timestamp(value: &str) -> Option<i64> {
    DateTime::parse_from_str(value, "%d/%b/%Y:%H:%M:%S %z")
        .ok()
        .map(|dt| dt.timestamp_micros())
}

/// Parse a `[+-]HHMM` timezone offset into seconds east of UTC.
pub fn parse_tz_offset(value: &str) -> Option<i32> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || !matches!(bytes[0], b'+' | b'-') {
        return None;
    }
    let sign = if bytes[0] == b'-' { -1 } else { 1 };
    let hours: i32 = value[1..3].parse().ok()?;
    let minutes: i32 = value[3..5].parse().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}

/// Parse a value against a strftime template.
///
/// Supports `%Y %y %m %d %e %b %h %B %H %I %M %S %T %R %z %Z %%` plus the
/// `%-` no-pad flag; `%Z` is consumed without affecting the result, so output
/// never depends on the locale. Returns UTC microseconds (an embedded `%z` is
/// applied), or `None` when the value does not fit the template or the date
/// is out of range.
pub fn parse_strftime(value: &str, format: &str) -> Option<i64> {
    let mut year = 0i32;
    let mut month = 0u32;
    let mut day = 0u32;
    let mut hour = 0u32;
    let mut minute = 0u32;
    let mut second = 0u32;
    let mut tz_offset: Option<i32> = None;

    let val = value.as_bytes();
    let mut vp = 0usize;
    let fmt = format.as_bytes();
    let mut fp = 0usize;

    while fp < fmt.len() {
        if fmt[fp] != b'%' || fp + 1 >= fmt.len() {
            if val.get(vp) != Some(&fmt[fp]) {
                return None;
            }
            vp += 1;
            fp += 1;
            continue;
        }

        let mut spec = fmt[fp + 1];
        fp += 2;
        if spec == b'-' && fp < fmt.len() {
            spec = fmt[fp];
            fp += 1;
        }

        match spec {
            b'Y' => year = take_digits(val, &mut vp, 4)? as i32,
            b'y' => {
                let short = take_digits(val, &mut vp, 2)? as i32;
                year = if short >= 70 { 1900 + short } else { 2000 + short };
            }
            b'm' => month = take_digits(val, &mut vp, 2)?,
            b'd' => day = take_digits(val, &mut vp, 2)?,
            b'e' => {
                if val.get(vp) == Some(&b' ') {
                    vp += 1;
                }
                day = take_up_to_two_digits(val, &mut vp)?;
            }
            b'b' | b'h' => month = take_month_abbrev(value, &mut vp)?,
            b'B' => month = take_month_name(value, &mut vp)?,
            b'H' | b'I' => hour = take_digits(val, &mut vp, 2)?,
            b'M' => minute = take_digits(val, &mut vp, 2)?,
            b'S' => second = take_digits(val, &mut vp, 2)?,
            b'T' => {
                hour = take_digits(val, &mut vp, 2)?;
                expect(val, &mut vp, b':')?;
                minute = take_digits(val, &mut vp, 2)?;
                expect(val, &mut vp, b':')?;
                second = take_digits(val, &mut vp, 2)?;
            }
            b'R' => {
                hour = take_digits(val, &mut vp, 2)?;
                expect(val, &mut vp, b':')?;
                minute = take_digits(val, &mut vp, 2)?;
            }
            b'z' => {
                let end = (vp + 5).min(val.len());
                tz_offset = Some(parse_tz_offset(value.get(vp..end)?)?);
                vp = end;
            }
            b'Z' => {
                while vp < val.len() && val[vp].is_ascii_alphabetic() {
                    vp += 1;
                }
            }
            b'%' => expect(val, &mut vp, b'%')?,
            // Unsupported specifiers consume no input.
            _ => {}
        }
    }

    if year == 0 {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    let mut micros = date.and_time(time).and_utc().timestamp_micros();
    if let Some(offset) = tz_offset {
        micros -= i64::from(offset) * MICROS_PER_SEC;
    }
    Some(micros)
}

fn expect(val: &[u8], pos: &mut usize, byte: u8) -> Option<()> {
    if val.get(*pos) == Some(&byte) {
        *pos += 1;
        Some(())
    } else {
        None
    }
}

fn take_digits(val: &[u8], pos: &mut usize, count: usize) -> Option<u32> {
    let end = pos.checked_add(count)?;
    if end > val.len() {
        return None;
    }
    let mut out = 0u32;
    for &b in &val[*pos..end] {
        if !b.is_ascii_digit() {
            return None;
        }
        out = out * 10 + u32::from(b - b'0');
    }
    *pos = end;
    Some(out)
}

fn take_up_to_two_digits(val: &[u8], pos: &mut usize) -> Option<u32> {
    let first = *val.get(*pos)?;
    if !first.is_ascii_digit() {
        return None;
    }
    let two = val.get(*pos + 1).is_some_and(u8::is_ascii_digit);
    take_digits(val, pos, if two { 2 } else { 1 })
}

const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn take_month_abbrev(value: &str, pos: &mut usize) -> Option<u32> {
    let slice = value.get(*pos..*pos + 3)?;
    let month = MONTH_ABBREVS.iter().position(|m| *m == slice)? as u32 + 1;
    *pos += 3;
    Some(month)
}

fn take_month_name(value: &str, pos: &mut usize) -> Option<u32> {
    for (idx, name) in MONTH_NAMES.iter().enumerate() {
        if value[*pos..].starts_with(name) {
            *pos += name.len();
            return Some(idx as u32 + 1);
        }
    }
    None
}

/// One `%t` capture inside a timestamp group.
#[derive(Debug)]
pub struct TimestampComponent<'a> {
    pub kind: TimestampKind,
    /// The strftime template for [`TimestampKind::Strftime`] components.
    pub strftime: Option<&'a str>,
    /// The captured substring.
    pub value: &'a str,
}

/// Combine the captures of one timestamp group into UTC microseconds.
///
/// The base epoch comes from the first Apache-default or epoch component that
/// parses. Failing that, all wall-clock strftime components are joined
/// (values and templates space-separated) and parsed together. A bare-`%z`
/// component carries only a timezone offset; it is subtracted from whichever
/// base is established, no matter which tier supplied it. Fractional
/// components accumulate separately and are added at the end. With no base at
/// all the group is NULL.
pub fn combine_components(components: &[TimestampComponent<'_>]) -> Option<i64> {
    let mut base: Option<i64> = None;
    let mut frac_micros = 0i64;
    let mut tz_offset: Option<i32> = None;
    let mut strftime_value = String::new();
    let mut strftime_format = String::new();

    for component in components {
        match component.kind {
            TimestampKind::ApacheDefault => {
                if base.is_none() {
                    base = parse_apache_timestamp(component.value);
                }
            }
            TimestampKind::EpochSec => {
                if base.is_none() {
                    base = component
                        .value
                        .parse::<i64>()
                        .ok()
                        .map(|v| v * MICROS_PER_SEC);
                }
            }
            TimestampKind::EpochMsec => {
                if base.is_none() {
                    base = component
                        .value
                        .parse::<i64>()
                        .ok()
                        .map(|v| v * MICROS_PER_MSEC);
                }
            }
            TimestampKind::EpochUsec => {
                if base.is_none() {
                    base = component.value.parse::<i64>().ok();
                }
            }
            TimestampKind::FracMsec => {
                if let Ok(v) = component.value.parse::<i64>() {
                    frac_micros += v * MICROS_PER_MSEC;
                }
            }
            TimestampKind::FracUsec => {
                if let Ok(v) = component.value.parse::<i64>() {
                    frac_micros += v;
                }
            }
            TimestampKind::Strftime => {
                // A bare `%z` holds no wall-clock digits; route it to the
                // offset accumulator instead of the combined template. A `%z`
                // embedded in a longer template is applied by parse_strftime.
                if component.strftime == Some("%z") {
                    if tz_offset.is_none() {
                        tz_offset = parse_tz_offset(component.value);
                    }
                    continue;
                }
                if !strftime_format.is_empty() {
                    strftime_value.push(' ');
                    strftime_format.push(' ');
                }
                strftime_value.push_str(component.value);
                strftime_format.push_str(component.strftime.unwrap_or_default());
            }
        }
    }

    if base.is_none() && !strftime_format.is_empty() {
        base = parse_strftime(&strftime_value, &strftime_format);
    }

    // An offset with no wall clock yields no base, hence NULL.
    base.map(|b| b + frac_micros - i64::from(tz_offset.unwrap_or(0)) * MICROS_PER_SEC)
}
