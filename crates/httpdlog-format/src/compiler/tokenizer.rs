//! LogFormat string tokenizer.
//!
//! Splits a format string into literal text and directive fields in a single
//! left-to-right scan, tracking the literal-quote state so fields that sit
//! between a pair of `"` characters are tagged as quoted.

use crate::compiler::{FormatField, Segment, TimestampSpec};
use crate::error::FormatError;
use crate::registry;
use crate::types::TimestampKind;

/// Tokenize a format string into interleaved literal and field segments.
///
/// Returns the segment list plus the field table the segments index into.
pub(crate) fn tokenize(format: &str) -> Result<(Vec<Segment>, Vec<FormatField>), FormatError> {
    let mut segments = Vec::new();
    let mut fields: Vec<FormatField> = Vec::new();
    let mut literal = String::new();
    let mut in_quotes = false;

    let bytes = format.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];

        if c == b'"' {
            in_quotes = !in_quotes;
            literal.push('"');
            pos += 1;
            continue;
        }

        if c != b'%' {
            // Format strings are ASCII in every directive position, but the
            // literal text may be arbitrary UTF-8.
            let ch = format[pos..].chars().next().unwrap_or('\u{FFFD}');
            literal.push(ch);
            pos += ch.len_utf8();
            continue;
        }

        // An escaped percent is literal text, not a directive.
        if bytes.get(pos + 1) == Some(&b'%') {
            literal.push('%');
            pos += 2;
            continue;
        }

        let directive_start = pos;
        pos += 1;
        if pos >= bytes.len() {
            return Err(FormatError::InvalidFormat {
                position: directive_start,
                message: "format string ends with a bare '%'".to_owned(),
            });
        }

        // Optional status-code condition: `!?` followed by digits and commas.
        // Parsed and discarded; it only affects whether Apache logs a dash.
        if bytes[pos] == b'!' || bytes[pos].is_ascii_digit() {
            if bytes[pos] == b'!' {
                pos += 1;
            }
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b',') {
                pos += 1;
            }
            if pos >= bytes.len() {
                return Err(FormatError::InvalidFormat {
                    position: directive_start,
                    message: "status-code condition is not followed by a directive".to_owned(),
                });
            }
        }

        let (tag, modifier) = match bytes[pos] {
            b'{' => {
                let close = format[pos + 1..].find('}').ok_or(FormatError::InvalidFormat {
                    position: directive_start,
                    message: "unterminated '{' in directive modifier".to_owned(),
                })? + pos + 1;
                let modifier = format[pos + 1..close].to_owned();
                pos = close + 1;
                let tag = read_directive_letter(format, bytes, directive_start, &mut pos)?;
                (tag, Some(modifier))
            }
            b'<' | b'>' => {
                let origin = bytes[pos] as char;
                pos += 1;
                let letter = directive_letter(bytes, directive_start, pos)?;
                pos += 1;
                (format!("%{origin}{letter}"), None)
            }
            _ => {
                let tag = read_directive_letter(format, bytes, directive_start, &mut pos)?;
                (tag, None)
            }
        };

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let field = build_field(&tag, modifier, in_quotes);
        segments.push(Segment::Field(fields.len()));
        fields.push(field);
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok((segments, fields))
}

/// Read a single directive letter or a `^ti`/`^to` trailer digraph, advancing
/// `pos` past it.
fn read_directive_letter(
    format: &str,
    bytes: &[u8],
    directive_start: usize,
    pos: &mut usize,
) -> Result<String, FormatError> {
    if bytes.get(*pos) == Some(&b'^') {
        let digraph = format.get(*pos + 1..*pos + 3);
        return match digraph {
            Some("ti") | Some("to") => {
                let tag = format!("%^{}", digraph.unwrap_or_default());
                *pos += 3;
                Ok(tag)
            }
            _ => Err(FormatError::InvalidFormat {
                position: directive_start,
                message: "'^' must be followed by the 'ti' or 'to' trailer digraph".to_owned(),
            }),
        };
    }

    let letter = directive_letter(bytes, directive_start, *pos)?;
    *pos += 1;
    Ok(format!("%{letter}"))
}

fn directive_letter(bytes: &[u8], directive_start: usize, pos: usize) -> Result<char, FormatError> {
    match bytes.get(pos) {
        Some(&c) if c.is_ascii_alphabetic() => Ok(c as char),
        _ => Err(FormatError::InvalidFormat {
            position: directive_start,
            message: "directive is missing its format letter".to_owned(),
        }),
    }
}

/// Resolve a tokenized directive occurrence into a compiled field with its
/// default column name, type, and (for `%t`) timestamp classification.
fn build_field(tag: &str, modifier: Option<String>, is_quoted: bool) -> FormatField {
    let timestamp = if tag == "%t" {
        Some(classify_timestamp(modifier.as_deref()))
    } else {
        None
    };

    let (column_name, logical_type, priority, suffix) = registry::resolve(tag, modifier.as_deref());

    FormatField {
        directive: tag.to_owned(),
        modifier,
        column_name,
        logical_type,
        is_quoted,
        should_skip: false,
        skip_method: false,
        skip_path: false,
        skip_query_string: false,
        skip_protocol: false,
        timestamp,
        priority,
        suffix,
    }
}

/// Classify a `%t` modifier: strip the `begin:`/`end:` prefix (begin is the
/// default polarity), then sort into epoch, fractional, or strftime forms.
fn classify_timestamp(modifier: Option<&str>) -> TimestampSpec {
    let Some(modifier) = modifier else {
        return TimestampSpec {
            kind: TimestampKind::ApacheDefault,
            strftime: None,
            is_end: false,
            group: 0,
        };
    };

    let (is_end, body) = if let Some(rest) = modifier.strip_prefix("end:") {
        (true, rest)
    } else if let Some(rest) = modifier.strip_prefix("begin:") {
        (false, rest)
    } else {
        (false, modifier)
    };

    if body.is_empty() {
        return TimestampSpec {
            kind: TimestampKind::ApacheDefault,
            strftime: None,
            is_end,
            group: 0,
        };
    }

    let kind = TimestampKind::classify(body);
    let strftime = match kind {
        TimestampKind::Strftime => Some(body.to_owned()),
        _ => None,
    };

    TimestampSpec {
        kind,
        strftime,
        is_end,
        group: 0,
    }
}
