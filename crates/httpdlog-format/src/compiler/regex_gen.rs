//! Recognizer pattern generation.
//!
//! Walks the tokenized segments and emits a single anchored pattern. Every
//! `%t` field contributes a capturing group regardless of its skip flag
//! (timestamp groups need all of their components); other skipped fields
//! match inside non-capturing groups.

use crate::compiler::{FormatField, Segment};
use crate::types::TimestampKind;

pub(crate) struct GeneratedPattern {
    pub pattern: String,
    /// Per-field 1-based capture group index; `None` for non-capturing fields.
    pub capture_index: Vec<Option<usize>>,
    pub capture_count: usize,
}

pub(crate) fn generate(segments: &[Segment], fields: &[FormatField]) -> GeneratedPattern {
    let mut pattern = String::with_capacity(64);
    let mut capture_index = vec![None; fields.len()];
    let mut captures = 0;

    pattern.push('^');

    for segment in segments {
        match segment {
            Segment::Literal(text) => push_literal(&mut pattern, text),
            Segment::Field(idx) => {
                let field = &fields[*idx];
                if let Some(spec) = &field.timestamp {
                    captures += 1;
                    capture_index[*idx] = Some(captures);
                    push_timestamp(&mut pattern, spec.kind, spec.strftime.as_deref());
                } else if field.should_skip {
                    pattern.push_str(if field.is_quoted {
                        r#"(?:[^"]*)"#
                    } else {
                        r"(?:\S+)"
                    });
                } else {
                    captures += 1;
                    capture_index[*idx] = Some(captures);
                    pattern.push_str(if field.is_quoted {
                        r#"([^"]*)"#
                    } else {
                        r"(\S+)"
                    });
                }
            }
        }
    }

    pattern.push('$');

    GeneratedPattern {
        pattern,
        capture_index,
        capture_count: captures,
    }
}

/// Emit literal text: whitespace runs collapse to `\s+`, metacharacters are
/// escaped, everything else passes through.
fn push_literal(pattern: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' || c == '\t' {
            pattern.push_str(r"\s+");
            while matches!(chars.peek(), Some(' ' | '\t')) {
                chars.next();
            }
            continue;
        }
        push_escaped(pattern, c);
    }
}

fn push_escaped(pattern: &mut String, c: char) {
    if matches!(
        c,
        '.' | '*' | '+' | '?' | '^' | '$' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
    ) {
        pattern.push('\\');
    }
    pattern.push(c);
}

/// Emit the capturing group for a `%t` field, sized to its representation.
fn push_timestamp(pattern: &mut String, kind: TimestampKind, strftime: Option<&str>) {
    match kind {
        TimestampKind::ApacheDefault => pattern.push_str(r"\[([^\]]+)\]"),
        TimestampKind::EpochSec | TimestampKind::EpochMsec | TimestampKind::EpochUsec => {
            pattern.push_str(r"(\d+)");
        }
        TimestampKind::FracMsec => pattern.push_str(r"(\d{3})"),
        TimestampKind::FracUsec => pattern.push_str(r"(\d{6})"),
        TimestampKind::Strftime => {
            pattern.push('(');
            pattern.push_str(&strftime_pattern(strftime.unwrap_or_default()));
            pattern.push(')');
        }
    }
}

/// Translate a strftime template into a recognizer fragment.
fn strftime_pattern(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            push_escaped(&mut out, c);
            continue;
        }
        let Some(spec) = chars.next() else {
            push_escaped(&mut out, '%');
            break;
        };
        // Apache passes `%-d`-style no-pad flags through to strftime.
        let spec = if spec == '-' { chars.next().unwrap_or('-') } else { spec };

        match spec {
            'Y' => out.push_str(r"\d{4}"),
            'y' | 'm' | 'd' | 'H' | 'I' | 'M' | 'S' => out.push_str(r"\d{2}"),
            'e' => out.push_str(r"\s?\d{1,2}"),
            'j' => out.push_str(r"\d{3}"),
            'b' | 'h' | 'a' => out.push_str(r"[A-Za-z]{3}"),
            'B' | 'A' | 'Z' => out.push_str(r"[A-Za-z]+"),
            'T' => out.push_str(r"\d{2}:\d{2}:\d{2}"),
            'R' => out.push_str(r"\d{2}:\d{2}"),
            'z' => out.push_str(r"[+-]\d{4}"),
            'p' => out.push_str(r"[AP]M"),
            'f' => out.push_str(r"\d+"),
            '%' => out.push('%'),
            other => push_escaped(&mut out, other),
        }
    }

    out
}
