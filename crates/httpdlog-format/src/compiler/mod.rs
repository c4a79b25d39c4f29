//! Format compiler: LogFormat string -> [`CompiledFormat`].
//!
//! Compilation runs once per logical scan. The result owns all of its tables
//! and the compiled recognizer; workers borrow it immutably and keep their
//! regex scratch in a per-worker [`LineScratch`](crate::recognizer::LineScratch).

mod regex_gen;
mod resolver;
mod tokenizer;

use regex::Regex;

use crate::error::FormatError;
use crate::recognizer::LineScratch;
use crate::types::{LogicalType, TimestampKind};

/// A compiled directive occurrence.
#[derive(Debug, Clone)]
pub struct FormatField {
    /// Canonical directive tag (`%h`, `%>s`, `%i`, `%^ti`, ...).
    pub directive: String,
    /// Text inside `{...}`, if any.
    pub modifier: Option<String>,
    /// Column name after collision resolution.
    pub column_name: String,
    pub logical_type: LogicalType,
    /// True when the field sits between a pair of literal `"` characters.
    pub is_quoted: bool,
    /// Skipped fields participate in the recognizer but emit no column.
    pub should_skip: bool,
    /// Request-line sub-columns suppressed by individual directives.
    pub skip_method: bool,
    pub skip_path: bool,
    pub skip_query_string: bool,
    pub skip_protocol: bool,
    /// Present iff this is a `%t` field.
    pub timestamp: Option<TimestampSpec>,
    pub(crate) priority: u8,
    pub(crate) suffix: &'static str,
}

impl FormatField {
    /// Whether this field is one of the request-line directives.
    pub fn is_request(&self) -> bool {
        matches!(self.directive.as_str(), "%r" | "%>r" | "%<r")
    }
}

/// Timestamp classification for a `%t` field.
#[derive(Debug, Clone)]
pub struct TimestampSpec {
    pub kind: TimestampKind,
    /// The strftime template, for [`TimestampKind::Strftime`] fields.
    pub strftime: Option<String>,
    /// True for `%{end:...}t`; begin is the default polarity.
    pub is_end: bool,
    /// Index into [`CompiledFormat::timestamp_groups`].
    pub group: usize,
}

/// A maximal contiguous run of `%t` fields with the same begin/end polarity.
///
/// The group produces exactly one TIMESTAMP column; only its first field
/// contributes to the schema.
#[derive(Debug, Clone)]
pub struct TimestampGroup {
    /// Field indices, in format order.
    pub fields: Vec<usize>,
    pub is_end: bool,
}

/// Interleaved literal/field structure of the format string, kept so regex
/// generation walks the exact same shape the tokenizer saw.
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    Literal(String),
    Field(usize),
}

/// An immutable compiled LogFormat.
///
/// Contains the ordered field list, timestamp groups, the anchored line
/// recognizer, and the mapping from fields to regex capture groups.
#[derive(Debug)]
pub struct CompiledFormat {
    format_str: String,
    fields: Vec<FormatField>,
    timestamp_groups: Vec<TimestampGroup>,
    regex: Regex,
    capture_count: usize,
    /// Per-field capture group index (1-based); `None` for skipped non-`%t`
    /// fields, which match inside non-capturing groups.
    capture_index: Vec<Option<usize>>,
}

impl CompiledFormat {
    /// Compile a LogFormat string.
    ///
    /// Fails with [`FormatError::InvalidFormat`] on malformed `%{...}` and
    /// [`FormatError::Regex`] if the generated pattern does not compile.
    pub fn compile(format_str: &str) -> Result<Self, FormatError> {
        let (segments, mut fields) = tokenizer::tokenize(format_str)?;
        let timestamp_groups = resolver::resolve(&mut fields);
        let generated = regex_gen::generate(&segments, &fields);
        let regex = Regex::new(&generated.pattern)?;

        debug_assert_eq!(regex.captures_len() - 1, generated.capture_count);

        Ok(Self {
            format_str: format_str.to_owned(),
            fields,
            timestamp_groups,
            regex,
            capture_count: generated.capture_count,
            capture_index: generated.capture_index,
        })
    }

    /// The original format string.
    pub fn format_str(&self) -> &str {
        &self.format_str
    }

    /// Compiled fields, in format order.
    pub fn fields(&self) -> &[FormatField] {
        &self.fields
    }

    /// Timestamp groups, in format order.
    pub fn timestamp_groups(&self) -> &[TimestampGroup] {
        &self.timestamp_groups
    }

    /// Number of capturing groups in the recognizer.
    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    /// The 1-based capture group index for a field, if it captures.
    pub fn capture_index(&self, field: usize) -> Option<usize> {
        self.capture_index.get(field).copied().flatten()
    }

    /// The generated recognizer pattern (primarily for diagnostics).
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Allocate per-worker match scratch sized to this recognizer.
    pub fn new_scratch(&self) -> LineScratch {
        LineScratch::new(&self.regex)
    }

    /// Match a line against the recognizer, filling `scratch` with capture
    /// offsets. Returns false when the line does not parse.
    pub fn recognize(&self, line: &str, scratch: &mut LineScratch) -> bool {
        scratch.run(&self.regex, line)
    }
}
