//! Schema emission and the materialization plan.
//!
//! Expands the compiled field list into the final ordered column list. Each
//! output column carries exactly one [`ColumnRule`] with the capture indices
//! it needs pre-bound, so the materializer never walks the field list at row
//! time.

use std::sync::Arc;

use arrow::datatypes::{Field, Schema, SchemaRef};

use crate::compiler::CompiledFormat;
use crate::registry;
use crate::types::{LogicalType, TimestampKind, MICROS_PER_MSEC, MICROS_PER_SEC};

/// Name of the always-present file-provenance column.
pub const LOG_FILE_COLUMN: &str = "log_file";

/// Raw-mode diagnostic column names.
pub const LINE_NUMBER_COLUMN: &str = "line_number";
pub const PARSE_ERROR_COLUMN: &str = "parse_error";
pub const RAW_LINE_COLUMN: &str = "raw_line";

/// Which piece of a decomposed request line a column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPart {
    Method,
    Path,
    QueryString,
    Protocol,
}

/// One `%t` capture feeding a timestamp column.
#[derive(Debug, Clone)]
pub struct TimestampSource {
    /// 1-based recognizer capture group.
    pub capture: usize,
    pub kind: TimestampKind,
    pub strftime: Option<String>,
}

/// How to compute one output column from a recognized line.
#[derive(Debug, Clone)]
pub enum ColumnRule {
    /// Plain string; the CLF dash becomes NULL.
    String { capture: usize },
    /// `%X` marker mapped to `aborted`/`keepalive`/`close`.
    ConnectionStatus { capture: usize },
    /// Decimal integer; dash and parse failures become NULL.
    Int32 { capture: usize },
    Int64 { capture: usize },
    /// Byte-count column: the CLF dash means zero, not NULL.
    Int64Bytes { capture: usize },
    /// Interval captured as an integer count of `micros_per_unit` units.
    Interval { capture: usize, micros_per_unit: i64 },
    /// One sub-column of a decomposed request line.
    Request { capture: usize, part: RequestPart },
    /// Combined timestamp group.
    Timestamp { sources: Vec<TimestampSource> },
    /// Raw-mode companion: the group's captures joined with spaces.
    TimestampRaw { captures: Vec<usize> },
    LogFile,
    LineNumber,
    ParseError,
    RawLine,
}

/// A column of the published schema plus its materialization rule.
#[derive(Debug, Clone)]
pub struct OutputColumn {
    pub name: String,
    pub logical_type: LogicalType,
    pub rule: ColumnRule,
}

/// Expand a compiled format into the ordered output column list.
///
/// Field columns come first in format order (with `%r` decomposition and
/// timestamp grouping applied), followed by `log_file` and, in raw mode, the
/// per-row diagnostics.
pub fn output_columns(format: &CompiledFormat, raw_mode: bool) -> Vec<OutputColumn> {
    let mut columns = Vec::new();

    for (idx, field) in format.fields().iter().enumerate() {
        if field.should_skip {
            continue;
        }

        if let Some(spec) = &field.timestamp {
            let group = &format.timestamp_groups()[spec.group];
            let sources: Vec<TimestampSource> = group
                .fields
                .iter()
                .map(|&member| {
                    let member_field = &format.fields()[member];
                    let member_spec = member_field
                        .timestamp
                        .as_ref()
                        .expect("timestamp group member is a %t field");
                    TimestampSource {
                        capture: format
                            .capture_index(member)
                            .expect("%t fields always capture"),
                        kind: member_spec.kind,
                        strftime: member_spec.strftime.clone(),
                    }
                })
                .collect();

            columns.push(OutputColumn {
                name: field.column_name.clone(),
                logical_type: LogicalType::Timestamp,
                rule: ColumnRule::Timestamp {
                    sources: sources.clone(),
                },
            });
            if raw_mode {
                columns.push(OutputColumn {
                    name: format!("{}_raw", field.column_name),
                    logical_type: LogicalType::String,
                    rule: ColumnRule::TimestampRaw {
                        captures: sources.iter().map(|s| s.capture).collect(),
                    },
                });
            }
            continue;
        }

        let capture = format
            .capture_index(idx)
            .expect("emitting fields always capture");

        if field.is_request() {
            let suffix = field.column_name.strip_prefix("request").unwrap_or("");
            let parts = [
                (field.skip_method, RequestPart::Method, "method"),
                (field.skip_path, RequestPart::Path, "path"),
                (field.skip_query_string, RequestPart::QueryString, "query_string"),
                (field.skip_protocol, RequestPart::Protocol, "protocol"),
            ];
            for (skip, part, base) in parts {
                if skip {
                    continue;
                }
                columns.push(OutputColumn {
                    name: format!("{base}{suffix}"),
                    logical_type: LogicalType::String,
                    rule: ColumnRule::Request { capture, part },
                });
            }
            continue;
        }

        let rule = match field.logical_type {
            LogicalType::String if field.directive == "%X" => {
                ColumnRule::ConnectionStatus { capture }
            }
            LogicalType::String => ColumnRule::String { capture },
            LogicalType::Int32 => ColumnRule::Int32 { capture },
            LogicalType::Int64 if registry::is_bytes_column(&field.column_name) => {
                ColumnRule::Int64Bytes { capture }
            }
            LogicalType::Int64 => ColumnRule::Int64 { capture },
            LogicalType::Interval => ColumnRule::Interval {
                capture,
                micros_per_unit: interval_unit(&field.directive, field.modifier.as_deref()),
            },
            LogicalType::Bool | LogicalType::Timestamp => ColumnRule::String { capture },
        };
        columns.push(OutputColumn {
            name: field.column_name.clone(),
            logical_type: field.logical_type,
            rule,
        });
    }

    columns.push(OutputColumn {
        name: LOG_FILE_COLUMN.to_owned(),
        logical_type: LogicalType::String,
        rule: ColumnRule::LogFile,
    });

    if raw_mode {
        columns.push(OutputColumn {
            name: LINE_NUMBER_COLUMN.to_owned(),
            logical_type: LogicalType::Int64,
            rule: ColumnRule::LineNumber,
        });
        columns.push(OutputColumn {
            name: PARSE_ERROR_COLUMN.to_owned(),
            logical_type: LogicalType::Bool,
            rule: ColumnRule::ParseError,
        });
        columns.push(OutputColumn {
            name: RAW_LINE_COLUMN.to_owned(),
            logical_type: LogicalType::String,
            rule: ColumnRule::RawLine,
        });
    }

    columns
}

/// Microseconds per captured unit for a duration directive. `%D` logs
/// microseconds; `%T` logs seconds unless its modifier says otherwise.
fn interval_unit(directive: &str, modifier: Option<&str>) -> i64 {
    if directive.ends_with('D') {
        return 1;
    }
    match modifier {
        Some("us") => 1,
        Some("ms") => MICROS_PER_MSEC,
        _ => MICROS_PER_SEC,
    }
}

/// Build the Arrow schema for a column list. Every column is nullable; the
/// engine encodes absent values as NULLs rather than failing rows.
pub fn arrow_schema(columns: &[OutputColumn]) -> SchemaRef {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| Field::new(c.name.as_str(), c.logical_type.arrow_type(), true))
        .collect();
    Arc::new(Schema::new(fields))
}
