//! Row materialization into Arrow column builders.
//!
//! A [`RowMaterializer`] is per-worker, per-file state: it owns one builder
//! per *projected* column and evaluates only the rules those columns need, so
//! unrequested captures are never converted. Builders are drained by
//! [`finish`](RowMaterializer::finish) and reused for the next batch.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, DurationMicrosecondBuilder, Int32Builder, Int64Builder,
    StringBuilder, TimestampMicrosecondBuilder,
};

use crate::convert::timestamp::{combine_components, TimestampComponent};
use crate::convert::{connection_status, parse_int, request, CLF_DASH};
use crate::recognizer::LineScratch;
use crate::schema::{ColumnRule, OutputColumn, RequestPart};
use crate::types::LogicalType;

/// Estimated average value length used to pre-size string builders.
const CAPACITY_STRING_VALUE: usize = 24;

/// One projected column: its rule plus the builder it fills.
struct ProjectedColumn {
    column: OutputColumn,
    writer: ColumnWriter,
    /// A `*_raw` timestamp companion is only populated when its timestamp
    /// column is itself projected; otherwise it stays NULL.
    suppressed: bool,
}

enum ColumnWriter {
    String(StringBuilder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    Bool(BooleanBuilder),
    Timestamp(TimestampMicrosecondBuilder),
    Interval(DurationMicrosecondBuilder),
}

impl ColumnWriter {
    fn for_type(logical_type: LogicalType, batch_size: usize) -> Self {
        match logical_type {
            LogicalType::String => Self::String(StringBuilder::with_capacity(
                batch_size,
                batch_size * CAPACITY_STRING_VALUE,
            )),
            LogicalType::Int32 => Self::Int32(Int32Builder::with_capacity(batch_size)),
            LogicalType::Int64 => Self::Int64(Int64Builder::with_capacity(batch_size)),
            LogicalType::Bool => Self::Bool(BooleanBuilder::with_capacity(batch_size)),
            LogicalType::Timestamp => {
                Self::Timestamp(TimestampMicrosecondBuilder::with_capacity(batch_size))
            }
            LogicalType::Interval => {
                Self::Interval(DurationMicrosecondBuilder::with_capacity(batch_size))
            }
        }
    }

    fn append_null(&mut self) {
        match self {
            Self::String(b) => b.append_null(),
            Self::Int32(b) => b.append_null(),
            Self::Int64(b) => b.append_null(),
            Self::Bool(b) => b.append_null(),
            Self::Timestamp(b) => b.append_null(),
            Self::Interval(b) => b.append_null(),
        }
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            Self::String(b) => Arc::new(b.finish()),
            Self::Int32(b) => Arc::new(b.finish()),
            Self::Int64(b) => Arc::new(b.finish()),
            Self::Bool(b) => Arc::new(b.finish()),
            Self::Timestamp(b) => Arc::new(b.finish()),
            Self::Interval(b) => Arc::new(b.finish()),
        }
    }
}

/// Writes recognized (or failed) lines into Arrow builders for a projected
/// subset of the output columns.
///
/// The plan is pre-baked: rules carry the capture indices they need, so the
/// materializer never consults the compiled format at row time.
pub struct RowMaterializer {
    columns: Vec<ProjectedColumn>,
    log_file: String,
    rows: usize,
}

impl RowMaterializer {
    /// Build a materializer for the columns selected by `projection`
    /// (indices into `columns`, in output order).
    pub fn new(
        columns: &[OutputColumn],
        projection: &[usize],
        log_file: &str,
        batch_size: usize,
    ) -> Self {
        let columns = projection
            .iter()
            .map(|&idx| {
                let column = columns[idx].clone();
                let writer = ColumnWriter::for_type(column.logical_type, batch_size);
                // The raw companion sits immediately after its timestamp
                // column in the output order.
                let suppressed = matches!(column.rule, ColumnRule::TimestampRaw { .. })
                    && (idx == 0 || !projection.contains(&(idx - 1)));
                ProjectedColumn {
                    column,
                    writer,
                    suppressed,
                }
            })
            .collect();
        Self {
            columns,
            log_file: log_file.to_owned(),
            rows: 0,
        }
    }

    /// Rows buffered since the last [`finish`](Self::finish).
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Append a successfully recognized line. `scratch` must hold the capture
    /// offsets of `line`.
    pub fn append_parsed(&mut self, line: &str, line_number: i64, scratch: &LineScratch) {
        for projected in &mut self.columns {
            if projected.suppressed {
                projected.writer.append_null();
                continue;
            }
            write_value(
                &mut projected.writer,
                &projected.column.rule,
                line,
                line_number,
                scratch,
                &self.log_file,
            );
        }
        self.rows += 1;
    }

    /// Append a row for a line the recognizer rejected: typed columns are
    /// NULL, string columns empty, and the diagnostics carry the raw line.
    pub fn append_unparsed(&mut self, line: &str, line_number: i64) {
        for projected in &mut self.columns {
            if projected.suppressed {
                projected.writer.append_null();
                continue;
            }
            write_error_value(
                &mut projected.writer,
                &projected.column.rule,
                line,
                line_number,
                &self.log_file,
            );
        }
        self.rows += 1;
    }

    /// Drain the builders into arrays, resetting for the next batch.
    pub fn finish(&mut self) -> Vec<ArrayRef> {
        self.rows = 0;
        self.columns
            .iter_mut()
            .map(|projected| projected.writer.finish())
            .collect()
    }
}

fn capture<'l>(scratch: &LineScratch, line: &'l str, index: usize) -> &'l str {
    scratch.get(line, index).unwrap_or("")
}

fn write_value(
    writer: &mut ColumnWriter,
    rule: &ColumnRule,
    line: &str,
    line_number: i64,
    scratch: &LineScratch,
    log_file: &str,
) {
    match (writer, rule) {
        (ColumnWriter::String(b), ColumnRule::String { capture: idx }) => {
            let value = capture(scratch, line, *idx);
            if value == CLF_DASH {
                b.append_null();
            } else {
                b.append_value(value);
            }
        }
        (ColumnWriter::String(b), ColumnRule::ConnectionStatus { capture: idx }) => {
            b.append_value(connection_status(capture(scratch, line, *idx)));
        }
        (ColumnWriter::Int32(b), ColumnRule::Int32 { capture: idx }) => {
            b.append_option(parse_int::<i32>(capture(scratch, line, *idx)));
        }
        (ColumnWriter::Int64(b), ColumnRule::Int64 { capture: idx }) => {
            b.append_option(parse_int::<i64>(capture(scratch, line, *idx)));
        }
        (ColumnWriter::Int64(b), ColumnRule::Int64Bytes { capture: idx }) => {
            let value = capture(scratch, line, *idx);
            if value == CLF_DASH {
                b.append_value(0);
            } else {
                b.append_option(value.parse::<i64>().ok());
            }
        }
        (
            ColumnWriter::Interval(b),
            ColumnRule::Interval {
                capture: idx,
                micros_per_unit,
            },
        ) => {
            b.append_option(
                parse_int::<i64>(capture(scratch, line, *idx)).map(|v| v * micros_per_unit),
            );
        }
        (ColumnWriter::String(b), ColumnRule::Request { capture: idx, part }) => {
            let parts = request::split_request(capture(scratch, line, *idx));
            match (parts, part) {
                (Some(parts), RequestPart::Method) => b.append_value(parts.method),
                (Some(parts), RequestPart::Path) => {
                    b.append_value(request::split_url(parts.url).0);
                }
                (Some(parts), RequestPart::QueryString) => {
                    b.append_option(request::split_url(parts.url).1);
                }
                (Some(parts), RequestPart::Protocol) => b.append_value(parts.protocol),
                // A malformed request line leaves the parts empty; only the
                // query string is NULL.
                (None, RequestPart::QueryString) => b.append_null(),
                (None, _) => b.append_value(""),
            }
        }
        (ColumnWriter::Timestamp(b), ColumnRule::Timestamp { sources }) => {
            let components: Vec<TimestampComponent<'_>> = sources
                .iter()
                .map(|source| TimestampComponent {
                    kind: source.kind,
                    strftime: source.strftime.as_deref(),
                    value: capture(scratch, line, source.capture),
                })
                .collect();
            b.append_option(combine_components(&components));
        }
        (ColumnWriter::String(b), ColumnRule::TimestampRaw { captures }) => {
            let mut raw = String::new();
            for (i, &idx) in captures.iter().enumerate() {
                if i > 0 {
                    raw.push(' ');
                }
                raw.push_str(capture(scratch, line, idx));
            }
            b.append_value(raw);
        }
        (ColumnWriter::String(b), ColumnRule::LogFile) => b.append_value(log_file),
        (ColumnWriter::Int64(b), ColumnRule::LineNumber) => b.append_value(line_number),
        (ColumnWriter::Bool(b), ColumnRule::ParseError) => b.append_value(false),
        // The raw line is only retained for rows that failed to parse.
        (ColumnWriter::String(b), ColumnRule::RawLine) => b.append_null(),
        (writer, _) => writer.append_null(),
    }
}

fn write_error_value(
    writer: &mut ColumnWriter,
    rule: &ColumnRule,
    line: &str,
    line_number: i64,
    log_file: &str,
) {
    match (writer, rule) {
        (ColumnWriter::String(b), ColumnRule::LogFile) => b.append_value(log_file),
        (ColumnWriter::Int64(b), ColumnRule::LineNumber) => b.append_value(line_number),
        (ColumnWriter::Bool(b), ColumnRule::ParseError) => b.append_value(true),
        (ColumnWriter::String(b), ColumnRule::RawLine) => b.append_value(line),
        (ColumnWriter::String(b), ColumnRule::Request { part, .. }) => {
            if *part == RequestPart::QueryString {
                b.append_null();
            } else {
                b.append_value("");
            }
        }
        (ColumnWriter::String(b), _) => b.append_value(""),
        (writer, _) => writer.append_null(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompiledFormat;
    use crate::detect::COMMON_LOG_FORMAT;
    use crate::schema::output_columns;
    use arrow::array::{
        Array, BooleanArray, DurationMicrosecondArray, Int32Array, Int64Array, StringArray,
        TimestampMicrosecondArray,
    };
    use chrono::NaiveDate;

    const SAMPLE: &str =
        r#"127.0.0.1 - alice [10/Oct/2000:13:55:36 -0700] "GET /idx HTTP/1.1" 200 2326"#;

    fn materialize_all(
        format: &CompiledFormat,
        raw_mode: bool,
        lines: &[&str],
    ) -> (Vec<OutputColumn>, Vec<ArrayRef>) {
        let columns = output_columns(format, raw_mode);
        let projection: Vec<usize> = (0..columns.len()).collect();
        let mut scratch = format.new_scratch();
        let mut materializer =
            RowMaterializer::new(&columns, &projection, "/logs/access.log", 64);

        let mut line_number = 0i64;
        for line in lines {
            line_number += 1;
            if line.is_empty() {
                continue;
            }
            if format.recognize(line, &mut scratch) {
                materializer.append_parsed(line, line_number, &scratch);
            } else if raw_mode {
                materializer.append_unparsed(line, line_number);
            }
        }
        (columns, materializer.finish())
    }

    fn string_at<'a>(arrays: &'a [ArrayRef], columns: &[OutputColumn], name: &str) -> &'a StringArray {
        let idx = columns.iter().position(|c| c.name == name).unwrap();
        arrays[idx].as_any().downcast_ref::<StringArray>().unwrap()
    }

    #[test]
    fn common_format_row() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let (columns, arrays) = materialize_all(&format, false, &[SAMPLE]);

        assert_eq!(string_at(&arrays, &columns, "client_host").value(0), "127.0.0.1");
        assert!(string_at(&arrays, &columns, "ident").is_null(0));
        assert_eq!(string_at(&arrays, &columns, "auth_user").value(0), "alice");
        assert_eq!(string_at(&arrays, &columns, "method").value(0), "GET");
        assert_eq!(string_at(&arrays, &columns, "path").value(0), "/idx");
        assert!(string_at(&arrays, &columns, "query_string").is_null(0));
        assert_eq!(string_at(&arrays, &columns, "protocol").value(0), "HTTP/1.1");
        assert_eq!(string_at(&arrays, &columns, "log_file").value(0), "/logs/access.log");

        let status_idx = columns.iter().position(|c| c.name == "status").unwrap();
        let status = arrays[status_idx].as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(status.value(0), 200);

        let bytes_idx = columns.iter().position(|c| c.name == "bytes").unwrap();
        let bytes = arrays[bytes_idx].as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(bytes.value(0), 2326);

        let ts_idx = columns.iter().position(|c| c.name == "timestamp").unwrap();
        let ts = arrays[ts_idx]
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2000, 10, 10)
            .unwrap()
            .and_hms_opt(20, 55, 36)
            .unwrap()
            .and_utc()
            .timestamp_micros();
        assert_eq!(ts.value(0), expected);
    }

    #[test]
    fn clf_dash_bytes_are_zero() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let line = SAMPLE.replace(" 2326", " -");
        let (columns, arrays) = materialize_all(&format, false, &[line.as_str()]);
        let bytes_idx = columns.iter().position(|c| c.name == "bytes").unwrap();
        let bytes = arrays[bytes_idx].as_any().downcast_ref::<Int64Array>().unwrap();
        assert!(!bytes.is_null(0));
        assert_eq!(bytes.value(0), 0);
    }

    #[test]
    fn dash_status_is_null() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let line = SAMPLE.replace(" 200 ", " - ");
        let (columns, arrays) = materialize_all(&format, false, &[line.as_str()]);
        let status_idx = columns.iter().position(|c| c.name == "status").unwrap();
        assert!(arrays[status_idx].is_null(0));
    }

    #[test]
    fn parse_failures_are_dropped_without_raw_mode() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let (_, arrays) = materialize_all(&format, false, &["garbage"]);
        assert_eq!(arrays[0].len(), 0);
    }

    #[test]
    fn parse_failures_surface_in_raw_mode() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let (columns, arrays) = materialize_all(&format, true, &["garbage"]);

        assert_eq!(arrays[0].len(), 1);
        let error_idx = columns.iter().position(|c| c.name == "parse_error").unwrap();
        let errors = arrays[error_idx].as_any().downcast_ref::<BooleanArray>().unwrap();
        assert!(errors.value(0));

        assert_eq!(string_at(&arrays, &columns, "raw_line").value(0), "garbage");
        assert_eq!(string_at(&arrays, &columns, "client_host").value(0), "");

        let line_idx = columns.iter().position(|c| c.name == "line_number").unwrap();
        let lines = arrays[line_idx].as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(lines.value(0), 1);

        let ts_idx = columns.iter().position(|c| c.name == "timestamp").unwrap();
        assert!(arrays[ts_idx].is_null(0));
    }

    #[test]
    fn raw_mode_is_a_superset_of_default_mode() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let lines = [SAMPLE, "garbage", SAMPLE];
        let (_, default_arrays) = materialize_all(&format, false, &lines);
        let (_, raw_arrays) = materialize_all(&format, true, &lines);
        assert_eq!(default_arrays[0].len(), 2);
        assert_eq!(raw_arrays[0].len(), 3);
    }

    #[test]
    fn line_numbers_count_every_physical_line() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let (columns, arrays) = materialize_all(&format, true, &["", "garbage", "", SAMPLE]);
        let line_idx = columns.iter().position(|c| c.name == "line_number").unwrap();
        let lines = arrays[line_idx].as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(lines.value(0), 2);
        assert_eq!(lines.value(1), 4);
    }

    #[test]
    fn query_string_split() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let line = SAMPLE.replace("/idx", "/a/b?x=1&y=2");
        let (columns, arrays) = materialize_all(&format, false, &[line.as_str()]);
        assert_eq!(string_at(&arrays, &columns, "path").value(0), "/a/b");
        assert_eq!(
            string_at(&arrays, &columns, "query_string").value(0),
            "?x=1&y=2"
        );
    }

    #[test]
    fn malformed_request_line_is_empty_not_null() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let line = SAMPLE.replace("GET /idx HTTP/1.1", "-");
        let (columns, arrays) = materialize_all(&format, false, &[line.as_str()]);
        assert_eq!(string_at(&arrays, &columns, "method").value(0), "");
        assert_eq!(string_at(&arrays, &columns, "path").value(0), "");
        assert_eq!(string_at(&arrays, &columns, "protocol").value(0), "");
        assert!(string_at(&arrays, &columns, "query_string").is_null(0));
    }

    #[test]
    fn connection_status_mapping_applies() {
        let format = CompiledFormat::compile("%h %X").unwrap();
        let (columns, arrays) = materialize_all(&format, false, &["10.0.0.1 +", "10.0.0.2 -"]);
        let status = string_at(&arrays, &columns, "connection_status");
        assert_eq!(status.value(0), "keepalive");
        assert_eq!(status.value(1), "close");
    }

    #[test]
    fn duration_arbitration_keeps_microseconds() {
        // `%T %D`: one duration column fed by %D at microsecond precision.
        let format = CompiledFormat::compile("%T %D").unwrap();
        let (columns, arrays) = materialize_all(&format, false, &["3 2500000"]);
        assert_eq!(columns[0].name, "duration");
        let duration = arrays[0]
            .as_any()
            .downcast_ref::<DurationMicrosecondArray>()
            .unwrap();
        assert_eq!(duration.value(0), 2_500_000);
    }

    #[test]
    fn interval_scaling() {
        let format = CompiledFormat::compile("%{ms}T").unwrap();
        let (_, arrays) = materialize_all(&format, false, &["250"]);
        let duration = arrays[0]
            .as_any()
            .downcast_ref::<DurationMicrosecondArray>()
            .unwrap();
        assert_eq!(duration.value(0), 250_000);
    }

    #[test]
    fn status_collision_values() {
        // `%s %>s` on a line with 301 then 200.
        let format = CompiledFormat::compile("%s %>s").unwrap();
        let (columns, arrays) = materialize_all(&format, false, &["301 200"]);
        assert_eq!(columns[0].name, "status_original");
        assert_eq!(columns[1].name, "status");
        let original = arrays[0].as_any().downcast_ref::<Int32Array>().unwrap();
        let status = arrays[1].as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(original.value(0), 301);
        assert_eq!(status.value(0), 200);
    }

    #[test]
    fn timestamp_group_combines_split_strftime() {
        let format =
            CompiledFormat::compile("[%{begin:%Y-%m-%d}t %{begin:%H:%M:%S}t %{begin:%z}t]")
                .unwrap();
        let (columns, arrays) = materialize_all(&format, false, &["[2024-01-02 03:04:05 +0900]"]);
        assert_eq!(columns[0].name, "timestamp");
        let ts = arrays[0]
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(18, 4, 5)
            .unwrap()
            .and_utc()
            .timestamp_micros();
        assert_eq!(ts.value(0), expected);
    }

    #[test]
    fn projection_produces_identical_values() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let columns = output_columns(&format, false);
        let full: Vec<usize> = (0..columns.len()).collect();
        let mut scratch = format.new_scratch();

        let mut all = RowMaterializer::new(&columns, &full, "f.log", 8);
        assert!(format.recognize(SAMPLE, &mut scratch));
        all.append_parsed(SAMPLE, 1, &scratch);
        let all_arrays = all.finish();

        for idx in 0..columns.len() {
            let mut one = RowMaterializer::new(&columns, &[idx], "f.log", 8);
            assert!(format.recognize(SAMPLE, &mut scratch));
            one.append_parsed(SAMPLE, 1, &scratch);
            let arrays = one.finish();
            assert_eq!(arrays[0].to_data(), all_arrays[idx].to_data(), "column {idx}");
        }
    }

    #[test]
    fn raw_timestamp_follows_its_timestamp_projection() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let columns = output_columns(&format, true);
        let ts = columns.iter().position(|c| c.name == "timestamp").unwrap();
        let ts_raw = columns.iter().position(|c| c.name == "timestamp_raw").unwrap();
        let mut scratch = format.new_scratch();
        assert!(format.recognize(SAMPLE, &mut scratch));

        // Projected together: the raw column carries the captured text.
        let mut both = RowMaterializer::new(&columns, &[ts, ts_raw], "f.log", 8);
        both.append_parsed(SAMPLE, 1, &scratch);
        let arrays = both.finish();
        let raw = arrays[1].as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(raw.value(0), "10/Oct/2000:13:55:36 -0700");

        // Projected without its timestamp: the raw column stays NULL.
        let mut alone = RowMaterializer::new(&columns, &[ts_raw], "f.log", 8);
        alone.append_parsed(SAMPLE, 1, &scratch);
        let arrays = alone.finish();
        assert!(arrays[0].is_null(0));
    }

    #[test]
    fn builders_reset_between_batches() {
        let format = CompiledFormat::compile(COMMON_LOG_FORMAT).unwrap();
        let columns = output_columns(&format, false);
        let projection: Vec<usize> = (0..columns.len()).collect();
        let mut scratch = format.new_scratch();
        let mut materializer = RowMaterializer::new(&columns, &projection, "f.log", 8);

        assert!(format.recognize(SAMPLE, &mut scratch));
        materializer.append_parsed(SAMPLE, 1, &scratch);
        assert_eq!(materializer.len(), 1);
        let first = materializer.finish();
        assert_eq!(first[0].len(), 1);
        assert!(materializer.is_empty());

        assert!(format.recognize(SAMPLE, &mut scratch));
        materializer.append_parsed(SAMPLE, 2, &scratch);
        let second = materializer.finish();
        assert_eq!(second[0].len(), 1);
    }
}
