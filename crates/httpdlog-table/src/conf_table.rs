//! `read_httpd_conf`: format definitions from Apache config files as a table.

use std::sync::Arc;

use arrow::array::{Int32Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use httpdlog_format::conf::ConfigEntry;

use crate::error::TableError;
use crate::options::read_conf_entries;

/// Output schema of `read_httpd_conf`.
pub fn conf_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("log_type", DataType::Utf8, false),
        Field::new("format_type", DataType::Utf8, false),
        Field::new("nickname", DataType::Utf8, true),
        Field::new("format_string", DataType::Utf8, true),
        Field::new("config_file", DataType::Utf8, false),
        Field::new("line_number", DataType::Int32, false),
    ]))
}

fn entries_to_batch(entries: &[ConfigEntry]) -> Result<RecordBatch, TableError> {
    let mut log_type = StringBuilder::new();
    let mut format_type = StringBuilder::new();
    let mut nickname = StringBuilder::new();
    let mut format_string = StringBuilder::new();
    let mut config_file = StringBuilder::new();
    let mut line_number = Int32Builder::new();

    for entry in entries {
        log_type.append_value(entry.log_type);
        format_type.append_value(entry.format_type.as_str());
        nickname.append_option(entry.nickname.as_deref());
        format_string.append_option(entry.format_string.as_deref());
        config_file.append_value(&entry.config_file);
        line_number.append_value(i32::try_from(entry.line_number).unwrap_or(i32::MAX));
    }

    RecordBatch::try_new(
        conf_schema(),
        vec![
            Arc::new(log_type.finish()),
            Arc::new(format_type.finish()),
            Arc::new(nickname.finish()),
            Arc::new(format_string.finish()),
            Arc::new(config_file.finish()),
            Arc::new(line_number.finish()),
        ],
    )
    .map_err(TableError::from)
}

/// Parse the config files a path (or glob) expands to and materialise the
/// definitions as an in-memory table. An empty expansion yields an empty
/// table rather than an error.
pub fn conf_table(path_pattern: &str) -> Result<MemTable, TableError> {
    let entries = read_conf_entries(path_pattern)?;
    tracing::debug!(
        pattern = path_pattern,
        entries = entries.len(),
        "parsed httpd config"
    );
    let batch = entries_to_batch(&entries)?;
    MemTable::try_new(conf_schema(), vec![vec![batch]]).map_err(TableError::from)
}
