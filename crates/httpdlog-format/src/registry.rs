//! Static directive catalog.
//!
//! Maps Apache LogFormat directives to default column names, logical types,
//! and the priority/suffix pair used when two directives resolve to the same
//! column name. The catalog is a set of compile-time-constant tables; nothing
//! here is initialised lazily.

use crate::types::LogicalType;

/// Default collision priority for directives that only ever collide with an
/// identical twin (`%h %h` and the like).
const DEFAULT_PRIORITY: u8 = 1;

/// Registry entry for a recognised directive.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveDef {
    /// Default column name; empty when the name is derived from the modifier
    /// (`%i`, `%o`, `%C`, `%e`, `%n`, `%^ti`, `%^to`).
    pub column: &'static str,
    pub logical_type: LogicalType,
    /// Lower value wins the base column name in a collision.
    pub priority: u8,
    /// Appended to the column name when a higher-priority directive wins.
    pub suffix: &'static str,
}

const fn def(
    column: &'static str,
    logical_type: LogicalType,
    priority: u8,
    suffix: &'static str,
) -> DirectiveDef {
    DirectiveDef {
        column,
        logical_type,
        priority,
        suffix,
    }
}

/// Look up the registry entry for a canonical directive tag (`%h`, `%>s`,
/// `%i`, `%^ti`, ...). Returns `None` for unrecognised directives.
pub fn directive_def(tag: &str) -> Option<DirectiveDef> {
    use LogicalType::{Int32, Int64, Interval, String, Timestamp};

    let entry = match tag {
        "%h" => def("client_host", String, DEFAULT_PRIORITY, ""),
        "%a" => def("remote_ip", String, DEFAULT_PRIORITY, ""),
        "%A" => def("local_ip", String, DEFAULT_PRIORITY, ""),
        "%l" => def("ident", String, DEFAULT_PRIORITY, ""),
        "%u" => def("auth_user", String, DEFAULT_PRIORITY, ""),
        "%t" => def("timestamp", Timestamp, DEFAULT_PRIORITY, ""),

        "%>r" => def("request", String, 0, ""),
        "%r" | "%<r" => def("request", String, 1, "_original"),
        "%m" => def("method", String, DEFAULT_PRIORITY, ""),
        "%>U" => def("path", String, 0, ""),
        "%U" | "%<U" => def("path", String, 1, "_original"),
        "%q" => def("query_string", String, DEFAULT_PRIORITY, ""),
        "%H" => def("protocol", String, DEFAULT_PRIORITY, ""),

        "%>s" => def("status", Int32, 0, ""),
        "%s" | "%<s" => def("status", Int32, 1, "_original"),

        "%B" | "%b" => def("bytes", Int64, DEFAULT_PRIORITY, ""),
        "%I" => def("bytes_received", Int64, DEFAULT_PRIORITY, ""),
        "%O" => def("bytes_sent", Int64, DEFAULT_PRIORITY, ""),
        "%S" => def("bytes_transferred", Int64, DEFAULT_PRIORITY, ""),

        "%>D" | "%>T" => def("duration", Interval, 0, ""),
        "%D" | "%<D" | "%T" | "%<T" => def("duration", Interval, 1, "_original"),

        "%v" => def("server_name", String, 0, ""),
        "%V" => def("server_name", String, 1, "_used"),
        "%p" => def("server_port", Int32, DEFAULT_PRIORITY, ""),
        "%P" => def("process_id", Int32, DEFAULT_PRIORITY, ""),
        "%k" => def("keepalive_count", Int32, DEFAULT_PRIORITY, ""),
        "%X" => def("connection_status", String, DEFAULT_PRIORITY, ""),
        "%f" => def("filename", String, DEFAULT_PRIORITY, ""),
        "%L" => def("request_log_id", String, DEFAULT_PRIORITY, ""),
        "%R" => def("handler", String, DEFAULT_PRIORITY, ""),

        "%i" => def("", String, 2, "_in"),
        "%o" => def("", String, 3, "_out"),
        "%C" => def("", String, 4, "_cookie"),
        "%e" => def("", String, 5, "_env"),
        "%n" => def("", String, 6, "_note"),
        "%^ti" => def("", String, 7, "_trail_in"),
        "%^to" => def("", String, 8, "_trail_out"),

        _ => return None,
    };
    Some(entry)
}

/// Typed-header overrides, matched case-insensitively against the modifier.
///
/// `Max-Forwards` is integer-typed on request headers only; the response
/// header keeps the string type.
pub fn header_type_override(tag: &str, header: &str) -> Option<LogicalType> {
    let lowered = header.to_ascii_lowercase();
    match (tag, lowered.as_str()) {
        ("%i" | "%o", "content-length") => Some(LogicalType::Int64),
        ("%o", "age") => Some(LogicalType::Int32),
        ("%i", "max-forwards") => Some(LogicalType::Int32),
        _ => None,
    }
}

/// Derive a column name from a header/cookie/env modifier:
/// lowercase, hyphens replaced with underscores.
pub fn modifier_column(modifier: &str) -> std::string::String {
    modifier
        .chars()
        .map(|c| match c {
            '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Columns that follow the CLF byte-count convention: a `-` value means
/// "zero bytes sent", not NULL.
pub fn is_bytes_column(column: &str) -> bool {
    matches!(
        column,
        "bytes" | "bytes_clf" | "bytes_received" | "bytes_sent" | "bytes_transferred"
    )
}

/// Resolve the default column name and logical type for a directive
/// occurrence, applying the modifier-driven renames.
pub fn resolve(tag: &str, modifier: Option<&str>) -> (std::string::String, LogicalType, u8, &'static str) {
    if let Some(entry) = directive_def(tag) {
        let (column, logical_type) = resolve_with_modifier(tag, &entry, modifier);
        return (column, logical_type, entry.priority, entry.suffix);
    }

    // Unrecognised directive: keep it visible as a string column named after
    // the letter so unknown formats still scan.
    let letters: std::string::String = tag.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    (
        format!("field_{letters}"),
        LogicalType::String,
        DEFAULT_PRIORITY,
        "",
    )
}

fn resolve_with_modifier(
    tag: &str,
    entry: &DirectiveDef,
    modifier: Option<&str>,
) -> (std::string::String, LogicalType) {
    match (tag, modifier) {
        ("%h", Some("c")) => ("peer_host".to_owned(), entry.logical_type),
        ("%a", Some("c")) => ("peer_ip".to_owned(), entry.logical_type),
        ("%p", Some("local")) => ("local_port".to_owned(), LogicalType::Int32),
        ("%p", Some("remote")) => ("remote_port".to_owned(), LogicalType::Int32),
        // `%{canonical}p` is the same port the bare directive logs.
        ("%p", _) => ("server_port".to_owned(), LogicalType::Int32),
        ("%P", Some("tid")) => ("thread_id".to_owned(), LogicalType::Int64),
        ("%P", Some("hextid")) => ("thread_id_hex".to_owned(), LogicalType::String),
        ("%P", _) => ("process_id".to_owned(), LogicalType::Int32),
        ("%i" | "%o" | "%C" | "%e" | "%n" | "%^ti" | "%^to", Some(name)) if !name.is_empty() => {
            let logical_type =
                header_type_override(tag, name).unwrap_or(entry.logical_type);
            (modifier_column(name), logical_type)
        }
        ("%^ti", _) => ("trail_in".to_owned(), entry.logical_type),
        ("%^to", _) => ("trail_out".to_owned(), entry.logical_type),
        ("%i", _) => ("field_i".to_owned(), entry.logical_type),
        ("%o", _) => ("field_o".to_owned(), entry.logical_type),
        ("%C", _) => ("field_C".to_owned(), entry.logical_type),
        ("%e", _) => ("field_e".to_owned(), entry.logical_type),
        ("%n", _) => ("field_n".to_owned(), entry.logical_type),
        _ => (entry.column.to_owned(), entry.logical_type),
    }
}
