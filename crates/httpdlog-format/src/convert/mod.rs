//! Per-field value conversion.
//!
//! Every conversion returns an `Option`; `None` means the column is NULL for
//! the row. Parse failures never abort a row - the materializer writes NULL
//! and moves on to the next column.

pub mod request;
pub mod timestamp;

/// The CLF sentinel for "absent".
pub const CLF_DASH: &str = "-";

/// Map a `%X` connection-status marker to its long form. Unknown markers pass
/// through unchanged.
pub fn connection_status(value: &str) -> &str {
    match value {
        "X" => "aborted",
        "+" => "keepalive",
        "-" => "close",
        other => other,
    }
}

/// Parse a decimal integer column value. The CLF dash and unparsable text
/// both yield NULL; bytes columns handle the dash separately.
pub fn parse_int<T: std::str::FromStr>(value: &str) -> Option<T> {
    if value == CLF_DASH {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_status_mapping() {
        assert_eq!(connection_status("X"), "aborted");
        assert_eq!(connection_status("+"), "keepalive");
        assert_eq!(connection_status("-"), "close");
        assert_eq!(connection_status("?"), "?");
    }

    #[test]
    fn int_parsing() {
        assert_eq!(parse_int::<i32>("200"), Some(200));
        assert_eq!(parse_int::<i64>("2326"), Some(2326));
        assert_eq!(parse_int::<i64>("-"), None);
        assert_eq!(parse_int::<i32>("abc"), None);
        assert_eq!(parse_int::<i32>(""), None);
    }
}
