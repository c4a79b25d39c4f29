//! Logical column types and timestamp classification.

use arrow::datatypes::{DataType, TimeUnit};

/// Microseconds per second.
pub const MICROS_PER_SEC: i64 = 1_000_000;

/// Microseconds per millisecond.
pub const MICROS_PER_MSEC: i64 = 1_000;

/// Logical type of an output column.
///
/// Maps onto Arrow as the narrowest sensible physical type; timestamps are
/// always UTC-normalised microseconds, durations are microsecond intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    String,
    Int32,
    Int64,
    Bool,
    Timestamp,
    Interval,
}

impl LogicalType {
    /// The Arrow data type this logical type materialises as.
    pub fn arrow_type(self) -> DataType {
        match self {
            Self::String => DataType::Utf8,
            Self::Int32 => DataType::Int32,
            Self::Int64 => DataType::Int64,
            Self::Bool => DataType::Boolean,
            Self::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            Self::Interval => DataType::Duration(TimeUnit::Microsecond),
        }
    }
}

/// How a `%t` directive's modifier says its value is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKind {
    /// Bracketed `DD/Mon/YYYY:HH:MM:SS +ZZZZ` (no modifier).
    ApacheDefault,
    /// `%{sec}t` - whole seconds since the epoch.
    EpochSec,
    /// `%{msec}t` - milliseconds since the epoch.
    EpochMsec,
    /// `%{usec}t` - microseconds since the epoch.
    EpochUsec,
    /// `%{msec_frac}t` - three-digit millisecond fraction.
    FracMsec,
    /// `%{usec_frac}t` - six-digit microsecond fraction.
    FracUsec,
    /// Anything else is treated as a strftime template.
    Strftime,
}

impl TimestampKind {
    /// Classify a `%t` modifier with any `begin:`/`end:` prefix already stripped.
    pub fn classify(modifier: &str) -> Self {
        match modifier {
            "sec" => Self::EpochSec,
            "msec" => Self::EpochMsec,
            "usec" => Self::EpochUsec,
            "msec_frac" => Self::FracMsec,
            "usec_frac" => Self::FracUsec,
            _ => Self::Strftime,
        }
    }
}
