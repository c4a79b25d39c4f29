//! Built-in formats and format auto-detection.

use crate::compiler::CompiledFormat;
use crate::error::FormatError;

/// The Common Log Format.
pub const COMMON_LOG_FORMAT: &str = "%h %l %u %t \"%r\" %>s %b";

/// The Combined Log Format.
pub const COMBINED_LOG_FORMAT: &str =
    "%h %l %u %t \"%r\" %>s %b \"%{Referer}i\" \"%{User-agent}i\"";

/// Maximum number of sample lines fed to detection.
pub const DETECTION_SAMPLE_LINES: usize = 10;

/// Resolve a built-in format name to its LogFormat string.
pub fn builtin_format(name: &str) -> Option<&'static str> {
    match name {
        "common" => Some(COMMON_LOG_FORMAT),
        "combined" => Some(COMBINED_LOG_FORMAT),
        _ => None,
    }
}

/// An auto-detected format.
#[derive(Debug)]
pub struct DetectedFormat {
    /// `"combined"` or `"common"`.
    pub format_type: &'static str,
    pub format: CompiledFormat,
}

/// A format is accepted when it recognizes at least half the samples,
/// rounded up.
pub fn matches_majority<S: AsRef<str>>(format: &CompiledFormat, samples: &[S]) -> bool {
    let mut scratch = format.new_scratch();
    let matched = samples
        .iter()
        .filter(|line| format.recognize(line.as_ref(), &mut scratch))
        .count();
    matched >= samples.len().div_ceil(2)
}

/// Try the combined format against the samples, then the common format.
///
/// Detection is a pure function of the sample lines, so re-running it on the
/// same samples always selects the same format. Returns `None` when neither
/// built-in matches.
pub fn detect_format<S: AsRef<str>>(samples: &[S]) -> Result<Option<DetectedFormat>, FormatError> {
    for (format_type, format_str) in [
        ("combined", COMBINED_LOG_FORMAT),
        ("common", COMMON_LOG_FORMAT),
    ] {
        let format = CompiledFormat::compile(format_str)?;
        if matches_majority(&format, samples) {
            tracing::debug!(format_type, "auto-detected log format");
            return Ok(Some(DetectedFormat {
                format_type,
                format,
            }));
        }
    }
    Ok(None)
}
