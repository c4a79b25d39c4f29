//! Error types for the format engine.

/// Errors raised while compiling a LogFormat string or selecting a format.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Malformed directive in the format string (e.g. an unclosed `%{`).
    #[error("invalid LogFormat string at byte {position}: {message}")]
    InvalidFormat {
        /// Byte offset of the offending directive within the format string.
        position: usize,
        message: String,
    },

    /// The generated recognizer pattern failed to compile (boxed - large type).
    #[error("generated pattern failed to compile: {0}")]
    Regex(Box<regex::Error>),

    /// No known format matched the sampled lines.
    #[error("unable to determine log format: {0}")]
    UnknownFormat(String),
}

impl From<regex::Error> for FormatError {
    fn from(err: regex::Error) -> Self {
        Self::Regex(Box::new(err))
    }
}
