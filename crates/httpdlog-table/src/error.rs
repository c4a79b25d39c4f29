//! Error types for the table integration.

use datafusion::error::DataFusionError;
use httpdlog_format::FormatError;

/// Errors raised while binding or scanning the httpd log table functions.
///
/// Large foreign error types are boxed to keep the enum small on the stack.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Unknown or wrongly typed argument. Fatal at bind.
    #[error("invalid option '{option}': {message}")]
    InvalidOption {
        /// The offending argument name.
        option: String,
        message: String,
    },

    /// Malformed format string or uncompilable recognizer. Fatal at bind.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Auto-detection or conf selection failed and raw mode is off.
    #[error("unable to determine log format: {0}")]
    UnknownFormat(String),

    /// The path glob matched nothing.
    #[error("no files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// The path glob itself is malformed.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    /// I/O error (boxed path context lives in the message).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error (boxed - large type).
    #[error("Arrow error: {0}")]
    Arrow(Box<arrow::error::ArrowError>),

    /// DataFusion error (boxed - large type).
    #[error("DataFusion error: {0}")]
    DataFusion(Box<DataFusionError>),
}

impl From<arrow::error::ArrowError> for TableError {
    fn from(err: arrow::error::ArrowError) -> Self {
        Self::Arrow(Box::new(err))
    }
}

impl From<DataFusionError> for TableError {
    fn from(err: DataFusionError) -> Self {
        Self::DataFusion(Box::new(err))
    }
}

impl From<TableError> for DataFusionError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::DataFusion(inner) => *inner,
            other => DataFusionError::External(Box::new(other)),
        }
    }
}
