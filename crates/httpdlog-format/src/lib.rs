//! Apache HTTPD LogFormat engine.
//!
//! Compiles an Apache `LogFormat` directive string into three things:
//!
//! - a typed output schema with deterministic collision resolution,
//! - an anchored regex line recognizer, and
//! - a pre-baked materialization plan that converts captured substrings into
//!   typed Arrow column values (strings, integers, intervals, and timestamps
//!   combined from multiple temporal components).
//!
//! ## Pipeline
//!
//! ```text
//! format string -> CompiledFormat -> output_columns() -> Arrow schema
//!                       |                  |
//! log line -> recognize() captures -> RowMaterializer -> RecordBatch columns
//! ```
//!
//! A [`CompiledFormat`] is compiled once per scan and shared immutably across
//! workers; each worker owns a [`LineScratch`](recognizer::LineScratch) and a
//! [`RowMaterializer`](materialize::RowMaterializer) for its file.
//!
//! The crate is I/O-free: it consumes whole lines and format strings and
//! leaves file access, batching, and query integration to its host.

pub mod compiler;
pub mod conf;
pub mod convert;
pub mod detect;
pub mod error;
pub mod materialize;
pub mod recognizer;
pub mod registry;
pub mod schema;
pub mod types;

pub use compiler::{CompiledFormat, FormatField, TimestampGroup};
pub use detect::{COMBINED_LOG_FORMAT, COMMON_LOG_FORMAT};
pub use error::FormatError;
pub use materialize::RowMaterializer;
pub use recognizer::LineScratch;
pub use schema::{arrow_schema, output_columns, OutputColumn};
pub use types::LogicalType;
