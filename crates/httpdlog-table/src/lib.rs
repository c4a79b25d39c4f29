//! Apache HTTPD access logs as DataFusion tables.
//!
//! This crate wires the [`httpdlog_format`] engine into DataFusion:
//!
//! - [`HttpdLogTableProvider`] scans one or more log files as a typed table,
//!   with one scan partition per file and projection pushdown into the row
//!   materializer.
//! - [`register_httpdlog_functions`] exposes the providers as the
//!   `read_httpd_log` and `read_httpd_conf` table functions.
//!
//! ```text
//! SELECT status, count(*) FROM read_httpd_log('/var/log/apache2/*.log')
//! GROUP BY status;
//! ```

pub mod conf_table;
pub mod config;
pub mod error;
pub mod exec;
pub mod functions;
pub mod options;
pub mod provider;
mod stream;

pub use config::ScanConfig;
pub use error::TableError;
pub use functions::register_httpdlog_functions;
pub use options::HttpdLogOptions;
pub use provider::HttpdLogTableProvider;
