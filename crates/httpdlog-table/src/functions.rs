//! Table-function registration.
//!
//! `read_httpd_log(path [, format_type [, format_str [, raw [, conf]]]])` and
//! `read_httpd_conf(path)` as DataFusion UDTFs. Arguments are positional in
//! SQL; the Rust-side [`HttpdLogTableProvider`](crate::HttpdLogTableProvider)
//! builder exposes the same options by name.

use std::sync::Arc;

use datafusion::catalog::{TableFunctionImpl, TableProvider};
use datafusion::error::{DataFusionError, Result as DFResult};
use datafusion::logical_expr::Expr;
use datafusion::common::ScalarValue;
use datafusion::prelude::SessionContext;

use crate::config::ScanConfig;
use crate::conf_table::conf_table;
use crate::error::TableError;
use crate::options::HttpdLogOptions;
use crate::provider::HttpdLogTableProvider;

/// Register `read_httpd_log` and `read_httpd_conf` on a session context.
pub fn register_httpdlog_functions(ctx: &SessionContext, config: ScanConfig) {
    ctx.register_udtf(
        "read_httpd_log",
        Arc::new(ReadHttpdLogFunction { config }),
    );
    ctx.register_udtf("read_httpd_conf", Arc::new(ReadHttpdConfFunction));
}

/// `read_httpd_log` table function.
#[derive(Debug)]
pub struct ReadHttpdLogFunction {
    config: ScanConfig,
}

impl ReadHttpdLogFunction {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

impl TableFunctionImpl for ReadHttpdLogFunction {
    fn call(&self, args: &[Expr]) -> DFResult<Arc<dyn TableProvider>> {
        let path = string_arg(args, 0, "path")?.ok_or_else(|| {
            invalid_option("path", "read_httpd_log requires a file path or glob pattern")
        })?;

        let options = HttpdLogOptions {
            format_type: string_arg(args, 1, "format_type")?,
            format_str: string_arg(args, 2, "format_str")?,
            raw: bool_arg(args, 3, "raw")?.unwrap_or(false),
            conf: string_arg(args, 4, "conf")?,
        };

        let provider = HttpdLogTableProvider::try_new(&path, options, self.config.clone())
            .map_err(DataFusionError::from)?;
        Ok(Arc::new(provider))
    }
}

/// `read_httpd_conf` table function.
#[derive(Debug)]
pub struct ReadHttpdConfFunction;

impl TableFunctionImpl for ReadHttpdConfFunction {
    fn call(&self, args: &[Expr]) -> DFResult<Arc<dyn TableProvider>> {
        let path = string_arg(args, 0, "path")?.ok_or_else(|| {
            invalid_option("path", "read_httpd_conf requires a file path or glob pattern")
        })?;
        let table = conf_table(&path).map_err(DataFusionError::from)?;
        Ok(Arc::new(table))
    }
}

fn invalid_option(option: &str, message: &str) -> DataFusionError {
    DataFusionError::from(TableError::InvalidOption {
        option: option.to_owned(),
        message: message.to_owned(),
    })
}

fn string_arg(args: &[Expr], index: usize, name: &str) -> DFResult<Option<String>> {
    match args.get(index) {
        None => Ok(None),
        Some(Expr::Literal(ScalarValue::Utf8(Some(value)), _)) => Ok(Some(value.clone())),
        Some(Expr::Literal(ScalarValue::LargeUtf8(Some(value)), _)) => Ok(Some(value.clone())),
        Some(Expr::Literal(ScalarValue::Utf8(None), _))
        | Some(Expr::Literal(ScalarValue::Null, _)) => Err(invalid_option(
            name,
            "NULL is not a valid argument value",
        )),
        Some(other) => Err(invalid_option(
            name,
            &format!("expected a string literal, got {other}"),
        )),
    }
}

fn bool_arg(args: &[Expr], index: usize, name: &str) -> DFResult<Option<bool>> {
    match args.get(index) {
        None => Ok(None),
        Some(Expr::Literal(ScalarValue::Boolean(Some(value)), _)) => Ok(Some(*value)),
        Some(Expr::Literal(ScalarValue::Boolean(None), _))
        | Some(Expr::Literal(ScalarValue::Null, _)) => Err(invalid_option(
            name,
            "NULL is not a valid argument value",
        )),
        Some(other) => Err(invalid_option(
            name,
            &format!("expected a boolean literal, got {other}"),
        )),
    }
}
