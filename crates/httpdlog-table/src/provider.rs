//! DataFusion `TableProvider` for `read_httpd_log`.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use async_trait::async_trait;
use datafusion::catalog::{Session, TableProvider};
use datafusion::error::Result as DFResult;
use datafusion::logical_expr::{Expr, TableType};
use datafusion::physical_plan::ExecutionPlan;
use httpdlog_format::schema::{arrow_schema, output_columns, OutputColumn};
use httpdlog_format::CompiledFormat;

use crate::config::ScanConfig;
use crate::error::TableError;
use crate::exec::HttpdLogExec;
use crate::options::{resolve_scan, HttpdLogOptions};

/// Table over one or more Apache access-log files.
///
/// Built at bind time: the path glob is expanded, the format resolved (and,
/// when needed, auto-detected from sample lines), and the schema published.
/// Scanning streams each file on its own partition.
#[derive(Debug)]
pub struct HttpdLogTableProvider {
    files: Arc<Vec<PathBuf>>,
    format: Arc<CompiledFormat>,
    columns: Arc<Vec<OutputColumn>>,
    schema: SchemaRef,
    format_type: String,
    raw: bool,
    config: ScanConfig,
}

impl HttpdLogTableProvider {
    /// Resolve a path (or glob) and options into a scannable table.
    pub fn try_new(
        path: &str,
        options: HttpdLogOptions,
        config: ScanConfig,
    ) -> Result<Self, TableError> {
        let resolved = resolve_scan(path, &options)?;
        let columns = output_columns(&resolved.format, resolved.raw);
        let schema = arrow_schema(&columns);

        Ok(Self {
            files: Arc::new(resolved.files),
            format: resolved.format,
            columns: Arc::new(columns),
            schema,
            format_type: resolved.format_type,
            raw: resolved.raw,
            config,
        })
    }

    /// The resolved format label (`common`, `combined`, `custom`, a conf
    /// nickname, or `unknown`).
    pub fn format_type(&self) -> &str {
        &self.format_type
    }

    /// The files this table scans.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

#[async_trait]
impl TableProvider for HttpdLogTableProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    fn table_type(&self) -> TableType {
        TableType::Base
    }

    async fn scan(
        &self,
        _state: &dyn Session,
        projection: Option<&Vec<usize>>,
        _filters: &[Expr],
        _limit: Option<usize>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        let projection: Vec<usize> = match projection {
            Some(indices) => indices.clone(),
            None => (0..self.columns.len()).collect(),
        };
        let projected_schema = Arc::new(self.schema.project(&projection)?);

        Ok(Arc::new(HttpdLogExec::new(
            Arc::clone(&self.files),
            Arc::clone(&self.format),
            Arc::clone(&self.columns),
            projection,
            projected_schema,
            self.format_type.clone(),
            self.raw,
            self.config.batch_size,
        )))
    }
}
