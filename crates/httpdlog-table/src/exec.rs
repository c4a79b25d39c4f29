//! Physical plan for log scans: one partition per file.
//!
//! Parallelism is driven by the engine scheduling partitions onto its worker
//! budget; a single file is never split across workers, so rows within a file
//! keep their physical order. The compiled format is shared immutably across
//! partitions.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use datafusion::common::stats::Precision;
use datafusion::common::Statistics;
use datafusion::error::Result as DFResult;
use datafusion::execution::TaskContext;
use datafusion::physical_expr::EquivalenceProperties;
use datafusion::physical_plan::execution_plan::{Boundedness, EmissionType};
use datafusion::physical_plan::stream::RecordBatchStreamAdapter;
use datafusion::physical_plan::{
    DisplayAs, DisplayFormatType, ExecutionPlan, Partitioning, PlanProperties,
    SendableRecordBatchStream,
};
use httpdlog_format::schema::OutputColumn;
use httpdlog_format::CompiledFormat;

use crate::config::ESTIMATED_ROWS_PER_FILE;
use crate::stream::file_scan_stream;

/// Scan execution plan over a fixed file list.
#[derive(Debug)]
pub struct HttpdLogExec {
    files: Arc<Vec<PathBuf>>,
    format: Arc<CompiledFormat>,
    columns: Arc<Vec<OutputColumn>>,
    projection: Vec<usize>,
    projected_schema: SchemaRef,
    format_type: String,
    raw: bool,
    batch_size: usize,
    properties: PlanProperties,
}

impl HttpdLogExec {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        files: Arc<Vec<PathBuf>>,
        format: Arc<CompiledFormat>,
        columns: Arc<Vec<OutputColumn>>,
        projection: Vec<usize>,
        projected_schema: SchemaRef,
        format_type: String,
        raw: bool,
        batch_size: usize,
    ) -> Self {
        let properties = PlanProperties::new(
            EquivalenceProperties::new(projected_schema.clone()),
            Partitioning::UnknownPartitioning(files.len()),
            EmissionType::Incremental,
            Boundedness::Bounded,
        );
        Self {
            files,
            format,
            columns,
            projection,
            projected_schema,
            format_type,
            raw,
            batch_size,
            properties,
        }
    }
}

impl DisplayAs for HttpdLogExec {
    fn fmt_as(&self, t: DisplayFormatType, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match t {
            DisplayFormatType::Default | DisplayFormatType::Verbose => {
                write!(
                    f,
                    "HttpdLogExec: files={}, format_type={}, columns={}",
                    self.files.len(),
                    self.format_type,
                    self.projection.len(),
                )
            }
            DisplayFormatType::TreeRender => {
                write!(f, "files={}", self.files.len())
            }
        }
    }
}

impl ExecutionPlan for HttpdLogExec {
    fn name(&self) -> &str {
        "HttpdLogExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn properties(&self) -> &PlanProperties {
        &self.properties
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        _children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        Ok(self)
    }

    fn execute(
        &self,
        partition: usize,
        _context: Arc<TaskContext>,
    ) -> DFResult<SendableRecordBatchStream> {
        let path = self.files[partition].clone();
        tracing::debug!(
            path = %path.display(),
            partition,
            format_type = %self.format_type,
            "starting httpd log partition"
        );

        let stream = file_scan_stream(
            path,
            Arc::clone(&self.format),
            &self.columns,
            &self.projection,
            self.projected_schema.clone(),
            self.raw,
            self.batch_size,
        );
        Ok(Box::pin(RecordBatchStreamAdapter::new(
            self.projected_schema.clone(),
            stream,
        )))
    }

    fn partition_statistics(&self, partition: Option<usize>) -> DFResult<Statistics> {
        // Line counts are unknown until read; give the planner the same rough
        // per-file estimate the cardinality callback used upstream.
        let files = match partition {
            Some(_) => 1,
            None => self.files.len(),
        };
        let mut statistics = Statistics::new_unknown(&self.projected_schema);
        statistics.num_rows = Precision::Inexact(files * ESTIMATED_ROWS_PER_FILE);
        Ok(statistics)
    }
}
