//! Per-file line scanning into RecordBatches.
//!
//! Each file is owned by exactly one worker for its entire lifetime; there is
//! no intra-file parallelism. The worker state here (reader, line buffer,
//! regex scratch, builders) is private to the stream, and the file handle is
//! released whenever the stream is dropped, including on cancellation.

use std::path::PathBuf;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use datafusion::error::{DataFusionError, Result as DFResult};
use futures::Stream;
use httpdlog_format::materialize::RowMaterializer;
use httpdlog_format::recognizer::LineScratch;
use httpdlog_format::schema::OutputColumn;
use httpdlog_format::CompiledFormat;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Per-worker scan state for one log file.
struct FileScan {
    path: PathBuf,
    format: Arc<CompiledFormat>,
    schema: SchemaRef,
    scratch: LineScratch,
    materializer: RowMaterializer,
    raw: bool,
    batch_size: usize,
    reader: Option<BufReader<File>>,
    buf: String,
    line_number: i64,
    rows_emitted: u64,
    parse_errors: u64,
    bytes_scanned: u64,
    done: bool,
}

impl FileScan {
    async fn next_batch(&mut self) -> DFResult<Option<RecordBatch>> {
        if self.reader.is_none() && !self.done {
            match File::open(&self.path).await {
                Ok(file) => self.reader = Some(BufReader::new(file)),
                Err(err) => {
                    // I/O failures are fatal for this file only; other files
                    // in the scan keep going.
                    tracing::error!(path = %self.path.display(), error = %err, "failed to open log file");
                    self.done = true;
                }
            }
        }

        while !self.done && self.materializer.len() < self.batch_size {
            let Some(reader) = self.reader.as_mut() else {
                break;
            };
            self.buf.clear();
            match reader.read_line(&mut self.buf).await {
                Ok(0) => {
                    self.finish_file();
                }
                Ok(n) => {
                    self.bytes_scanned += n as u64;
                    self.line_number += 1;
                    let line = self.buf.trim_end_matches(['\r', '\n']);
                    if line.is_empty() {
                        continue;
                    }
                    if self.format.recognize(line, &mut self.scratch) {
                        self.materializer
                            .append_parsed(line, self.line_number, &self.scratch);
                        self.rows_emitted += 1;
                    } else {
                        self.parse_errors += 1;
                        if self.raw {
                            self.materializer.append_unparsed(line, self.line_number);
                            self.rows_emitted += 1;
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(path = %self.path.display(), error = %err, "error reading log file");
                    self.finish_file();
                }
            }
        }

        if self.materializer.is_empty() {
            return Ok(None);
        }

        let rows = self.materializer.len();
        let arrays = self.materializer.finish();
        let batch = RecordBatch::try_new_with_options(
            self.schema.clone(),
            arrays,
            &RecordBatchOptions::new().with_row_count(Some(rows)),
        )
        .map_err(DataFusionError::from)?;
        Ok(Some(batch))
    }

    fn finish_file(&mut self) {
        self.done = true;
        self.reader = None;
        tracing::debug!(
            path = %self.path.display(),
            lines = self.line_number,
            rows = self.rows_emitted,
            parse_errors = self.parse_errors,
            bytes = self.bytes_scanned,
            "finished scanning log file"
        );
    }
}

/// Build the batch stream for one file partition.
pub(crate) fn file_scan_stream(
    path: PathBuf,
    format: Arc<CompiledFormat>,
    columns: &[OutputColumn],
    projection: &[usize],
    projected_schema: SchemaRef,
    raw: bool,
    batch_size: usize,
) -> impl Stream<Item = DFResult<RecordBatch>> + Send {
    let materializer =
        RowMaterializer::new(columns, projection, &path.to_string_lossy(), batch_size);
    let scratch = format.new_scratch();
    let state = FileScan {
        path,
        format,
        schema: projected_schema,
        scratch,
        materializer,
        raw,
        batch_size,
        reader: None,
        buf: String::new(),
        line_number: 0,
        rows_emitted: 0,
        parse_errors: 0,
        bytes_scanned: 0,
        done: false,
    };

    futures::stream::try_unfold(state, |mut state| async move {
        Ok(state.next_batch().await?.map(|batch| (batch, state)))
    })
}
