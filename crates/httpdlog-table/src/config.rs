//! Scan configuration.

/// Default rows per output batch, matching the host engine's usual batch
/// size for analytical scans.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Estimated rows per log file, used for planner cardinality.
pub const ESTIMATED_ROWS_PER_FILE: usize = 10_000;

/// Tunables for a log scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum rows per emitted RecordBatch.
    pub batch_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
