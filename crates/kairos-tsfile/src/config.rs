//! Configuration for scanning and writing KTS metadata.

use kairos_common::{DEFAULT_INDEX_FAN_OUT, DEFAULT_SCAN_BATCH_CAP, MIN_INDEX_FAN_OUT};

use crate::error::{TsFileError, TsFileResult};

/// Configuration for a timeseries-metadata scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum number of records materialized by a single batch-advance
    /// call. This is a per-call yield ceiling, not a global limit.
    pub batch_cap: usize,

    /// Whether per-chunk metadata is decoded for each record. When false
    /// the chunk lists are skipped without decoding.
    pub include_chunk_metadata: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_cap: DEFAULT_SCAN_BATCH_CAP,
            include_chunk_metadata: false,
        }
    }
}

impl ScanConfig {
    /// Creates a scan configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-call record cap.
    #[must_use]
    pub fn with_batch_cap(mut self, cap: usize) -> Self {
        self.batch_cap = cap;
        self
    }

    /// Sets whether per-chunk metadata is decoded.
    #[must_use]
    pub fn with_chunk_metadata(mut self, include: bool) -> Self {
        self.include_chunk_metadata = include;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> TsFileResult<()> {
        if self.batch_cap == 0 {
            return Err(TsFileError::config("batch cap must be positive"));
        }
        Ok(())
    }
}

/// Configuration for the metadata writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Fan-out of the metadata index: the maximum number of entries per
    /// index node, and of records covered by a single leaf entry.
    pub index_fan_out: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            index_fan_out: DEFAULT_INDEX_FAN_OUT,
        }
    }
}

impl WriterConfig {
    /// Creates a writer configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the index fan-out.
    #[must_use]
    pub fn with_index_fan_out(mut self, fan_out: usize) -> Self {
        self.index_fan_out = fan_out;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> TsFileResult<()> {
        if self.index_fan_out < MIN_INDEX_FAN_OUT {
            return Err(TsFileError::config(format!(
                "index fan-out must be at least {}",
                MIN_INDEX_FAN_OUT
            )));
        }
        Ok(())
    }
}
