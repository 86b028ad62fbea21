//! Per-series and per-chunk value statistics.

use bytes::{Buf, BufMut};
use kairos_common::types::Timestamp;

use super::require;
use crate::error::TsFileResult;

/// Summary statistics over a run of data points.
///
/// Stored as a fixed 48-byte block: point count, start/end timestamps,
/// and min/max/sum of the values interpreted as doubles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Number of data points covered.
    pub count: u64,
    /// Timestamp of the first point.
    pub start_time: Timestamp,
    /// Timestamp of the last point.
    pub end_time: Timestamp,
    /// Smallest value.
    pub min_value: f64,
    /// Largest value.
    pub max_value: f64,
    /// Sum of all values.
    pub sum_value: f64,
}

impl Statistics {
    /// Serialized size in bytes.
    pub const SERIALIZED_SIZE: usize = 48;

    /// Creates a statistics block.
    pub fn new(
        count: u64,
        start_time: Timestamp,
        end_time: Timestamp,
        min_value: f64,
        max_value: f64,
        sum_value: f64,
    ) -> Self {
        Self {
            count,
            start_time,
            end_time,
            min_value,
            max_value,
            sum_value,
        }
    }

    /// Statistics over zero points.
    pub fn empty() -> Self {
        Self {
            count: 0,
            start_time: Timestamp::INVALID,
            end_time: Timestamp::INVALID,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
            sum_value: 0.0,
        }
    }

    /// Returns true if no points are covered.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Serializes the statistics block.
    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.count);
        buf.put_i64(self.start_time.as_millis());
        buf.put_i64(self.end_time.as_millis());
        buf.put_f64(self.min_value);
        buf.put_f64(self.max_value);
        buf.put_f64(self.sum_value);
    }

    /// Deserializes a statistics block.
    pub fn deserialize(buf: &mut impl Buf) -> TsFileResult<Self> {
        require(buf, Self::SERIALIZED_SIZE, "statistics")?;
        Ok(Self {
            count: buf.get_u64(),
            start_time: Timestamp::new(buf.get_i64()),
            end_time: Timestamp::new(buf.get_i64()),
            min_value: buf.get_f64(),
            max_value: buf.get_f64(),
            sum_value: buf.get_f64(),
        })
    }
}
