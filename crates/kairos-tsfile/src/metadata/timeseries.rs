//! Timeseries metadata records and per-chunk metadata.
//!
//! A timeseries-metadata record is the leaf payload of the metadata
//! index: one record per measurement, carrying the series statistics and
//! the locations of the measurement's data chunks.
//!
//! # Record Layout
//!
//! ```text
//! +----------------------------+-----------+------------+
//! | measurement (len, bytes)   | type (1)  | stats (48) |
//! +----------------------------+-----------+------------+
//! | chunk list size (4) | chunk metadata x N            |
//! +------------------------------------------------------+
//! ```
//!
//! The chunk list is length-prefixed in bytes so a reader that does not
//! need per-chunk metadata can skip it without decoding.

use bytes::{Buf, BufMut};
use kairos_common::types::MeasurementId;

use super::statistics::Statistics;
use super::{get_name, put_name, require};
use crate::error::{TsFileError, TsFileResult};

/// Data type of a measurement's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TsDataType {
    /// Boolean values.
    Boolean = 1,
    /// 32-bit signed integers.
    Int32 = 2,
    /// 64-bit signed integers.
    Int64 = 3,
    /// 32-bit floating point.
    Float = 4,
    /// 64-bit floating point.
    Double = 5,
    /// Variable-length text.
    Text = 6,
}

impl TsDataType {
    /// Converts the data type to its on-disk tag.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Creates a data type from an on-disk tag.
    pub fn from_u8(value: u8) -> TsFileResult<Self> {
        match value {
            1 => Ok(Self::Boolean),
            2 => Ok(Self::Int32),
            3 => Ok(Self::Int64),
            4 => Ok(Self::Float),
            5 => Ok(Self::Double),
            6 => Ok(Self::Text),
            _ => Err(TsFileError::deserialization(format!(
                "unknown data type tag: {}",
                value
            ))),
        }
    }
}

/// Location and statistics of one data chunk.
///
/// Fixed-size on disk: data offset (8) + statistics (48).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkMetadata {
    /// Offset of the chunk's data within the file.
    pub data_offset: u64,
    /// Statistics over the chunk's points.
    pub statistics: Statistics,
}

impl ChunkMetadata {
    /// Serialized size in bytes.
    pub const SERIALIZED_SIZE: usize = 8 + Statistics::SERIALIZED_SIZE;

    /// Creates a chunk-metadata record.
    pub fn new(data_offset: u64, statistics: Statistics) -> Self {
        Self {
            data_offset,
            statistics,
        }
    }

    /// Serializes the chunk metadata.
    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.data_offset);
        self.statistics.serialize(buf);
    }

    /// Deserializes one chunk-metadata record.
    pub fn deserialize(buf: &mut impl Buf) -> TsFileResult<Self> {
        require(buf, Self::SERIALIZED_SIZE, "chunk metadata")?;
        Ok(Self {
            data_offset: buf.get_u64(),
            statistics: Statistics::deserialize(buf)?,
        })
    }
}

/// Metadata for one measurement: the leaf payload of the metadata index.
///
/// The traversal engine treats a record as an indivisible unit; it is
/// never partially emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesMetadata {
    /// The measurement this record describes.
    pub measurement: MeasurementId,
    /// Data type of the measurement's values.
    pub data_type: TsDataType,
    /// Statistics over the whole series.
    pub statistics: Statistics,
    /// Per-chunk metadata, present when decoded with
    /// `include_chunk_metadata` and on records built for writing.
    pub chunk_metadata: Option<Vec<ChunkMetadata>>,
}

impl TimeseriesMetadata {
    /// Creates a record with per-chunk metadata.
    pub fn new(
        measurement: MeasurementId,
        data_type: TsDataType,
        statistics: Statistics,
        chunk_metadata: Vec<ChunkMetadata>,
    ) -> Self {
        Self {
            measurement,
            data_type,
            statistics,
            chunk_metadata: Some(chunk_metadata),
        }
    }

    /// Serializes the record, always including the chunk list (an absent
    /// list serializes as empty).
    pub fn serialize(&self, buf: &mut impl BufMut) -> TsFileResult<()> {
        put_name(buf, self.measurement.as_str(), "measurement name")?;
        buf.put_u8(self.data_type.as_u8());
        self.statistics.serialize(buf);

        let chunks = self.chunk_metadata.as_deref().unwrap_or(&[]);
        buf.put_u32((chunks.len() * ChunkMetadata::SERIALIZED_SIZE) as u32);
        for chunk in chunks {
            chunk.serialize(buf);
        }
        Ok(())
    }

    /// Deserializes exactly one record, advancing the buffer past it.
    ///
    /// With `include_chunk_metadata` false the chunk list is skipped
    /// without decoding and `chunk_metadata` is `None`.
    pub fn deserialize(buf: &mut impl Buf, include_chunk_metadata: bool) -> TsFileResult<Self> {
        let measurement = MeasurementId::new(get_name(buf, "measurement name")?);

        require(buf, 1, "data type tag")?;
        let data_type = TsDataType::from_u8(buf.get_u8())?;
        let statistics = Statistics::deserialize(buf)?;

        require(buf, 4, "chunk list size")?;
        let chunk_list_len = buf.get_u32() as usize;
        require(buf, chunk_list_len, "chunk metadata list")?;

        let chunk_metadata = if include_chunk_metadata {
            if chunk_list_len % ChunkMetadata::SERIALIZED_SIZE != 0 {
                return Err(TsFileError::deserialization(format!(
                    "chunk list size {} is not a multiple of {}",
                    chunk_list_len,
                    ChunkMetadata::SERIALIZED_SIZE
                )));
            }
            let count = chunk_list_len / ChunkMetadata::SERIALIZED_SIZE;
            let mut chunks = Vec::with_capacity(count);
            for _ in 0..count {
                chunks.push(ChunkMetadata::deserialize(buf)?);
            }
            Some(chunks)
        } else {
            buf.advance(chunk_list_len);
            None
        };

        Ok(Self {
            measurement,
            data_type,
            statistics,
            chunk_metadata,
        })
    }
}
