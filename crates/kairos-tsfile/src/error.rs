//! KTS file error types.

use std::io;
use thiserror::Error;

use crate::metadata::MetadataIndexNodeType;

/// Result type for KTS file operations.
pub type TsFileResult<T> = Result<T, TsFileError>;

/// Errors that can occur while reading or writing KTS file metadata.
#[derive(Debug, Error)]
pub enum TsFileError {
    /// I/O error from the underlying file source.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// A fetch or decode failed while processing a specific index entry.
    #[error("failed to process index entry `{name}` (offset {offset}, parent {node_type:?}): {source}")]
    Entry {
        /// Name of the entry being processed (empty for anonymous entries).
        name: String,
        /// Start offset of the entry's byte range.
        offset: u64,
        /// Node type of the entry's parent.
        node_type: MetadataIndexNodeType,
        /// The underlying failure.
        #[source]
        source: Box<TsFileError>,
    },

    /// Invalid file magic number.
    #[error("invalid KTS file magic: expected {expected:#010x}, found {found:#010x}")]
    InvalidMagic {
        /// The magic number required by the format.
        expected: u32,
        /// The magic number found in the file.
        found: u32,
    },

    /// Unsupported file-format version.
    #[error("unsupported KTS format version: expected {expected}, found {found}")]
    UnsupportedVersion {
        /// The version supported by this reader.
        expected: u8,
        /// The version found in the file.
        found: u8,
    },

    /// A byte range with `start > end` was requested.
    #[error("invalid byte range: start {start} exceeds end {end}")]
    InvalidRange {
        /// Inclusive start offset.
        start: u64,
        /// Exclusive end offset.
        end: u64,
    },

    /// A byte range beyond the end of the file was requested.
    #[error("byte range [{start}, {end}) exceeds file size {file_size}")]
    RangeOutOfBounds {
        /// Inclusive start offset.
        start: u64,
        /// Exclusive end offset.
        end: u64,
        /// Total size of the file.
        file_size: u64,
    },

    /// The file's index structure is malformed.
    #[error("corrupted metadata index: {reason}")]
    Corrupted {
        /// Human-readable description of the corruption.
        reason: String,
    },

    /// Decoding a metadata structure from bytes failed.
    #[error("failed to deserialize metadata: {reason}")]
    Deserialization {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A new leaf fetch was requested while the previous leaf buffer still
    /// had unconsumed bytes. This is a driver logic defect, not a data
    /// error; discarding the buffer would corrupt the record stream.
    #[error("leaf buffer still has unconsumed bytes before fetching entry `{name}` at offset {offset}")]
    LeafBufferNotDrained {
        /// Name of the leaf entry whose fetch was refused.
        name: String,
        /// Start offset of the refused entry.
        offset: u64,
    },

    /// A metadata index cannot be built over zero devices.
    #[error("cannot build a metadata index with no devices")]
    EmptyIndex,

    /// Invalid input supplied to the metadata writer.
    #[error("invalid writer input: {reason}")]
    InvalidInput {
        /// Human-readable description of the invalid input.
        reason: String,
    },

    /// Invalid configuration value.
    #[error("configuration error: {reason}")]
    Config {
        /// Human-readable description of the invalid value.
        reason: String,
    },
}

impl TsFileError {
    /// Creates a corruption error.
    pub fn corrupted(reason: impl Into<String>) -> Self {
        Self::Corrupted {
            reason: reason.into(),
        }
    }

    /// Creates a deserialization error.
    pub fn deserialization(reason: impl Into<String>) -> Self {
        Self::Deserialization {
            reason: reason.into(),
        }
    }

    /// Creates a config error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Wraps a failure with the identity of the index entry being
    /// processed when it occurred.
    pub fn for_entry(
        name: impl Into<String>,
        offset: u64,
        node_type: MetadataIndexNodeType,
        source: TsFileError,
    ) -> Self {
        Self::Entry {
            name: name.into(),
            offset,
            node_type,
            source: Box::new(source),
        }
    }

    /// Returns true if this error indicates a malformed or corrupt file.
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Corrupted { .. }
            | Self::Deserialization { .. }
            | Self::InvalidMagic { .. }
            | Self::UnsupportedVersion { .. } => true,
            Self::Entry { source, .. } => source.is_corruption(),
            _ => false,
        }
    }

    /// Returns true if this error originated in the I/O layer.
    pub fn is_io(&self) -> bool {
        match self {
            Self::Io { .. } | Self::RangeOutOfBounds { .. } | Self::InvalidRange { .. } => true,
            Self::Entry { source, .. } => source.is_io(),
            _ => false,
        }
    }
}
