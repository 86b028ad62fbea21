//! Byte-range source trait.

use bytes::Bytes;

use crate::error::TsFileResult;

/// A random-access source of file bytes.
///
/// Implementations return the exact byte range `[start, end)` or fail;
/// short reads are surfaced as errors, never as truncated buffers. The
/// source owns any underlying handle and releases it on drop, so callers
/// need no explicit cleanup.
pub trait FileSource: Send + Sync {
    /// Returns the total size of the source in bytes.
    fn size(&self) -> TsFileResult<u64>;

    /// Reads the byte range `[start, end)`.
    ///
    /// Fails with [`crate::TsFileError::InvalidRange`] if `start > end`
    /// and [`crate::TsFileError::RangeOutOfBounds`] if the range extends
    /// past the end of the source.
    fn read_range(&self, start: u64, end: u64) -> TsFileResult<Bytes>;
}
