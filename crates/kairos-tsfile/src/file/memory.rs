//! In-memory byte source.

use bytes::Bytes;

use super::source::FileSource;
use crate::error::{TsFileError, TsFileResult};

/// A [`FileSource`] over a byte buffer, used in tests and benchmarks.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Bytes,
}

impl MemorySource {
    /// Creates a source over the given bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl FileSource for MemorySource {
    fn size(&self) -> TsFileResult<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn read_range(&self, start: u64, end: u64) -> TsFileResult<Bytes> {
        if start > end {
            return Err(TsFileError::InvalidRange { start, end });
        }
        if end > self.bytes.len() as u64 {
            return Err(TsFileError::RangeOutOfBounds {
                start,
                end,
                file_size: self.bytes.len() as u64,
            });
        }

        Ok(self.bytes.slice(start as usize..end as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_range() {
        let source = MemorySource::new(&b"0123456789"[..]);
        assert_eq!(source.size().unwrap(), 10);
        assert_eq!(source.read_range(2, 6).unwrap().as_ref(), b"2345");
        assert!(source.read_range(10, 10).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_bounds() {
        let source = MemorySource::from(vec![1, 2, 3]);
        assert!(matches!(
            source.read_range(1, 5).unwrap_err(),
            TsFileError::RangeOutOfBounds { .. }
        ));
        assert!(matches!(
            source.read_range(3, 2).unwrap_err(),
            TsFileError::InvalidRange { .. }
        ));
    }
}
