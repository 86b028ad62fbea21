//! Standard-library file backend.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;

use super::source::FileSource;
use crate::error::{TsFileError, TsFileResult};

/// A [`FileSource`] backed by a `std::fs::File`.
///
/// The file size is captured at open time; KTS files are immutable once
/// written, so the cached size stays accurate for the life of the handle.
/// The handle is guarded by a mutex because positioned reads go through
/// seek + read on the shared descriptor.
#[derive(Debug)]
pub struct StandardFile {
    path: PathBuf,
    file: Mutex<File>,
    size: u64,
}

impl StandardFile {
    /// Opens a file for reading.
    pub fn open(path: impl AsRef<Path>) -> TsFileResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path,
            file: Mutex::new(file),
            size,
        })
    }

    /// Returns the path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileSource for StandardFile {
    fn size(&self) -> TsFileResult<u64> {
        Ok(self.size)
    }

    fn read_range(&self, start: u64, end: u64) -> TsFileResult<Bytes> {
        if start > end {
            return Err(TsFileError::InvalidRange { start, end });
        }
        if end > self.size {
            return Err(TsFileError::RangeOutOfBounds {
                start,
                end,
                file_size: self.size,
            });
        }

        let mut buf = vec![0u8; (end - start) as usize];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut buf)?;

        Ok(Bytes::from(buf))
    }
}
