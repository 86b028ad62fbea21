//! KTS file reader.

use std::path::Path;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use parking_lot::Mutex;
use tracing::debug;

use kairos_common::{KTS_FILE_MAGIC, KTS_FOOTER_SIZE, KTS_FORMAT_VERSION, KTS_HEADER_SIZE};

use crate::config::ScanConfig;
use crate::error::{TsFileError, TsFileResult};
use crate::file::{FileSource, StandardFile};
use crate::metadata::{MetadataIndexNode, TsFileMetadata};
use crate::scan::TimeseriesMetadataScan;

/// Random-access reader over one KTS file.
///
/// The reader owns the file source and lazily loads the file metadata on
/// first use. It is cheap to share: every scan constructed from it owns
/// an independent cursor, and concurrent scans never share mutable state
/// beyond the read-only file itself.
pub struct TsFileReader {
    source: Box<dyn FileSource>,
    metadata: Mutex<Option<Arc<TsFileMetadata>>>,
}

impl TsFileReader {
    /// Opens the KTS file at `path`.
    pub fn open(path: impl AsRef<Path>) -> TsFileResult<Self> {
        Ok(Self::new(Box::new(StandardFile::open(path)?)))
    }

    /// Creates a reader over an arbitrary file source.
    ///
    /// No validation happens here; the file header and footer are checked
    /// when the file metadata is first loaded.
    pub fn new(source: Box<dyn FileSource>) -> Self {
        Self {
            source,
            metadata: Mutex::new(None),
        }
    }

    /// Reads the byte range `[start, end)` from the underlying source.
    pub fn read_range(&self, start: u64, end: u64) -> TsFileResult<Bytes> {
        self.source.read_range(start, end)
    }

    /// Returns the file metadata, loading and validating it on first call.
    pub fn file_metadata(&self) -> TsFileResult<Arc<TsFileMetadata>> {
        let mut slot = self.metadata.lock();
        if let Some(meta) = slot.as_ref() {
            return Ok(Arc::clone(meta));
        }

        let meta = Arc::new(self.load_file_metadata()?);
        *slot = Some(Arc::clone(&meta));
        Ok(meta)
    }

    /// Returns the root node of the metadata index, triggering lazy
    /// file-metadata initialization if needed.
    pub fn root_index_node(&self) -> TsFileResult<MetadataIndexNode> {
        Ok(self.file_metadata()?.root().clone())
    }

    /// Starts an incremental scan over all timeseries metadata in the
    /// file, grouped per device.
    pub fn scan_timeseries_metadata(
        &self,
        config: ScanConfig,
    ) -> TsFileResult<TimeseriesMetadataScan<'_>> {
        TimeseriesMetadataScan::new(self, config)
    }

    fn load_file_metadata(&self) -> TsFileResult<TsFileMetadata> {
        let size = self.source.size()?;
        if size < (KTS_HEADER_SIZE + KTS_FOOTER_SIZE) as u64 {
            return Err(TsFileError::corrupted(format!(
                "file too small to be a KTS file: {} bytes",
                size
            )));
        }

        // Header: magic + version.
        let mut header = self.source.read_range(0, KTS_HEADER_SIZE as u64)?;
        let magic = header.get_u32();
        if magic != KTS_FILE_MAGIC {
            return Err(TsFileError::InvalidMagic {
                expected: KTS_FILE_MAGIC,
                found: magic,
            });
        }
        let version = header.get_u8();
        if version != KTS_FORMAT_VERSION {
            return Err(TsFileError::UnsupportedVersion {
                expected: KTS_FORMAT_VERSION,
                found: version,
            });
        }

        // Footer: file-metadata length + magic.
        let mut footer = self.source.read_range(size - KTS_FOOTER_SIZE as u64, size)?;
        let meta_len = footer.get_u32() as u64;
        let tail_magic = footer.get_u32();
        if tail_magic != KTS_FILE_MAGIC {
            return Err(TsFileError::InvalidMagic {
                expected: KTS_FILE_MAGIC,
                found: tail_magic,
            });
        }

        let meta_end = size - KTS_FOOTER_SIZE as u64;
        let meta_start = meta_end.checked_sub(meta_len).ok_or_else(|| {
            TsFileError::corrupted(format!(
                "file metadata length {} exceeds file size {}",
                meta_len, size
            ))
        })?;
        if meta_start < KTS_HEADER_SIZE as u64 {
            return Err(TsFileError::corrupted(format!(
                "file metadata overlaps the header: starts at {}",
                meta_start
            )));
        }

        let mut meta_bytes = self.source.read_range(meta_start, meta_end)?;
        let metadata = TsFileMetadata::deserialize(&mut meta_bytes)?;

        debug!(
            file_size = size,
            root_type = ?metadata.root().node_type(),
            root_children = metadata.root().children().len(),
            "loaded KTS file metadata"
        );

        Ok(metadata)
    }
}
