//! # kairos-tsfile
//!
//! Reader for the Kairos columnar time-series file format (KTS files).
//!
//! A KTS file stores, alongside its column data, a hierarchical metadata
//! index (device → measurement) that locates the per-measurement metadata
//! records without loading the whole index into memory. This crate
//! implements the metadata side of the format: the codecs, the file
//! reader, a metadata writer, and an incremental, stack-based traversal
//! of the index tree exposed as a restartable batch iterator.
//!
//! # File Layout
//!
//! ```text
//! +-------------------------------+
//! | magic (4) | version (1)       |  header
//! +-------------------------------+
//! | timeseries metadata records   |  leaf byte ranges, grouped per device
//! | metadata index nodes          |  bottom-up, per device then global
//! +-------------------------------+
//! | file metadata                 |  root index node + metadata offset
//! +-------------------------------+
//! | meta length (4) | magic (4)   |  footer
//! +-------------------------------+
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use kairos_tsfile::{ScanConfig, TsFileReader};
//!
//! fn example() -> kairos_tsfile::TsFileResult<()> {
//!     let reader = TsFileReader::open("data.kts")?;
//!     let mut scan = reader.scan_timeseries_metadata(ScanConfig::default())?;
//!
//!     while let Some(batch) = scan.next_batch()? {
//!         for (device, records) in &batch {
//!             println!("{device}: {} records", records.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;

/// File-access layer for byte-range reads.
pub mod file;

/// Metadata model and on-disk codecs.
pub mod metadata;

/// KTS file reader.
pub mod reader;

/// Incremental traversal of the metadata index.
pub mod scan;

/// Metadata writer for producing KTS files.
pub mod write;

// Re-exports for convenience
pub use config::{ScanConfig, WriterConfig};
pub use error::{TsFileError, TsFileResult};
pub use reader::TsFileReader;
pub use scan::{DeviceBatch, TimeseriesMetadataScan};
pub use write::TsFileWriter;
