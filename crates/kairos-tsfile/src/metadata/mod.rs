//! Metadata model and on-disk codecs for KTS files.
//!
//! All structures serialize with fixed-width integers via `bytes`
//! (`Buf`/`BufMut`); names are u16-length-prefixed UTF-8. Every codec is
//! symmetric: what `serialize` writes, `deserialize` reads back.

mod file_meta;
mod index;
mod statistics;
mod timeseries;

pub use file_meta::TsFileMetadata;
pub use index::{MetadataIndexEntry, MetadataIndexNode, MetadataIndexNodeType};
pub use statistics::Statistics;
pub use timeseries::{ChunkMetadata, TimeseriesMetadata, TsDataType};

use bytes::{Buf, BufMut};
use kairos_common::MAX_NAME_LEN;

use crate::error::{TsFileError, TsFileResult};

/// Checks that `buf` still holds at least `needed` bytes before a read.
fn require(buf: &impl Buf, needed: usize, what: &str) -> TsFileResult<()> {
    if buf.remaining() < needed {
        return Err(TsFileError::deserialization(format!(
            "not enough bytes for {}: {} < {}",
            what,
            buf.remaining(),
            needed
        )));
    }
    Ok(())
}

/// Reads a u16-length-prefixed UTF-8 string.
fn get_name(buf: &mut impl Buf, what: &str) -> TsFileResult<String> {
    require(buf, 2, what)?;
    let len = buf.get_u16() as usize;
    require(buf, len, what)?;

    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec())
        .map_err(|_| TsFileError::deserialization(format!("{} is not valid UTF-8", what)))
}

/// Writes a u16-length-prefixed UTF-8 string.
fn put_name(buf: &mut impl BufMut, name: &str, what: &str) -> TsFileResult<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(TsFileError::deserialization(format!(
            "{} too long: {} bytes exceeds maximum {}",
            what,
            name.len(),
            MAX_NAME_LEN
        )));
    }
    buf.put_u16(name.len() as u16);
    buf.put_slice(name.as_bytes());
    Ok(())
}
