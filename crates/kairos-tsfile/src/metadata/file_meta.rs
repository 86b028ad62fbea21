//! File-level metadata: the root of the metadata index.

use bytes::{Buf, BufMut};

use super::index::MetadataIndexNode;
use super::require;
use crate::error::TsFileResult;

/// File-level metadata stored just before the footer.
///
/// Holds the root node of the metadata index and the offset at which the
/// metadata region (record runs and index nodes) begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsFileMetadata {
    root: MetadataIndexNode,
    meta_offset: u64,
}

impl TsFileMetadata {
    /// Creates file metadata from a root index node and region offset.
    pub fn new(root: MetadataIndexNode, meta_offset: u64) -> Self {
        Self { root, meta_offset }
    }

    /// Returns the root node of the metadata index.
    pub fn root(&self) -> &MetadataIndexNode {
        &self.root
    }

    /// Returns the offset at which the metadata region begins.
    pub fn meta_offset(&self) -> u64 {
        self.meta_offset
    }

    /// Serializes the file metadata.
    pub fn serialize(&self, buf: &mut impl BufMut) -> TsFileResult<()> {
        self.root.serialize(buf)?;
        buf.put_u64(self.meta_offset);
        Ok(())
    }

    /// Deserializes file metadata.
    pub fn deserialize(buf: &mut impl Buf) -> TsFileResult<Self> {
        let root = MetadataIndexNode::deserialize(buf)?;
        require(buf, 8, "metadata region offset")?;
        let meta_offset = buf.get_u64();
        Ok(Self { root, meta_offset })
    }
}
