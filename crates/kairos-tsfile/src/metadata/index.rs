//! Metadata index entries and nodes.
//!
//! The metadata index is a tree of nodes stored as byte ranges. Each node
//! carries an ordered list of entries pointing at its children (or, for
//! leaf-measurement nodes, at runs of serialized timeseries-metadata
//! records), the end offset of its last child's byte range, and a type
//! tag placing it in the device or measurement level of the tree.
//!
//! # Node Layout
//!
//! ```text
//! +----------------+---------------------------+----------------+----------+
//! | child count(4) | entries (name len, name,  | end offset (8) | type (1) |
//! |                |  offset) x count          |                |          |
//! +----------------+---------------------------+----------------+----------+
//! ```

use bytes::{Buf, BufMut};

use super::{get_name, put_name, require};
use crate::error::{TsFileError, TsFileResult};

/// Position of a node within the metadata index tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MetadataIndexNodeType {
    /// Internal node of the device level.
    InternalDevice = 1,
    /// Bottom node of the device level; its entries name devices and
    /// point at measurement subtrees.
    LeafDevice = 2,
    /// Internal node of the measurement level.
    InternalMeasurement = 3,
    /// Bottom node of the measurement level; its entries point at runs
    /// of serialized timeseries-metadata records.
    LeafMeasurement = 4,
}

impl MetadataIndexNodeType {
    /// Converts the node type to its on-disk tag.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Creates a node type from an on-disk tag.
    pub fn from_u8(value: u8) -> TsFileResult<Self> {
        match value {
            1 => Ok(Self::InternalDevice),
            2 => Ok(Self::LeafDevice),
            3 => Ok(Self::InternalMeasurement),
            4 => Ok(Self::LeafMeasurement),
            _ => Err(TsFileError::deserialization(format!(
                "unknown metadata index node type: {}",
                value
            ))),
        }
    }

    /// Returns true if this node's entries point at record runs rather
    /// than further index nodes.
    pub const fn is_leaf_measurement(self) -> bool {
        matches!(self, Self::LeafMeasurement)
    }

    /// Returns true if this node's entries denote device boundaries.
    pub const fn is_leaf_device(self) -> bool {
        matches!(self, Self::LeafDevice)
    }
}

/// One child pointer within a metadata index node.
///
/// `name` is the device identifier for entries of a leaf-device node; for
/// all other entries it is a routing placeholder (the first name covered
/// by the child's subtree). Entries are immutable once read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataIndexEntry {
    name: String,
    offset: u64,
}

impl MetadataIndexEntry {
    /// Creates a new entry.
    pub fn new(name: impl Into<String>, offset: u64) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }

    /// Returns the entry's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the start offset of the entry's byte range.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Serializes the entry.
    pub fn serialize(&self, buf: &mut impl BufMut) -> TsFileResult<()> {
        put_name(buf, &self.name, "index entry name")?;
        buf.put_u64(self.offset);
        Ok(())
    }

    /// Deserializes one entry from the buffer.
    pub fn deserialize(buf: &mut impl Buf) -> TsFileResult<Self> {
        let name = get_name(buf, "index entry name")?;
        require(buf, 8, "index entry offset")?;
        let offset = buf.get_u64();
        Ok(Self { name, offset })
    }
}

/// A decoded metadata index node.
///
/// `end_offset` bounds the byte range of the node's *last child*; it is
/// not the node's own serialized length. A node with no children is a
/// malformed file and is rejected at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataIndexNode {
    node_type: MetadataIndexNodeType,
    children: Vec<MetadataIndexEntry>,
    end_offset: u64,
}

impl MetadataIndexNode {
    /// Creates a new node.
    pub fn new(
        node_type: MetadataIndexNodeType,
        children: Vec<MetadataIndexEntry>,
        end_offset: u64,
    ) -> Self {
        Self {
            node_type,
            children,
            end_offset,
        }
    }

    /// Returns the node's type tag.
    pub fn node_type(&self) -> MetadataIndexNodeType {
        self.node_type
    }

    /// Returns the node's child entries, in file order.
    pub fn children(&self) -> &[MetadataIndexEntry] {
        &self.children
    }

    /// Returns the exclusive end offset of the last child's byte range.
    pub fn end_offset(&self) -> u64 {
        self.end_offset
    }

    /// Serializes the node.
    pub fn serialize(&self, buf: &mut impl BufMut) -> TsFileResult<()> {
        buf.put_u32(self.children.len() as u32);
        for child in &self.children {
            child.serialize(buf)?;
        }
        buf.put_u64(self.end_offset);
        buf.put_u8(self.node_type.as_u8());
        Ok(())
    }

    /// Deserializes one node from the front of the buffer.
    ///
    /// Trailing bytes beyond the node are left unconsumed.
    pub fn deserialize(buf: &mut impl Buf) -> TsFileResult<Self> {
        require(buf, 4, "index node child count")?;
        let child_count = buf.get_u32() as usize;
        if child_count == 0 {
            return Err(TsFileError::corrupted("index node has no children"));
        }

        let mut children = Vec::with_capacity(child_count);
        for _ in 0..child_count {
            children.push(MetadataIndexEntry::deserialize(buf)?);
        }

        require(buf, 9, "index node trailer")?;
        let end_offset = buf.get_u64();
        let node_type = MetadataIndexNodeType::from_u8(buf.get_u8())?;

        Ok(Self {
            node_type,
            children,
            end_offset,
        })
    }
}
