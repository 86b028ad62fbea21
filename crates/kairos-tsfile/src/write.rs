//! Metadata writer for producing KTS files.
//!
//! The writer lays out timeseries-metadata records per device, builds the
//! metadata index tree bottom-up with the configured fan-out, and frames
//! the result with the file header, file metadata, and footer. Column
//! data encoding is out of scope; chunk data offsets inside the records
//! are supplied by the caller.

use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use kairos_common::types::DeviceId;
use kairos_common::{KTS_FILE_MAGIC, KTS_FORMAT_VERSION, KTS_HEADER_SIZE};

use crate::config::WriterConfig;
use crate::error::{TsFileError, TsFileResult};
use crate::metadata::{
    MetadataIndexEntry, MetadataIndexNode, MetadataIndexNodeType, TimeseriesMetadata,
    TsFileMetadata,
};

/// Builds the metadata section of a KTS file.
///
/// Devices and their measurements are serialized in the order they are
/// added; that order becomes the file's global traversal order.
///
/// # Example
///
/// ```rust,no_run
/// use kairos_common::types::DeviceId;
/// use kairos_tsfile::TsFileWriter;
///
/// # fn records() -> Vec<kairos_tsfile::metadata::TimeseriesMetadata> { vec![] }
/// let mut writer = TsFileWriter::new();
/// writer.add_device(DeviceId::new("root.d1"), records());
/// let bytes = writer.finish().unwrap();
/// ```
pub struct TsFileWriter {
    config: WriterConfig,
    devices: Vec<(DeviceId, Vec<TimeseriesMetadata>)>,
}

impl TsFileWriter {
    /// Creates a writer with the default configuration.
    pub fn new() -> Self {
        Self::with_config(WriterConfig::default())
    }

    /// Creates a writer with the given configuration.
    pub fn with_config(config: WriterConfig) -> Self {
        Self {
            config,
            devices: Vec::new(),
        }
    }

    /// Adds a device and its measurement records.
    pub fn add_device(&mut self, device: DeviceId, series: Vec<TimeseriesMetadata>) {
        self.devices.push((device, series));
    }

    /// Serializes the complete file and returns its bytes.
    pub fn finish(self) -> TsFileResult<Bytes> {
        self.config.validate()?;
        if self.devices.is_empty() {
            return Err(TsFileError::EmptyIndex);
        }

        let fan_out = self.config.index_fan_out;
        let mut buf = BytesMut::new();
        buf.put_u32(KTS_FILE_MAGIC);
        buf.put_u8(KTS_FORMAT_VERSION);

        let mut device_entries = Vec::with_capacity(self.devices.len());
        for (device, series) in &self.devices {
            if series.is_empty() {
                return Err(TsFileError::invalid_input(format!(
                    "device `{}` has no measurements",
                    device
                )));
            }

            // Record runs: each leaf entry covers up to `fan_out` records.
            let mut run_entries = Vec::new();
            for chunk in series.chunks(fan_out) {
                let run_offset = buf.len() as u64;
                for record in chunk {
                    record.serialize(&mut buf)?;
                }
                run_entries.push(MetadataIndexEntry::new(
                    chunk[0].measurement.as_str(),
                    run_offset,
                ));
            }

            // Measurement index, bottom-up until a single subtree root.
            let mut entries = run_entries;
            let mut level_type = MetadataIndexNodeType::LeafMeasurement;
            loop {
                let region_end = buf.len() as u64;
                let nodes = build_level(&entries, region_end, level_type, fan_out);
                entries = write_nodes(&mut buf, &nodes)?;
                if entries.len() == 1 {
                    break;
                }
                level_type = MetadataIndexNodeType::InternalMeasurement;
            }

            device_entries.push(MetadataIndexEntry::new(device.as_str(), entries[0].offset()));
        }

        // Device index, bottom-up; the final single node becomes the root
        // stored inside the file metadata rather than the index region.
        let mut entries = device_entries;
        let mut level_type = MetadataIndexNodeType::LeafDevice;
        let root = loop {
            let region_end = buf.len() as u64;
            let mut nodes = build_level(&entries, region_end, level_type, fan_out);
            if nodes.len() == 1 {
                if let Some(node) = nodes.pop() {
                    break node;
                }
            }
            entries = write_nodes(&mut buf, &nodes)?;
            level_type = MetadataIndexNodeType::InternalDevice;
        };

        let file_meta = TsFileMetadata::new(root, KTS_HEADER_SIZE as u64);
        let meta_start = buf.len();
        file_meta.serialize(&mut buf)?;
        let meta_len = (buf.len() - meta_start) as u32;

        buf.put_u32(meta_len);
        buf.put_u32(KTS_FILE_MAGIC);

        debug!(
            devices = self.devices.len(),
            file_size = buf.len(),
            "serialized KTS metadata file"
        );

        Ok(buf.freeze())
    }

    /// Serializes the file and writes it to `path`.
    pub fn write_to(self, path: impl AsRef<Path>) -> TsFileResult<()> {
        let bytes = self.finish()?;
        std::fs::write(path, &bytes)?;
        Ok(())
    }
}

impl Default for TsFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Groups `entries` into nodes of up to `fan_out` children. Each node's
/// end offset is the offset of the next group's first child, or
/// `region_end` for the last node, matching how the traversal resolves
/// sibling bounds.
fn build_level(
    entries: &[MetadataIndexEntry],
    region_end: u64,
    node_type: MetadataIndexNodeType,
    fan_out: usize,
) -> Vec<MetadataIndexNode> {
    let chunks: Vec<&[MetadataIndexEntry]> = entries.chunks(fan_out).collect();
    let mut nodes = Vec::with_capacity(chunks.len());

    for (i, chunk) in chunks.iter().enumerate() {
        let end_offset = match chunks.get(i + 1) {
            Some(next) => next[0].offset(),
            None => region_end,
        };
        nodes.push(MetadataIndexNode::new(node_type, chunk.to_vec(), end_offset));
    }
    nodes
}

/// Serializes the nodes contiguously, returning one routing entry per
/// node (first covered name, node offset) for the level above.
fn write_nodes(
    buf: &mut BytesMut,
    nodes: &[MetadataIndexNode],
) -> TsFileResult<Vec<MetadataIndexEntry>> {
    let mut entries = Vec::with_capacity(nodes.len());
    for node in nodes {
        let offset = buf.len() as u64;
        node.serialize(buf)?;
        let first_name = node.children().first().map(|e| e.name()).unwrap_or("");
        entries.push(MetadataIndexEntry::new(first_name, offset));
    }
    Ok(entries)
}
