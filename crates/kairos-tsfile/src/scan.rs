//! Incremental traversal of the metadata index.
//!
//! The scan performs a pre-order, depth-first walk of the on-disk index
//! tree using an explicit stack of pending entries instead of recursion,
//! so arbitrarily deep or wide trees never exhaust the call stack. Leaf
//! byte ranges are fetched exactly once and drained in bounded increments
//! across calls, which keeps the number of records materialized per call
//! under the configured cap while preserving global traversal order.
//!
//! A scan owns its cursor exclusively: the pending-entry stack, the
//! partially drained leaf buffer, and the device currently in scope. It
//! must not be advanced from more than one logical thread of control;
//! independent scans over the same file each re-read the root index and
//! share nothing mutable.

use std::collections::HashMap;

use bytes::{Buf, Bytes};
use kairos_common::types::DeviceId;
use tracing::trace;

use crate::config::ScanConfig;
use crate::error::{TsFileError, TsFileResult};
use crate::metadata::{
    MetadataIndexEntry, MetadataIndexNode, MetadataIndexNodeType, TimeseriesMetadata,
};
use crate::reader::TsFileReader;

/// The records produced by one batch-advance call, grouped by device.
///
/// Records for the same device spanning multiple calls appear in separate
/// maps; callers needing a full per-device list must merge them.
pub type DeviceBatch = HashMap<DeviceId, Vec<TimeseriesMetadata>>;

/// A pending entry on the traversal stack: an index entry, the type of
/// the node it was read from, and the exclusive end offset of its byte
/// range (the start offset of its next sibling, or the parent's own end
/// offset for the last child). Consumed exactly once when popped.
#[derive(Debug, Clone)]
struct PendingEntry {
    entry: MetadataIndexEntry,
    node_type: MetadataIndexNodeType,
    end_offset: u64,
}

impl PendingEntry {
    fn wrap(&self, source: TsFileError) -> TsFileError {
        TsFileError::for_entry(
            self.entry.name(),
            self.entry.offset(),
            self.node_type,
            source,
        )
    }
}

/// Restartable batch iterator over all timeseries metadata in a KTS file.
///
/// Each [`next_batch`](Self::next_batch) call yields at most
/// [`ScanConfig::batch_cap`] records: it first drains any remainder of
/// the previously fetched leaf, then walks the index until one new leaf
/// has been materialized (expanding internal nodes along the way), and
/// returns. Successive calls observe records in the file's global
/// pre-order device/measurement order.
pub struct TimeseriesMetadataScan<'r> {
    reader: &'r TsFileReader,
    batch_cap: usize,
    include_chunk_metadata: bool,
    stack: Vec<PendingEntry>,
    leaf_buffer: Option<Bytes>,
    current_device: Option<DeviceId>,
    batch_count: usize,
}

impl std::fmt::Debug for TimeseriesMetadataScan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeseriesMetadataScan")
            .field("batch_cap", &self.batch_cap)
            .field("include_chunk_metadata", &self.include_chunk_metadata)
            .field("stack", &self.stack)
            .field("leaf_buffer", &self.leaf_buffer)
            .field("current_device", &self.current_device)
            .field("batch_count", &self.batch_count)
            .finish()
    }
}

impl<'r> TimeseriesMetadataScan<'r> {
    /// Creates a scan positioned at the file's root index node.
    ///
    /// Triggers lazy file-metadata initialization on the reader if it has
    /// not happened yet.
    pub fn new(reader: &'r TsFileReader, config: ScanConfig) -> TsFileResult<Self> {
        config.validate()?;
        let root = reader.root_index_node()?;

        let mut stack = Vec::new();
        push_children(&mut stack, &root)?;

        Ok(Self {
            reader,
            batch_cap: config.batch_cap,
            include_chunk_metadata: config.include_chunk_metadata,
            stack,
            leaf_buffer: None,
            current_device: None,
            batch_count: 0,
        })
    }

    /// Returns true if another batch-advance call will produce work.
    pub fn has_next(&self) -> bool {
        !self.stack.is_empty()
            || self
                .leaf_buffer
                .as_ref()
                .map_or(false, |buffer| buffer.has_remaining())
    }

    /// Advances the scan and returns the next batch of records grouped by
    /// device, or `Ok(None)` once the index is exhausted.
    ///
    /// Any error terminates the iteration: state mutated before the
    /// failing step is not rolled back, so the scan must be dropped
    /// rather than retried.
    pub fn next_batch(&mut self) -> TsFileResult<Option<DeviceBatch>> {
        if !self.has_next() {
            return Ok(None);
        }

        let mut batch = DeviceBatch::new();

        loop {
            // Drain whatever remains of the previously fetched leaf.
            self.drain_leaf(&mut batch)?;

            if self.batch_count >= self.batch_cap || self.stack.is_empty() {
                break;
            }

            let pending = match self.stack.pop() {
                Some(pending) => pending,
                None => break,
            };

            if pending.node_type.is_leaf_measurement() {
                // Materialize one new leaf, then yield the batch.
                self.read_leaf(pending, &mut batch)?;
                break;
            }

            self.expand(pending)?;
        }

        // The cap is a per-call yield ceiling, not a global limit.
        if self.batch_count >= self.batch_cap {
            self.batch_count = 0;
        }

        Ok(Some(batch))
    }

    /// Decodes records out of the current leaf buffer until it is empty
    /// or the cap is reached, appending them under the active device.
    fn drain_leaf(&mut self, batch: &mut DeviceBatch) -> TsFileResult<()> {
        let mut records = Vec::new();

        let fully_drained = match self.leaf_buffer.as_mut() {
            Some(buffer) => {
                while buffer.has_remaining() && self.batch_count < self.batch_cap {
                    records.push(TimeseriesMetadata::deserialize(
                        buffer,
                        self.include_chunk_metadata,
                    )?);
                    self.batch_count += 1;
                }
                !buffer.has_remaining()
            }
            None => false,
        };

        if fully_drained {
            self.leaf_buffer = None;
        }
        if !records.is_empty() {
            batch
                .entry(self.active_device())
                .or_default()
                .append(&mut records);
        }
        Ok(())
    }

    /// Fetches a leaf entry's byte range into a fresh buffer and drains
    /// it. The previous buffer must be fully consumed first; anything
    /// else is a driver defect and fails fatally rather than silently
    /// discarding records.
    fn read_leaf(&mut self, pending: PendingEntry, batch: &mut DeviceBatch) -> TsFileResult<()> {
        if let Some(buffer) = self.leaf_buffer.as_ref() {
            if buffer.has_remaining() {
                return Err(TsFileError::LeafBufferNotDrained {
                    name: pending.entry.name().to_string(),
                    offset: pending.entry.offset(),
                });
            }
        }

        let bytes = self
            .reader
            .read_range(pending.entry.offset(), pending.end_offset)
            .map_err(|e| pending.wrap(e))?;

        trace!(
            offset = pending.entry.offset(),
            end = pending.end_offset,
            len = bytes.len(),
            "fetched leaf byte range"
        );

        self.leaf_buffer = Some(bytes);
        self.drain_leaf(batch).map_err(|e| pending.wrap(e))
    }

    /// Fetches and decodes an internal node, then pushes its children so
    /// that popping yields them in left-to-right order. Expansion is
    /// all-or-nothing: a fetch or decode failure pushes nothing.
    fn expand(&mut self, pending: PendingEntry) -> TsFileResult<()> {
        if pending.node_type.is_leaf_device() {
            // The entry crosses a device boundary; every descendant leaf
            // record belongs to this device until the next boundary.
            self.current_device = Some(DeviceId::new(pending.entry.name()));
        }

        let mut bytes = self
            .reader
            .read_range(pending.entry.offset(), pending.end_offset)
            .map_err(|e| pending.wrap(e))?;

        let node = MetadataIndexNode::deserialize(&mut bytes).map_err(|e| pending.wrap(e))?;

        trace!(
            offset = pending.entry.offset(),
            node_type = ?node.node_type(),
            children = node.children().len(),
            "expanded index node"
        );

        push_children(&mut self.stack, &node).map_err(|e| pending.wrap(e))
    }

    fn active_device(&self) -> DeviceId {
        self.current_device
            .clone()
            .unwrap_or_else(DeviceId::anonymous)
    }
}

impl Iterator for TimeseriesMetadataScan<'_> {
    type Item = TsFileResult<DeviceBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}

/// Pushes a node's children in reverse index order, pairing each with
/// the end offset obtained by walking left-to-right and using each
/// child's own offset as its predecessor's bound; the last child
/// inherits the node's end offset.
///
/// Child offsets must be strictly increasing and stay below the node's
/// end offset; the format stores children contiguously in offset order,
/// and a violation would silently mis-group bytes downstream, so it is
/// rejected here as corruption.
fn push_children(stack: &mut Vec<PendingEntry>, node: &MetadataIndexNode) -> TsFileResult<()> {
    let children = node.children();
    let mut pending = Vec::with_capacity(children.len());

    for (i, child) in children.iter().enumerate() {
        let end_offset = match children.get(i + 1) {
            Some(next) => next.offset(),
            None => node.end_offset(),
        };
        if child.offset() >= end_offset {
            return Err(TsFileError::corrupted(format!(
                "child entry `{}` at offset {} is not below its sibling bound {}",
                child.name(),
                child.offset(),
                end_offset
            )));
        }
        pending.push(PendingEntry {
            entry: child.clone(),
            node_type: node.node_type(),
            end_offset,
        });
    }

    stack.extend(pending.into_iter().rev());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriterConfig;
    use crate::file::MemorySource;
    use crate::metadata::{Statistics, TsDataType};
    use crate::write::TsFileWriter;
    use kairos_common::types::{MeasurementId, Timestamp};

    fn record(name: &str) -> TimeseriesMetadata {
        TimeseriesMetadata::new(
            MeasurementId::new(name),
            TsDataType::Int64,
            Statistics::new(5, Timestamp::new(0), Timestamp::new(4), 1.0, 5.0, 15.0),
            vec![],
        )
    }

    fn records(prefix: &str, count: usize) -> Vec<TimeseriesMetadata> {
        (0..count).map(|i| record(&format!("{prefix}{i:04}"))).collect()
    }

    fn build_reader(devices: &[(&str, usize)], fan_out: usize) -> TsFileReader {
        let mut writer = TsFileWriter::with_config(WriterConfig::new().with_index_fan_out(fan_out));
        for (device, count) in devices {
            writer.add_device(DeviceId::new(*device), records("m", *count));
        }
        let bytes = writer.finish().unwrap();
        TsFileReader::new(Box::new(MemorySource::new(bytes)))
    }

    fn collect_all(
        scan: &mut TimeseriesMetadataScan<'_>,
    ) -> (Vec<usize>, HashMap<DeviceId, Vec<String>>) {
        let mut batch_sizes = Vec::new();
        let mut merged: HashMap<DeviceId, Vec<String>> = HashMap::new();
        while let Some(batch) = scan.next_batch().unwrap() {
            batch_sizes.push(batch.values().map(Vec::len).sum());
            for (device, list) in batch {
                merged
                    .entry(device)
                    .or_default()
                    .extend(list.iter().map(|r| r.measurement.as_str().to_string()));
            }
        }
        (batch_sizes, merged)
    }

    #[test]
    fn test_single_device_order_preserved() {
        let reader = build_reader(&[("root.d1", 10)], 4);
        let mut scan = reader
            .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(100))
            .unwrap();

        let (_, merged) = collect_all(&mut scan);
        let names = &merged[&DeviceId::new("root.d1")];
        let expected: Vec<String> = (0..10).map(|i| format!("m{i:04}")).collect();
        assert_eq!(names, &expected);
        assert!(!scan.has_next());
    }

    #[test]
    fn test_multiple_devices_grouped() {
        let reader = build_reader(&[("root.a", 3), ("root.b", 4), ("root.c", 2)], 8);
        let mut scan = reader
            .scan_timeseries_metadata(ScanConfig::default())
            .unwrap();

        let (_, merged) = collect_all(&mut scan);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[&DeviceId::new("root.a")].len(), 3);
        assert_eq!(merged[&DeviceId::new("root.b")].len(), 4);
        assert_eq!(merged[&DeviceId::new("root.c")].len(), 2);
    }

    #[test]
    fn test_cap_respected() {
        let reader = build_reader(&[("root.d1", 50)], 64);
        let mut scan = reader
            .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(7))
            .unwrap();

        while let Some(batch) = scan.next_batch().unwrap() {
            let total: usize = batch.values().map(Vec::len).sum();
            assert!(total <= 7, "batch of {} exceeds cap", total);
        }
    }

    #[test]
    fn test_resumption_matches_unbounded_scan() {
        let reader = build_reader(&[("root.d1", 23), ("root.d2", 17)], 8);

        let mut capped = reader
            .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(5))
            .unwrap();
        let (_, merged_capped) = collect_all(&mut capped);

        let mut unbounded = reader
            .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(usize::MAX))
            .unwrap();
        let (_, merged_unbounded) = collect_all(&mut unbounded);

        assert_eq!(merged_capped, merged_unbounded);
    }

    #[test]
    fn test_batch_spanning_two_devices() {
        // Device a's leaf (4 records) is drained across two calls with
        // cap 3; the second call finishes the remainder and starts
        // device b's leaf in the same batch.
        let reader = build_reader(&[("root.a", 4), ("root.b", 4)], 8);
        let mut scan = reader
            .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(3))
            .unwrap();

        let first = scan.next_batch().unwrap().unwrap();
        assert_eq!(first[&DeviceId::new("root.a")].len(), 3);

        let second = scan.next_batch().unwrap().unwrap();
        assert_eq!(second[&DeviceId::new("root.a")].len(), 1);
        assert_eq!(second[&DeviceId::new("root.b")].len(), 2);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let reader = build_reader(&[("root.d1", 2)], 8);
        let mut scan = reader
            .scan_timeseries_metadata(ScanConfig::default())
            .unwrap();

        while scan.next_batch().unwrap().is_some() {}
        assert!(!scan.has_next());
        assert!(scan.next_batch().unwrap().is_none());
        assert!(scan.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_iterator_adapter() {
        let reader = build_reader(&[("root.d1", 6)], 8);
        let scan = reader
            .scan_timeseries_metadata(ScanConfig::default())
            .unwrap();

        let total: usize = scan
            .map(|batch| batch.unwrap().values().map(Vec::len).sum::<usize>())
            .sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_independent_scans_share_nothing() {
        let reader = build_reader(&[("root.d1", 9)], 4);
        let mut first = reader
            .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(2))
            .unwrap();
        let mut second = reader
            .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(4))
            .unwrap();

        let (_, merged_first) = collect_all(&mut first);
        let (_, merged_second) = collect_all(&mut second);
        assert_eq!(merged_first, merged_second);
    }

    #[test]
    fn test_undrained_buffer_is_fatal() {
        let reader = build_reader(&[("root.d1", 2)], 8);
        let mut scan = reader
            .scan_timeseries_metadata(ScanConfig::default())
            .unwrap();

        // Simulate a driver defect: a stale, non-empty leaf buffer when a
        // new leaf fetch is requested.
        scan.leaf_buffer = Some(Bytes::from_static(b"unconsumed"));
        let pending = PendingEntry {
            entry: MetadataIndexEntry::new("m0000", 5),
            node_type: MetadataIndexNodeType::LeafMeasurement,
            end_offset: 100,
        };

        let mut batch = DeviceBatch::new();
        let err = scan.read_leaf(pending, &mut batch).unwrap_err();
        assert!(matches!(err, TsFileError::LeafBufferNotDrained { .. }));
    }

    #[test]
    fn test_non_monotonic_offsets_rejected() {
        let node = MetadataIndexNode::new(
            MetadataIndexNodeType::LeafMeasurement,
            vec![
                MetadataIndexEntry::new("a", 100),
                MetadataIndexEntry::new("b", 80),
            ],
            200,
        );
        let mut stack = Vec::new();
        let err = push_children(&mut stack, &node).unwrap_err();
        assert!(err.is_corruption());
        assert!(stack.is_empty(), "expansion must be all-or-nothing");
    }

    #[test]
    fn test_zero_cap_rejected() {
        let reader = build_reader(&[("root.d1", 1)], 8);
        let err = reader
            .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(0))
            .unwrap_err();
        assert!(matches!(err, TsFileError::Config { .. }));
    }

    #[test]
    fn test_chunk_metadata_toggle() {
        let reader = build_reader(&[("root.d1", 3)], 8);

        let mut without = reader
            .scan_timeseries_metadata(ScanConfig::default())
            .unwrap();
        let batch = without.next_batch().unwrap().unwrap();
        for record in &batch[&DeviceId::new("root.d1")] {
            assert!(record.chunk_metadata.is_none());
        }

        let mut with = reader
            .scan_timeseries_metadata(ScanConfig::new().with_chunk_metadata(true))
            .unwrap();
        let batch = with.next_batch().unwrap().unwrap();
        for record in &batch[&DeviceId::new("root.d1")] {
            assert!(record.chunk_metadata.is_some());
        }
    }
}
