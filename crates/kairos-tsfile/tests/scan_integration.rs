//! End-to-end tests for the metadata-index scan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::{BufMut, Bytes, BytesMut};

use kairos_common::types::{DeviceId, MeasurementId, Timestamp};
use kairos_common::{KTS_FILE_MAGIC, KTS_FORMAT_VERSION, KTS_HEADER_SIZE};
use kairos_tsfile::file::{FileSource, MemorySource};
use kairos_tsfile::metadata::{
    MetadataIndexEntry, MetadataIndexNode, MetadataIndexNodeType, Statistics, TimeseriesMetadata,
    TsDataType, TsFileMetadata,
};
use kairos_tsfile::{ScanConfig, TsFileError, TsFileReader, TsFileResult, TsFileWriter, WriterConfig};

fn record(name: &str) -> TimeseriesMetadata {
    TimeseriesMetadata::new(
        MeasurementId::new(name),
        TsDataType::Double,
        Statistics::new(
            100,
            Timestamp::new(1_000),
            Timestamp::new(2_000),
            -1.5,
            99.5,
            4_900.0,
        ),
        vec![],
    )
}

fn records(prefix: &str, count: usize) -> Vec<TimeseriesMetadata> {
    (0..count)
        .map(|i| record(&format!("{prefix}{i:05}")))
        .collect()
}

/// Starts a file buffer with the KTS header.
fn file_header() -> BytesMut {
    let mut buf = BytesMut::new();
    buf.put_u32(KTS_FILE_MAGIC);
    buf.put_u8(KTS_FORMAT_VERSION);
    buf
}

/// Appends the file metadata and footer for the given root node.
fn file_footer(mut buf: BytesMut, root: MetadataIndexNode) -> Bytes {
    let meta = TsFileMetadata::new(root, KTS_HEADER_SIZE as u64);
    let meta_start = buf.len();
    meta.serialize(&mut buf).unwrap();
    let meta_len = (buf.len() - meta_start) as u32;
    buf.put_u32(meta_len);
    buf.put_u32(KTS_FILE_MAGIC);
    buf.freeze()
}

/// A file source that records every fetched byte range.
struct TracingSource {
    inner: MemorySource,
    fetches: Arc<Mutex<Vec<(u64, u64)>>>,
}

impl TracingSource {
    fn new(bytes: Bytes) -> (Self, Arc<Mutex<Vec<(u64, u64)>>>) {
        let fetches = Arc::new(Mutex::new(Vec::new()));
        let source = Self {
            inner: MemorySource::new(bytes),
            fetches: Arc::clone(&fetches),
        };
        (source, fetches)
    }
}

impl FileSource for TracingSource {
    fn size(&self) -> TsFileResult<u64> {
        self.inner.size()
    }

    fn read_range(&self, start: u64, end: u64) -> TsFileResult<Bytes> {
        self.fetches.lock().unwrap().push((start, end));
        self.inner.read_range(start, end)
    }
}

/// Builds a file with one device whose measurement index is a single
/// leaf node over runs of the given record counts.
fn file_with_leaf_runs(device: &str, run_sizes: &[usize]) -> Bytes {
    let mut buf = file_header();

    let mut run_entries = Vec::new();
    for (i, count) in run_sizes.iter().enumerate() {
        let offset = buf.len() as u64;
        for j in 0..*count {
            record(&format!("m{i}_{j:05}")).serialize(&mut buf).unwrap();
        }
        run_entries.push(MetadataIndexEntry::new(format!("m{i}_00000"), offset));
    }

    let leaf_offset = buf.len() as u64;
    let leaf = MetadataIndexNode::new(
        MetadataIndexNodeType::LeafMeasurement,
        run_entries,
        leaf_offset,
    );
    leaf.serialize(&mut buf).unwrap();

    let root = MetadataIndexNode::new(
        MetadataIndexNodeType::LeafDevice,
        vec![MetadataIndexEntry::new(device, leaf_offset)],
        buf.len() as u64,
    );
    file_footer(buf, root)
}

fn batch_total(batch: &HashMap<DeviceId, Vec<TimeseriesMetadata>>) -> usize {
    batch.values().map(Vec::len).sum()
}

#[test]
fn cap_driven_resumption_mid_leaf() {
    // One device with three measurement leaves of 1, 2500, and 1 records;
    // with a cap of 2000 the scan must yield batches of 1, 2000, and 501.
    let bytes = file_with_leaf_runs("root.d1", &[1, 2500, 1]);
    let reader = TsFileReader::new(Box::new(MemorySource::new(bytes)));

    let mut scan = reader
        .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(2000))
        .unwrap();

    let device = DeviceId::new("root.d1");
    let mut sizes = Vec::new();
    while let Some(batch) = scan.next_batch().unwrap() {
        assert!(batch.keys().all(|d| *d == device));
        sizes.push(batch_total(&batch));
    }

    assert_eq!(sizes, vec![1, 2000, 501]);
    assert!(!scan.has_next());
    assert!(scan.next_batch().unwrap().is_none());
}

#[test]
fn resumption_concatenation_matches_unbounded_scan() {
    let collect = |cap: usize| -> Vec<String> {
        let reader = TsFileReader::new(Box::new(MemorySource::new(
            file_with_leaf_runs("root.d1", &[10, 700, 3]),
        )));
        let mut scan = reader
            .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(cap))
            .unwrap();
        let mut names = Vec::new();
        while let Some(batch) = scan.next_batch().unwrap() {
            for list in batch.into_values() {
                names.extend(list.into_iter().map(|r| r.measurement.into_string()));
            }
        }
        names
    };

    assert_eq!(collect(64), collect(usize::MAX));
}

#[test]
fn single_leaf_root_tree_groups_under_anonymous_device() {
    // The smallest well-formed tree: the root node is itself a
    // leaf-measurement node, so no device boundary is ever crossed.
    let mut buf = file_header();

    let run_offset = buf.len() as u64;
    for r in records("m", 3) {
        r.serialize(&mut buf).unwrap();
    }
    let root = MetadataIndexNode::new(
        MetadataIndexNodeType::LeafMeasurement,
        vec![MetadataIndexEntry::new("m00000", run_offset)],
        buf.len() as u64,
    );
    let bytes = file_footer(buf, root);

    let reader = TsFileReader::new(Box::new(MemorySource::new(bytes)));
    let mut scan = reader
        .scan_timeseries_metadata(ScanConfig::default())
        .unwrap();

    let batch = scan.next_batch().unwrap().unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[&DeviceId::anonymous()].len(), 3);

    assert!(!scan.has_next());
    assert!(scan.next_batch().unwrap().is_none());
}

#[test]
fn maximally_unbalanced_tree_terminates() {
    // A chain of single-child internal nodes: depth equals entry count.
    const DEPTH: usize = 64;

    let mut buf = file_header();

    let run_offset = buf.len() as u64;
    record("m0").serialize(&mut buf).unwrap();

    // Bottom leaf node over the single run.
    let mut child_offset = buf.len() as u64;
    let leaf = MetadataIndexNode::new(
        MetadataIndexNodeType::LeafMeasurement,
        vec![MetadataIndexEntry::new("m0", run_offset)],
        child_offset,
    );
    leaf.serialize(&mut buf).unwrap();

    // Chain of single-child internal measurement nodes above it.
    for _ in 0..DEPTH {
        let node_offset = buf.len() as u64;
        let node = MetadataIndexNode::new(
            MetadataIndexNodeType::InternalMeasurement,
            vec![MetadataIndexEntry::new("m0", child_offset)],
            node_offset,
        );
        node.serialize(&mut buf).unwrap();
        child_offset = node_offset;
    }

    let root = MetadataIndexNode::new(
        MetadataIndexNodeType::LeafDevice,
        vec![MetadataIndexEntry::new("root.deep", child_offset)],
        buf.len() as u64,
    );
    let bytes = file_footer(buf, root);

    let reader = TsFileReader::new(Box::new(MemorySource::new(bytes)));
    let mut scan = reader
        .scan_timeseries_metadata(ScanConfig::default())
        .unwrap();

    let batch = scan.next_batch().unwrap().unwrap();
    assert_eq!(batch[&DeviceId::new("root.deep")].len(), 1);
    assert!(scan.next_batch().unwrap().is_none());
}

#[test]
fn leaf_ranges_fetched_exactly_once() {
    let bytes = file_with_leaf_runs("root.d1", &[5, 40, 5]);
    let (source, fetches) = TracingSource::new(bytes);
    let reader = TsFileReader::new(Box::new(source));

    // A cap of 8 forces the 40-record leaf to span many calls.
    let mut scan = reader
        .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(8))
        .unwrap();
    while scan.next_batch().unwrap().is_some() {}

    // Every fetched range, leaves included, must appear exactly once.
    let fetches = fetches.lock().unwrap();
    let mut seen = std::collections::HashSet::new();
    for range in fetches.iter() {
        assert!(seen.insert(*range), "range {:?} fetched twice", range);
    }
}

#[test]
fn device_grouping_follows_traversal_order() {
    let mut writer = TsFileWriter::with_config(WriterConfig::new().with_index_fan_out(2));
    writer.add_device(DeviceId::new("root.a"), records("a", 7));
    writer.add_device(DeviceId::new("root.b"), records("b", 11));
    writer.add_device(DeviceId::new("root.c"), records("c", 2));
    let bytes = writer.finish().unwrap();

    let reader = TsFileReader::new(Box::new(MemorySource::new(bytes)));
    let mut scan = reader
        .scan_timeseries_metadata(ScanConfig::new().with_batch_cap(3))
        .unwrap();

    let mut merged: HashMap<DeviceId, Vec<String>> = HashMap::new();
    while let Some(batch) = scan.next_batch().unwrap() {
        for (device, list) in batch {
            merged
                .entry(device)
                .or_default()
                .extend(list.into_iter().map(|r| r.measurement.into_string()));
        }
    }

    // Every record lands under its own device, in file order.
    assert_eq!(
        merged[&DeviceId::new("root.a")],
        (0..7).map(|i| format!("a{i:05}")).collect::<Vec<_>>()
    );
    assert_eq!(
        merged[&DeviceId::new("root.b")],
        (0..11).map(|i| format!("b{i:05}")).collect::<Vec<_>>()
    );
    assert_eq!(
        merged[&DeviceId::new("root.c")],
        (0..2).map(|i| format!("c{i:05}")).collect::<Vec<_>>()
    );
}

#[test]
fn on_disk_end_to_end_with_chunk_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metadata.kts");

    let chunk_stats = Statistics::new(
        50,
        Timestamp::new(0),
        Timestamp::new(49),
        0.0,
        49.0,
        1_225.0,
    );
    let series: Vec<TimeseriesMetadata> = (0..10)
        .map(|i| {
            TimeseriesMetadata::new(
                MeasurementId::new(format!("m{i:02}")),
                TsDataType::Int64,
                chunk_stats,
                vec![
                    kairos_tsfile::metadata::ChunkMetadata::new(1_000 + i as u64, chunk_stats),
                    kairos_tsfile::metadata::ChunkMetadata::new(9_000 + i as u64, chunk_stats),
                ],
            )
        })
        .collect();

    let mut writer = TsFileWriter::with_config(WriterConfig::new().with_index_fan_out(4));
    writer.add_device(DeviceId::new("root.plant"), series.clone());
    writer.write_to(&path).unwrap();

    let reader = TsFileReader::open(&path).unwrap();
    let mut scan = reader
        .scan_timeseries_metadata(ScanConfig::new().with_chunk_metadata(true))
        .unwrap();

    let mut decoded = Vec::new();
    while let Some(batch) = scan.next_batch().unwrap() {
        for (device, list) in batch {
            assert_eq!(device, DeviceId::new("root.plant"));
            decoded.extend(list);
        }
    }
    assert_eq!(decoded, series);
}

#[test]
fn expansion_failure_names_the_entry() {
    // A device entry pointing into record bytes: expanding it decodes
    // garbage and must surface a corruption error carrying the entry.
    let mut buf = file_header();

    let run_offset = buf.len() as u64;
    record("m0").serialize(&mut buf).unwrap();
    let run_end = buf.len() as u64;

    let root = MetadataIndexNode::new(
        MetadataIndexNodeType::LeafDevice,
        vec![MetadataIndexEntry::new("root.broken", run_offset)],
        run_end,
    );
    let bytes = file_footer(buf, root);

    let reader = TsFileReader::new(Box::new(MemorySource::new(bytes)));
    let mut scan = reader
        .scan_timeseries_metadata(ScanConfig::default())
        .unwrap();

    let err = scan.next_batch().unwrap_err();
    match err {
        TsFileError::Entry {
            name, node_type, ..
        } => {
            assert_eq!(name, "root.broken");
            assert_eq!(node_type, MetadataIndexNodeType::LeafDevice);
        }
        other => panic!("expected entry-wrapped error, got {other}"),
    }
}
