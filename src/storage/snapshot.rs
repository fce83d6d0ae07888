//! Snapshot file format for the energy index
//!
//! A snapshot is a header followed by fixed-width records in chronological
//! order, read until end of file.
//!
//! Layout (all integers little-endian):
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ HEADER (16 bytes)                       │
//! │   magic: [u8; 4] = "NRGX"               │
//! │   version: u16                          │
//! │   reserved: u16                         │
//! │   record_count: u32                     │
//! │   checksum: u32                         │
//! ├─────────────────────────────────────────┤
//! │ RECORDS (68 bytes each, until EOF)      │
//! │   year: i32                             │
//! │   month, day, hour, minute, second: u32 │
//! │   autoconsumption: f64                  │
//! │   export: f64                           │
//! │   import: f64                           │
//! │   consumption: f64                      │
//! │   production: f64                       │
//! │   record_checksum: u32                  │
//! └─────────────────────────────────────────┘
//! ```

use crate::index::EnergyIndex;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{Measurement, Timestamp};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic bytes for snapshot file identification
const SNAPSHOT_MAGIC: [u8; 4] = *b"NRGX";

/// Current snapshot format version
const SNAPSHOT_VERSION: u16 = 1;

/// Header size in bytes
const HEADER_SIZE: usize = 16;

/// Record payload size in bytes (without checksum)
const RECORD_BODY_SIZE: usize = 64;

/// Record size in bytes including checksum
const RECORD_SIZE: usize = RECORD_BODY_SIZE + 4;

/// Outcome of loading a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records inserted into the index
    pub loaded: usize,
    /// Records rejected as duplicates
    pub duplicates: usize,
}

/// Snapshot file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SnapshotHeader {
    version: u16,
    record_count: u32,
}

impl SnapshotHeader {
    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..4].copy_from_slice(&SNAPSHOT_MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        // bytes 6-7 reserved
        buf[8..12].copy_from_slice(&self.record_count.to_le_bytes());

        let checksum = crc32fast::hash(&buf[0..12]);
        buf[12..16].copy_from_slice(&checksum.to_le_bytes());

        buf
    }

    fn from_bytes(buf: &[u8; HEADER_SIZE]) -> StorageResult<Self> {
        if buf[0..4] != SNAPSHOT_MAGIC {
            return Err(StorageError::InvalidSnapshot(format!(
                "Invalid magic: {:?}",
                &buf[0..4]
            )));
        }

        let stored_checksum = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);
        let computed_checksum = crc32fast::hash(&buf[0..12]);
        if stored_checksum != computed_checksum {
            return Err(StorageError::Corruption(format!(
                "Header checksum mismatch: stored={}, computed={}",
                stored_checksum, computed_checksum
            )));
        }

        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version > SNAPSHOT_VERSION {
            return Err(StorageError::InvalidSnapshot(format!(
                "Unsupported version: {}",
                version
            )));
        }

        let record_count = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);

        Ok(Self {
            version,
            record_count,
        })
    }
}

fn encode_record(m: &Measurement) -> [u8; RECORD_SIZE] {
    let mut buf = [0u8; RECORD_SIZE];
    let ts = &m.timestamp;

    buf[0..4].copy_from_slice(&ts.year.to_le_bytes());
    buf[4..8].copy_from_slice(&ts.month.to_le_bytes());
    buf[8..12].copy_from_slice(&ts.day.to_le_bytes());
    buf[12..16].copy_from_slice(&ts.hour.to_le_bytes());
    buf[16..20].copy_from_slice(&ts.minute.to_le_bytes());
    buf[20..24].copy_from_slice(&ts.second.to_le_bytes());

    let values = [
        m.autoconsumption,
        m.export,
        m.import,
        m.consumption,
        m.production,
    ];
    for (i, value) in values.iter().enumerate() {
        let offset = 24 + i * 8;
        buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    let checksum = crc32fast::hash(&buf[0..RECORD_BODY_SIZE]);
    buf[RECORD_BODY_SIZE..RECORD_SIZE].copy_from_slice(&checksum.to_le_bytes());

    buf
}

fn decode_record(buf: &[u8; RECORD_SIZE], position: usize) -> StorageResult<Measurement> {
    let stored_checksum = u32::from_le_bytes(read_array(buf, RECORD_BODY_SIZE));
    let computed_checksum = crc32fast::hash(&buf[0..RECORD_BODY_SIZE]);
    if stored_checksum != computed_checksum {
        return Err(StorageError::Corruption(format!(
            "Record {} checksum mismatch: stored={}, computed={}",
            position, stored_checksum, computed_checksum
        )));
    }

    let u32_at = |offset: usize| u32::from_le_bytes(read_array(buf, offset));
    let f64_at = |offset: usize| f64::from_le_bytes(read_array(buf, offset));

    Ok(Measurement {
        timestamp: Timestamp {
            year: i32::from_le_bytes(read_array(buf, 0)),
            month: u32_at(4),
            day: u32_at(8),
            hour: u32_at(12),
            minute: u32_at(16),
            second: u32_at(20),
        },
        autoconsumption: f64_at(24),
        export: f64_at(32),
        import: f64_at(40),
        consumption: f64_at(48),
        production: f64_at(56),
    })
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

/// Fill `buf` completely, or report `Ok(false)` on a clean EOF before the first byte
fn read_record_bytes<R: Read>(reader: &mut R, buf: &mut [u8], position: usize) -> StorageResult<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    match filled {
        0 => Ok(false),
        n if n == buf.len() => Ok(true),
        n => Err(StorageError::Corruption(format!(
            "Record {} truncated: {} of {} bytes",
            position,
            n,
            buf.len()
        ))),
    }
}

/// Write every reading of the index, oldest first
///
/// Returns the number of records written.
pub fn write_to<W: Write>(index: &EnergyIndex, writer: &mut W) -> StorageResult<usize> {
    let record_count =
        u32::try_from(index.len()).map_err(|_| StorageError::TooManyRecords(index.len()))?;

    let header = SnapshotHeader {
        version: SNAPSHOT_VERSION,
        record_count,
    };
    writer.write_all(&header.to_bytes())?;

    let mut written = 0;
    for measurement in index.iter() {
        writer.write_all(&encode_record(measurement))?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

/// Read a snapshot into the index, inserting record by record
///
/// The index is not cleared first; duplicates of existing readings are
/// counted in the summary.
pub fn read_from<R: Read>(index: &mut EnergyIndex, reader: &mut R) -> StorageResult<LoadSummary> {
    let mut header_buf = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            StorageError::InvalidSnapshot("File shorter than header".to_string())
        } else {
            StorageError::Io(e)
        }
    })?;
    let header = SnapshotHeader::from_bytes(&header_buf)?;
    tracing::debug!(
        "Snapshot version {}, {} records announced",
        header.version,
        header.record_count
    );

    let mut summary = LoadSummary::default();
    let mut record_buf = [0u8; RECORD_SIZE];
    let mut position = 0usize;

    while read_record_bytes(reader, &mut record_buf, position)? {
        let measurement = decode_record(&record_buf, position)?;
        if index.insert(measurement) {
            summary.loaded += 1;
        } else {
            tracing::debug!("Duplicate record {} at {}", position, measurement.timestamp);
            summary.duplicates += 1;
        }
        position += 1;
    }

    if position != header.record_count as usize {
        return Err(StorageError::Corruption(format!(
            "Header announces {} records, found {}",
            header.record_count, position
        )));
    }

    Ok(summary)
}

/// Save the index to a snapshot file, replacing any existing file
pub fn save(index: &EnergyIndex, path: impl AsRef<Path>) -> StorageResult<usize> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let written = write_to(index, &mut writer)?;
    writer.get_ref().sync_all()?;

    tracing::info!("Saved {} measurements to {:?}", written, path);
    Ok(written)
}

/// Replace the contents of the index with a snapshot file
///
/// The file is decoded into a fresh index first; on any error the caller's
/// index is left as it was.
pub fn load(index: &mut EnergyIndex, path: impl AsRef<Path>) -> StorageResult<LoadSummary> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);

    let mut restored = EnergyIndex::new();
    let summary = read_from(&mut restored, &mut reader)?;
    *index = restored;

    tracing::info!(
        "Loaded {} measurements from {:?} ({} duplicates)",
        summary.loaded,
        path,
        summary.duplicates
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_index() -> EnergyIndex {
        [
            Measurement::at(Timestamp::new(2021, 2, 1, 0, 0, 0))
                .autoconsumption(1.25)
                .export(2.5)
                .import(3.75)
                .consumption(5.0)
                .production(100.0),
            Measurement::at(Timestamp::new(2021, 2, 1, 0, 15, 0)).production(250.5),
            Measurement::at(Timestamp::new(2022, 12, 31, 23, 45, 30)).export(0.1),
            Measurement::default(),
        ]
        .into_iter()
        .collect()
    }

    fn encode(index: &EnergyIndex) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_to(index, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_encoded_size() {
        let index = sample_index();
        let bytes = encode(&index);
        assert_eq!(bytes.len(), HEADER_SIZE + index.len() * RECORD_SIZE);
        assert_eq!(&bytes[0..4], b"NRGX");
    }

    #[test]
    fn test_restores_same_records() {
        let original = sample_index();
        let bytes = encode(&original);

        let mut restored = EnergyIndex::new();
        let summary = read_from(&mut restored, &mut bytes.as_slice()).unwrap();

        assert_eq!(summary.loaded, original.len());
        assert_eq!(summary.duplicates, 0);

        for (a, b) in original.iter().zip(restored.iter()) {
            assert_eq!(a.timestamp, b.timestamp);
            assert_eq!(a.autoconsumption, b.autoconsumption);
            assert_eq!(a.export, b.export);
            assert_eq!(a.import, b.import);
            assert_eq!(a.consumption, b.consumption);
            assert_eq!(a.production, b.production);
        }
        assert_eq!(original.len(), restored.len());
    }

    #[test]
    fn test_duplicates_counted_on_merge() {
        let index = sample_index();
        let bytes = encode(&index);

        let mut target = sample_index();
        let summary = read_from(&mut target, &mut bytes.as_slice()).unwrap();

        assert_eq!(summary.loaded, 0);
        assert_eq!(summary.duplicates, index.len());
        assert_eq!(target.len(), index.len());
    }

    #[test]
    fn test_empty_index() {
        let bytes = encode(&EnergyIndex::new());
        assert_eq!(bytes.len(), HEADER_SIZE);

        let mut restored = EnergyIndex::new();
        let summary = read_from(&mut restored, &mut bytes.as_slice()).unwrap();
        assert_eq!(summary, LoadSummary::default());
        assert!(restored.is_empty());
    }

    #[test]
    fn test_corrupt_record_detected() {
        let mut bytes = encode(&sample_index());
        bytes[HEADER_SIZE + RECORD_SIZE + 30] ^= 0xFF;

        let mut restored = EnergyIndex::new();
        let err = read_from(&mut restored, &mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));
    }

    #[test]
    fn test_truncated_record_detected() {
        let mut bytes = encode(&sample_index());
        bytes.truncate(bytes.len() - 10);

        let mut restored = EnergyIndex::new();
        let err = read_from(&mut restored, &mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));
    }

    #[test]
    fn test_missing_records_detected() {
        let mut bytes = encode(&sample_index());
        bytes.truncate(HEADER_SIZE + RECORD_SIZE);

        let mut restored = EnergyIndex::new();
        let err = read_from(&mut restored, &mut bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("announces 4 records, found 1"));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&sample_index());
        bytes[0] = b'X';

        let mut restored = EnergyIndex::new();
        let err = read_from(&mut restored, &mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_short_file() {
        let mut restored = EnergyIndex::new();
        let err = read_from(&mut restored, &mut [0u8; 3].as_slice()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("energy.bin");

        let original = sample_index();
        assert_eq!(save(&original, &path).unwrap(), original.len());

        // Loading replaces whatever the index held before
        let mut restored = EnergyIndex::new();
        restored.insert(Measurement::at(Timestamp::date(1999, 1, 1)));
        let summary = load(&mut restored, &path).unwrap();

        assert_eq!(summary.loaded, original.len());
        assert_eq!(restored.len(), original.len());
        assert!(restored.years().get(&1999).is_none());
    }

    #[test]
    fn test_failed_load_keeps_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("energy.bin");
        save(&sample_index(), &path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[HEADER_SIZE + 2 * RECORD_SIZE + 30] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let mut index: EnergyIndex = [
            Measurement::at(Timestamp::date(1999, 1, 1)).production(1.0),
            Measurement::at(Timestamp::date(1999, 1, 2)).production(2.0),
            Measurement::at(Timestamp::date(1999, 1, 3)).production(3.0),
        ]
        .into_iter()
        .collect();

        let err = load(&mut index, &path).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));

        assert_eq!(index.len(), 3);
        let days: Vec<u32> = index.iter().map(|m| m.timestamp.day).collect();
        assert_eq!(days, vec![1, 2, 3]);
    }

    #[test]
    fn test_load_with_missing_records_keeps_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("energy.bin");
        let mut bytes = encode(&sample_index());
        bytes.truncate(HEADER_SIZE + 2 * RECORD_SIZE);
        std::fs::write(&path, &bytes).unwrap();

        let mut index: EnergyIndex = [Measurement::at(Timestamp::date(1999, 1, 1))]
            .into_iter()
            .collect();

        assert!(load(&mut index, &path).is_err());
        assert_eq!(index.len(), 1);
        assert!(index.years().contains_key(&1999));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let mut index = EnergyIndex::new();
        let err = load(&mut index, dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
