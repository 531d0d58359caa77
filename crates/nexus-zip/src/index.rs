//! Archive index construction.
//!
//! The index is built from two sequential range reads:
//!
//! 1. the trailing EOCD window, scanned backwards for the EOCD signature
//! 2. the central directory, located by the offsets stored in the EOCD
//!
//! The scan takes the signature closest to the end of the archive. A comment
//! that happens to contain the signature bytes can still mislead it; well
//! formed archives with short comments are always indexed correctly.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use nexus_common::BinaryReader;

use crate::zip::central_dir::zip64_uncompressed_size;
use crate::zip::{CentralDirectoryHeader, EocdRecord, ZIP64_SENTINEL};
use crate::{BlobSource, Error, Result};

/// Lookup table of archive entry path to uncompressed size.
///
/// Paths are stored exactly as recorded in the archive (forward-slash
/// separated). Directory entries are never present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveIndex {
    entries: FxHashMap<String, u64>,
}

impl ArchiveIndex {
    /// Number of indexed files.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the archive contained no files.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Uncompressed size of an entry.
    #[inline]
    pub fn get(&self, path: &str) -> Option<u64> {
        self.entries.get(path).copied()
    }

    /// Check if an entry exists.
    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterate over `(path, size)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(path, &size)| (path.as_str(), size))
    }

    /// Sum of all uncompressed entry sizes.
    pub fn total_uncompressed_size(&self) -> u64 {
        self.entries.values().sum()
    }

    /// Check if any indexed path starts with `prefix`.
    pub fn has_folder(&self, prefix: &str) -> bool {
        self.entries.keys().any(|path| path.starts_with(prefix))
    }

    /// Every folder prefix (ending in `/`) implied by the indexed paths.
    ///
    /// `garments/42/a.jpg` yields `garments/` and `garments/42/`.
    pub fn folder_prefixes(&self) -> FxHashSet<&str> {
        let mut prefixes = FxHashSet::default();
        for path in self.entries.keys() {
            for (pos, _) in path.match_indices('/') {
                prefixes.insert(&path[..=pos]);
            }
        }
        prefixes
    }

    fn insert(&mut self, path: String, size: u64) {
        if path.ends_with('/') {
            return;
        }
        self.entries.insert(path, size);
    }
}

impl FromIterator<(String, u64)> for ArchiveIndex {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut index = Self::default();
        for (path, size) in iter {
            index.insert(path, size);
        }
        index
    }
}

/// Build the index of a ZIP blob from its central directory.
///
/// Reads at most `min(size, 65557)` trailing bytes plus the central
/// directory range. Fails with [`Error::EocdNotFound`] when the blob is not
/// a ZIP archive.
pub fn build_index<B: BlobSource + ?Sized>(blob: &B) -> Result<ArchiveIndex> {
    let blob_size = blob.size();
    let window_len = blob_size.min(EocdRecord::MAX_SIZE as u64);
    let window_start = blob_size - window_len;
    let window = blob.read_range(window_start, blob_size)?;

    let eocd_offset = find_eocd(&window).ok_or(Error::EocdNotFound)?;
    debug!(
        offset = window_start + eocd_offset as u64,
        "found end of central directory"
    );

    let mut reader = BinaryReader::new_at(&window, eocd_offset);
    reader.expect_magic(&EocdRecord::MAGIC)?;
    let eocd: EocdRecord = reader.read_struct()?;

    if let Some((field, value)) = eocd.zip64_field() {
        return Err(Error::Zip64Unsupported { field, value });
    }

    let cd_offset = eocd.central_dir_offset as u64;
    let cd_size = eocd.central_dir_size as u64;
    if cd_offset + cd_size > blob_size {
        return Err(Error::CentralDirectoryOutOfBounds {
            offset: cd_offset,
            size: cd_size,
            blob_size,
        });
    }

    let central_dir = blob.read_range(cd_offset, cd_offset + cd_size)?;
    let index = parse_central_directory(&central_dir);

    let declared = eocd.central_dir_count_total;
    debug!(entries = index.len(), declared, "indexed central directory");

    Ok(index)
}

/// Locate the EOCD signature in the trailing window.
///
/// Candidates start at `window_len - 22` at the latest, since anything
/// later cannot hold a complete record.
fn find_eocd(window: &[u8]) -> Option<usize> {
    let last_start = window.len().checked_sub(EocdRecord::SIZE)?;
    memchr::memmem::rfind(&window[..last_start + EocdRecord::MAGIC.len()], &EocdRecord::MAGIC)
}

/// Walk central directory headers until the first signature mismatch.
fn parse_central_directory(data: &[u8]) -> ArchiveIndex {
    let mut index = ArchiveIndex::default();
    let mut reader = BinaryReader::new(data);

    while !reader.is_empty() {
        match reader.peek_u32() {
            Ok(CentralDirectoryHeader::SIGNATURE) => {}
            _ => break,
        }

        match read_entry(&mut reader) {
            Ok((name, size)) => index.insert(name, size),
            Err(e) => {
                debug!(position = reader.position(), error = %e, "truncated central directory entry");
                break;
            }
        }
    }

    index
}

fn read_entry(reader: &mut BinaryReader<'_>) -> Result<(String, u64)> {
    reader.advance(CentralDirectoryHeader::MAGIC.len());
    let header: CentralDirectoryHeader = reader.read_struct()?;

    let name_bytes = reader.read_bytes(header.file_name_length as usize)?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();
    let extra = reader.read_bytes(header.extra_field_length as usize)?;
    reader.advance(header.file_comment_length as usize);

    let mut size = header.uncompressed_size as u64;
    if header.uncompressed_size == ZIP64_SENTINEL {
        match zip64_uncompressed_size(extra) {
            Some(real) => size = real,
            None => warn!(name = %name, "entry size uses a ZIP64 sentinel without an extra field"),
        }
    }

    Ok((name, size))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;

    use super::*;

    fn stored() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
    }

    fn build_zip(files: &[(&str, usize)], dirs: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for dir in dirs {
            writer.add_directory(*dir, stored()).unwrap();
        }
        for (name, size) in files {
            writer.start_file(*name, stored()).unwrap();
            writer.write_all(&vec![0x5a; *size]).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Blob that records every range it serves.
    struct RecordingBlob {
        data: Vec<u8>,
        reads: RefCell<Vec<(u64, u64)>>,
    }

    impl BlobSource for RecordingBlob {
        fn size(&self) -> u64 {
            self.data.len() as u64
        }

        fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
            self.reads.borrow_mut().push((start, end));
            self.data.read_range(start, end)
        }
    }

    #[test]
    fn test_indexes_files_and_skips_directories() {
        let data = build_zip(
            &[
                ("garments/1/a.jpg", 12_345),
                ("garments/1/b.jpg", 0),
                ("garments/2/c.png", 70_000),
            ],
            &["garments/", "garments/1/", "garments/2/"],
        );

        let index = build_index(&data).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.get("garments/1/a.jpg"), Some(12_345));
        assert_eq!(index.get("garments/1/b.jpg"), Some(0));
        assert_eq!(index.get("garments/2/c.png"), Some(70_000));
        assert!(index.iter().all(|(path, _)| !path.ends_with('/')));
        assert_eq!(index.total_uncompressed_size(), 82_345);
    }

    #[test]
    fn test_reads_only_eocd_window_and_central_directory() {
        let data = build_zip(&[("garments/9/big.jpg", 200_000), ("garments/9/small.jpg", 10)], &[]);
        let size = data.len() as u64;
        let blob = RecordingBlob {
            data,
            reads: RefCell::new(Vec::new()),
        };

        let index = build_index(&blob).unwrap();
        assert_eq!(index.len(), 2);

        let reads = blob.reads.borrow();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0], (size - 65_557, size));

        // The central directory follows both entry bodies.
        let (cd_start, cd_end) = reads[1];
        assert!(cd_start > 200_010);
        assert!(cd_end <= size);
        let total: u64 = reads.iter().map(|(s, e)| e - s).sum();
        assert!(total < size);
    }

    #[test]
    fn test_small_archive_window_is_whole_blob() {
        let data = build_zip(&[("a.txt", 3)], &[]);
        let size = data.len() as u64;
        let blob = RecordingBlob {
            data,
            reads: RefCell::new(Vec::new()),
        };

        build_index(&blob).unwrap();
        assert_eq!(blob.reads.borrow()[0], (0, size));
    }

    #[test]
    fn test_archive_comment_is_skipped() {
        let mut data = build_zip(&[("garments/5/x.jpg", 20_000)], &[]);
        let comment = b"catalogue upload 2024";
        let len = data.len();
        data[len - 2..].copy_from_slice(&(comment.len() as u16).to_le_bytes());
        data.extend_from_slice(comment);

        let index = build_index(&data).unwrap();
        assert_eq!(index.get("garments/5/x.jpg"), Some(20_000));
    }

    #[test]
    fn test_not_a_zip() {
        let data = vec![0u8; 1024];
        assert!(matches!(build_index(&data), Err(Error::EocdNotFound)));

        let tiny: &[u8] = b"PK";
        assert!(matches!(build_index(tiny), Err(Error::EocdNotFound)));
    }

    #[test]
    fn test_zip64_sentinel_is_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&EocdRecord::MAGIC);
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&ZIP64_SENTINEL.to_le_bytes());
        data.extend_from_slice(&ZIP64_SENTINEL.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());

        assert!(matches!(
            build_index(&data),
            Err(Error::Zip64Unsupported { field: "offset", .. })
        ));
    }

    #[test]
    fn test_central_directory_out_of_bounds() {
        let mut data = Vec::new();
        data.extend_from_slice(&EocdRecord::MAGIC);
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&50u32.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());

        assert!(matches!(
            build_index(&data),
            Err(Error::CentralDirectoryOutOfBounds { offset: 50, size: 100, .. })
        ));
    }

    #[test]
    fn test_walk_stops_at_bad_signature() {
        let data = build_zip(&[("one.jpg", 5), ("two.jpg", 6)], &[]);
        let eocd = find_eocd(&data).unwrap();
        let mut reader = BinaryReader::new_at(&data, eocd + 4);
        let record: EocdRecord = reader.read_struct().unwrap();
        let start = record.central_dir_offset as usize;
        let end = start + record.central_dir_size as usize;

        let mut central_dir = data[start..end].to_vec();
        central_dir.extend_from_slice(b"garbage trailing bytes");
        assert_eq!(parse_central_directory(&central_dir).len(), 2);

        // Truncating the second header keeps the first entry only.
        let mut reader = BinaryReader::new_at(&data, start + 4);
        let first: CentralDirectoryHeader = reader.read_struct().unwrap();
        let first_len = CentralDirectoryHeader::SIZE + first.variable_data_size();
        let truncated = &data[start..start + first_len + 10];
        let index = parse_central_directory(truncated);
        assert_eq!(index.len(), 1);
        assert!(index.contains("one.jpg"));
    }

    #[test]
    fn test_folder_prefixes() {
        let index: ArchiveIndex = [
            ("garments/42/a.jpg".to_string(), 1),
            ("garments/42/sub/b.jpg".to_string(), 2),
            ("readme.txt".to_string(), 3),
            ("garments/7/".to_string(), 0),
        ]
        .into_iter()
        .collect();

        let prefixes = index.folder_prefixes();
        assert!(prefixes.contains("garments/"));
        assert!(prefixes.contains("garments/42/"));
        assert!(prefixes.contains("garments/42/sub/"));
        assert!(!prefixes.contains("garments/7/"));
        assert!(index.has_folder("garments/42/"));
        assert_eq!(index.len(), 3);
    }
}
