//! Random-access byte sources.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use crate::{Error, Result};

/// A binary object that supports reading arbitrary byte ranges.
///
/// The indexer only ever asks for a handful of small ranges, so
/// implementations are free to fetch each range on demand instead of
/// holding the whole object in memory.
pub trait BlobSource {
    /// Total size of the blob in bytes.
    fn size(&self) -> u64;

    /// Read the bytes in `start..end`.
    ///
    /// Implementations must fail with [`Error::RangeOutOfBounds`] when the
    /// range extends past [`size`](Self::size).
    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>>;
}

fn check_range(start: u64, end: u64, size: u64) -> Result<()> {
    if start > end || end > size {
        return Err(Error::RangeOutOfBounds { start, end, size });
    }
    Ok(())
}

impl BlobSource for [u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        check_range(start, end, self.size())?;
        Ok(self[start as usize..end as usize].to_vec())
    }
}

impl BlobSource for Vec<u8> {
    fn size(&self) -> u64 {
        self.as_slice().size()
    }

    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        self.as_slice().read_range(start, end)
    }
}

impl<T: BlobSource + ?Sized> BlobSource for &T {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        (**self).read_range(start, end)
    }
}

impl<T: BlobSource + ?Sized> BlobSource for Arc<T> {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        (**self).read_range(start, end)
    }
}

/// A file on disk read with positioned range reads.
///
/// The file is never loaded as a whole; each [`read_range`](BlobSource::read_range)
/// seeks to the start of the range and reads exactly the requested bytes.
#[derive(Debug)]
pub struct FileBlob {
    file: File,
    size: u64,
    name: String,
}

impl FileBlob {
    /// Open a file for range reads.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self { file, size, name })
    }

    /// Get the file name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl BlobSource for FileBlob {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        check_range(start, end, self.size)?;

        // `Read` and `Seek` are implemented for `&File`, so ranges can be
        // read through a shared reference.
        let mut file = &self.file;
        file.seek(SeekFrom::Start(start))?;

        let mut buffer = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}
