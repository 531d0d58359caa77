//! Error types for the ZIP indexer.

use thiserror::Error;

/// Errors that can occur while indexing a ZIP archive.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading a byte range.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] nexus_common::Error),

    /// Could not find the end of central directory record.
    #[error("End of Central Directory record not found")]
    EocdNotFound,

    /// The archive stores its central directory location in ZIP64 records.
    #[error("ZIP64 archives are not supported (central directory {field} is {value:#010x})")]
    Zip64Unsupported { field: &'static str, value: u32 },

    /// The central directory range lies outside the blob.
    #[error("central directory at offset {offset} with size {size} exceeds archive size {blob_size}")]
    CentralDirectoryOutOfBounds {
        offset: u64,
        size: u64,
        blob_size: u64,
    },

    /// A byte range was requested past the end of the blob.
    #[error("read of range {start}..{end} exceeds blob size {size}")]
    RangeOutOfBounds { start: u64, end: u64, size: u64 },
}

/// Result type for ZIP indexing operations.
pub type Result<T> = std::result::Result<T, Error>;
