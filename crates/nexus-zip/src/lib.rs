//! ZIP central directory indexer.
//!
//! Catalogue uploads ship their product images as a ZIP archive. Before the
//! upload is accepted we need to know which files the archive contains and
//! how large they are, but we never need their contents. This crate builds
//! that lookup table by reading only two byte ranges of the archive:
//!
//! - the trailing End of Central Directory window (at most 65 557 bytes)
//! - the Central Directory itself
//!
//! Local file headers and entry data are never touched, so indexing a
//! multi-gigabyte archive costs a few kilobytes of I/O.
//!
//! # Example
//!
//! ```no_run
//! use nexus_zip::{build_index, FileBlob};
//!
//! let blob = FileBlob::open("images.zip")?;
//! let index = build_index(&blob)?;
//!
//! for (path, size) in index.iter() {
//!     println!("{path}: {size} bytes");
//! }
//! # Ok::<(), nexus_zip::Error>(())
//! ```

mod blob;
mod error;
mod index;
pub mod zip;

pub use blob::{BlobSource, FileBlob};
pub use error::{Error, Result};
pub use index::{build_index, ArchiveIndex};
