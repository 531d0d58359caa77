//! ZIP format structures.
//!
//! Only the records needed to locate and walk the central directory are
//! modelled here. Local file headers are never read.

pub mod central_dir;
mod eocd;

pub use central_dir::CentralDirectoryHeader;
pub use eocd::EocdRecord;

/// Sentinel stored in 32-bit fields whose real value lives in a ZIP64 record.
pub const ZIP64_SENTINEL: u32 = 0xFFFF_FFFF;
