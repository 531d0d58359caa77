//! End of Central Directory (EOCD) structures.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::ZIP64_SENTINEL;

/// End of Central Directory Record (without signature).
///
/// This is the standard ZIP EOCD record found at the end of the archive.
/// The 4-byte signature (0x06054b50) is read separately before this struct.
/// ZIP64 archives store 0xFFFFFFFF in the size and offset fields.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct EocdRecord {
    /// Number of this disk
    pub disk_number: u16,
    /// Disk where central directory starts
    pub central_dir_disk: u16,
    /// Number of central directory records on this disk
    pub central_dir_count_disk: u16,
    /// Total number of central directory records
    pub central_dir_count_total: u16,
    /// Size of central directory (bytes)
    pub central_dir_size: u32,
    /// Offset of start of central directory
    pub central_dir_offset: u32,
    /// Comment length
    pub comment_length: u16,
}

impl EocdRecord {
    /// EOCD signature bytes.
    pub const MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

    /// EOCD signature as u32.
    pub const SIGNATURE: u32 = 0x06054b50;

    /// Size of the record including its signature.
    pub const SIZE: usize = 4 + std::mem::size_of::<EocdRecord>();

    /// Largest possible record: fixed part plus a maximal comment.
    pub const MAX_SIZE: usize = Self::SIZE + u16::MAX as usize;

    /// Name of the first central directory field holding a ZIP64 sentinel.
    pub fn zip64_field(&self) -> Option<(&'static str, u32)> {
        let size = self.central_dir_size;
        let offset = self.central_dir_offset;

        if offset == ZIP64_SENTINEL {
            Some(("offset", offset))
        } else if size == ZIP64_SENTINEL {
            Some(("size", size))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        assert_eq!(EocdRecord::SIZE, 22);
        assert_eq!(EocdRecord::MAX_SIZE, 65557);
    }
}
