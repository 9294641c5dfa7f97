//! Partition catalog configuration.

/// LBA of the primary GPT header.
pub const PRIMARY_HEADER_LBA: u64 = 1;

/// Default cap on one disk's partition entry array (8192 entries of 128 bytes).
pub const DEFAULT_MAX_ENTRY_ARRAY_BYTES: usize = 1024 * 1024;

/// Partition catalog configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// LBA the GPT header is read from.
    pub header_lba: u64,
    /// Largest entry array the reader will allocate for a single disk.
    pub max_entry_array_bytes: usize,
    /// Reject disks whose header or entry array CRC32 does not match.
    /// Off by default: firmware-written tables with stale checksums still boot.
    pub verify_crc32: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            header_lba: PRIMARY_HEADER_LBA,
            max_entry_array_bytes: DEFAULT_MAX_ENTRY_ARRAY_BYTES,
            verify_crc32: false,
        }
    }
}

impl CatalogConfig {
    /// Default config with checksum verification enabled.
    pub fn strict() -> Self {
        Self {
            verify_crc32: true,
            ..Default::default()
        }
    }

    /// Set the header LBA.
    pub fn header_lba(mut self, lba: u64) -> Self {
        self.header_lba = lba;
        self
    }

    /// Set the entry array size limit.
    pub fn max_entry_array_bytes(mut self, bytes: usize) -> Self {
        self.max_entry_array_bytes = bytes;
        self
    }

    /// Enable or disable CRC32 verification.
    pub fn verify_crc32(mut self, enabled: bool) -> Self {
        self.verify_crc32 = enabled;
        self
    }
}
