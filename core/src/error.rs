//! Error types for partition discovery

use core::fmt;

/// Result type for catalog queries
pub type Result<T> = core::result::Result<T, CatalogError>;

/// Why a device is not a candidate at all.
///
/// These are expected outcomes during a boot-time scan: most block I/O
/// handles are partitions, optical drives or blank media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Handle has no block I/O capability
    NoBlockIo,
    /// Device cannot do byte-addressed reads
    NoDiskIo,
    /// Device is a partition of another device
    LogicalPartition,
    /// Header block does not carry the "EFI PART" signature
    NoSignature,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBlockIo => write!(f, "no block I/O"),
            Self::NoDiskIo => write!(f, "no disk I/O"),
            Self::LogicalPartition => write!(f, "logical partition"),
            Self::NoSignature => write!(f, "no GPT signature"),
        }
    }
}

/// Outcome of probing one device that did not yield a disk record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Not a whole GPT disk; skipped silently
    NotApplicable(SkipReason),

    /// A read that should have worked failed
    Io,

    /// Entry array buffer could not be allocated
    OutOfMemory,

    /// Header fields are inconsistent (entry size, array size or location)
    Malformed,

    /// Header or entry array CRC32 mismatch (strict mode only)
    ChecksumMismatch,
}

impl Rejected {
    /// True for the silent, expected rejections
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable(_))
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable(reason) => write!(f, "Not a GPT disk: {}", reason),
            Self::Io => write!(f, "I/O error reading partition table"),
            Self::OutOfMemory => write!(f, "Out of memory for partition entry array"),
            Self::Malformed => write!(f, "Malformed GPT header"),
            Self::ChecksumMismatch => write!(f, "GPT checksum mismatch"),
        }
    }
}

/// Errors returned to catalog callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogError {
    /// No block devices, or no partition matched the query
    NotFound,
    /// The catalog's own bookkeeping could not be allocated
    OutOfMemory,
}

impl CatalogError {
    /// Get a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Partition not found",
            Self::OutOfMemory => "Out of memory building partition catalog",
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Byte-addressed read failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskIoError {
    /// The underlying block read failed
    Device,
    /// Offset + length does not fit the address space
    OutOfRange,
    /// Bounce buffer allocation failed
    OutOfMemory,
}

impl fmt::Display for DiskIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => write!(f, "Block read failed"),
            Self::OutOfRange => write!(f, "Read range out of bounds"),
            Self::OutOfMemory => write!(f, "Out of memory for bounce buffer"),
        }
    }
}

impl From<DiskIoError> for Rejected {
    fn from(err: DiskIoError) -> Self {
        match err {
            DiskIoError::OutOfMemory => Rejected::OutOfMemory,
            DiskIoError::Device | DiskIoError::OutOfRange => Rejected::Io,
        }
    }
}
