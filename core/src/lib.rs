//! Morpheus boot partition catalog
//!
//! Finds GPT disks at boot time, before any filesystem driver is up, and
//! resolves partitions by label or GUID.
//!
//! # Architecture
//!
//! 1. **Platform** - firmware seam: block I/O handle enumeration and
//!    per-device block/disk reads (`platform`)
//! 2. **Disk table reader** - validates one device's GPT header and reads its
//!    partition entry array (`disk::reader`, layout in `disk::gpt`)
//! 3. **Partition catalog** - scans every device once, caches the results and
//!    answers lookups (`disk::catalog`)
//!
//! # Usage
//!
//! ```ignore
//! use morpheus_bootpart::{CatalogConfig, PartitionCatalog};
//!
//! let mut catalog = PartitionCatalog::new(&mut firmware);
//! let boot = catalog.find_by_label("boot")?;
//! let kernel_lba = boot.first_lba();
//!
//! for part in catalog.list_all()? {
//!     // ...
//! }
//!
//! catalog.free();
//! ```

#![no_std]

extern crate alloc;

pub mod config;
pub mod disk;
pub mod error;
pub mod logger;
pub mod platform;

pub use config::CatalogConfig;
pub use disk::catalog::{PartitionCatalog, PartitionHandle};
pub use gpt_disk_types::{GptHeader, GptPartitionEntry, GptPartitionName, GptPartitionType};
pub use uguid::Guid;
pub use disk::reader::{probe_and_read, read_table, DiskRecord, EntryArray};
pub use error::{CatalogError, DiskIoError, Rejected, Result, SkipReason};
pub use platform::{BootDevice, Platform};
