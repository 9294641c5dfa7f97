// Partition catalog
//
// Scans every block I/O handle once, keeps the GPT disks it finds, and
// answers lookups from that cache until free() is called.

use super::gpt::{
    encode_label, is_named, matches_type, matches_unique_guid, swap_guid_endianness,
};
use super::reader::{probe_and_read, DiskRecord};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Rejected, Result};
use crate::platform::Platform;
use crate::{log_info, log_trace, log_warn};
use alloc::vec::Vec;
use gpt_disk_types::{GptPartitionEntry, GptPartitionName, GptPartitionType};
use uguid::Guid;

/// A partition resolved by a query, tied to the device it lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionHandle<H> {
    /// Device holding the partition
    pub device: H,
    /// Slot in the disk's entry array
    pub index: u32,
    /// The entry itself
    pub entry: GptPartitionEntry,
    /// Block size of `device`
    pub block_size: u32,
}

impl<H> PartitionHandle<H> {
    pub fn name(&self) -> &GptPartitionName {
        &self.entry.name
    }

    pub fn partition_type(&self) -> GptPartitionType {
        self.entry.partition_type_guid
    }

    pub fn unique_guid(&self) -> Guid {
        self.entry.unique_partition_guid
    }

    pub fn first_lba(&self) -> u64 {
        self.entry.starting_lba.to_u64()
    }

    pub fn last_lba(&self) -> u64 {
        self.entry.ending_lba.to_u64()
    }

    /// Blocks covered by the partition; 0 when the range is inverted
    pub fn num_blocks(&self) -> u64 {
        self.entry
            .lba_range()
            .map(|range| (range.end().to_u64() - range.start().to_u64()).saturating_add(1))
            .unwrap_or(0)
    }

    /// Partition size in bytes, saturating
    pub fn size_bytes(&self) -> u64 {
        self.num_blocks().saturating_mul(u64::from(self.block_size))
    }
}

/// Cache of GPT disks reachable through the platform
///
/// Either empty (never built, or freed) or fully built. Every query builds
/// on demand; once built, queries do no device I/O.
pub struct PartitionCatalog<P: Platform> {
    platform: P,
    config: CatalogConfig,
    disks: Option<Vec<DiskRecord<P::Handle>>>,
    used_partitions: usize,
    named_partitions: usize,
}

impl<P: Platform> PartitionCatalog<P> {
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, CatalogConfig::default())
    }

    pub fn with_config(platform: P, config: CatalogConfig) -> Self {
        Self {
            platform,
            config,
            disks: None,
            used_partitions: 0,
            named_partitions: 0,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Give the platform back, dropping the cache
    pub fn into_platform(self) -> P {
        self.platform
    }

    pub fn is_built(&self) -> bool {
        self.disks.is_some()
    }

    /// Cached disks in scan order; empty when not built
    pub fn disks(&self) -> &[DiskRecord<P::Handle>] {
        self.disks.as_deref().unwrap_or(&[])
    }

    pub fn disk_count(&self) -> usize {
        self.disks().len()
    }

    /// Named, used partitions across all cached disks (what `list_all` returns)
    pub fn partition_count(&self) -> usize {
        self.named_partitions
    }

    /// Used partitions across all cached disks, named or not
    pub fn used_partition_count(&self) -> usize {
        self.used_partitions
    }

    /// Scan every block device and cache the GPT disks
    ///
    /// No-op when already built. One unreadable device never stops the scan;
    /// only an empty enumeration or running out of memory for the cache
    /// itself is reported. On error the catalog stays empty.
    pub fn build(&mut self) -> Result<()> {
        if self.disks.is_some() {
            return Ok(());
        }

        let handles = match self.platform.locate_block_io_handles() {
            Ok(handles) if !handles.is_empty() => handles,
            Ok(_) => {
                log_info!("catalog: no block devices");
                return Err(CatalogError::NotFound);
            }
            Err(_) => {
                log_warn!("catalog: block device enumeration failed");
                return Err(CatalogError::NotFound);
            }
        };

        let mut disks = Vec::new();
        let mut used = 0;
        let mut named = 0;

        for handle in handles {
            let record = match probe_and_read(&mut self.platform, handle, &self.config) {
                Ok(record) => record,
                Err(Rejected::NotApplicable(_)) => {
                    log_trace!("catalog: skipping non-GPT device");
                    continue;
                }
                Err(Rejected::Io) => {
                    log_warn!("catalog: skipping disk, read failed");
                    continue;
                }
                Err(Rejected::OutOfMemory) => {
                    log_warn!("catalog: skipping disk, out of memory for entry array");
                    continue;
                }
                Err(Rejected::Malformed) => {
                    log_warn!("catalog: skipping disk, malformed GPT");
                    continue;
                }
                Err(Rejected::ChecksumMismatch) => {
                    log_warn!("catalog: skipping disk, GPT checksum mismatch");
                    continue;
                }
            };

            disks
                .try_reserve(1)
                .map_err(|_| CatalogError::OutOfMemory)?;

            used += record.entries().used_count();
            named += record.entries().named_count();
            disks.push(record);
        }

        if disks.is_empty() {
            log_info!("catalog: no GPT disks found");
        } else {
            log_info!("catalog: built");
        }

        self.used_partitions = used;
        self.named_partitions = named;
        self.disks = Some(disks);
        Ok(())
    }

    /// Drop the cache. Safe to call at any time, any number of times.
    pub fn free(&mut self) {
        self.disks = None;
        self.used_partitions = 0;
        self.named_partitions = 0;
    }

    /// Used partitions of every disk, disk order then slot order
    fn used_entries(&self) -> impl Iterator<Item = PartitionHandle<P::Handle>> + '_ {
        self.disks().iter().flat_map(|disk| {
            let device = disk.handle();
            let block_size = disk.block_size();
            disk.entries().used().map(move |(index, entry)| PartitionHandle {
                device,
                index,
                entry,
                block_size,
            })
        })
    }

    /// Scan the cache only; callers build first
    fn find_cached<F>(&self, mut pred: F) -> Option<PartitionHandle<P::Handle>>
    where
        F: FnMut(&GptPartitionEntry) -> bool,
    {
        self.used_entries().find(|part| pred(&part.entry))
    }

    /// First used partition whose name equals `label`
    ///
    /// The comparison is case-sensitive and covers the full 36-unit name
    /// field, so `""` finds a used partition with an empty name.
    pub fn find_by_label(&mut self, label: &str) -> Result<PartitionHandle<P::Handle>> {
        self.build()?;
        // Longer than the name field: nothing can match
        let wanted = encode_label(label).ok_or(CatalogError::NotFound)?;
        self.find_cached(|entry| entry.name == wanted)
            .ok_or(CatalogError::NotFound)
    }

    /// First used partition with this unique GUID
    ///
    /// Falls back to the byte-swapped GUID for tables written by installers
    /// that stored GUID strings little-endian.
    pub fn find_by_unique_guid(&mut self, guid: Guid) -> Result<PartitionHandle<P::Handle>> {
        self.build()?;
        self.find_cached(|entry| matches_unique_guid(entry, guid))
            .or_else(|| {
                let swapped = swap_guid_endianness(guid);
                self.find_cached(|entry| matches_unique_guid(entry, swapped))
            })
            .ok_or(CatalogError::NotFound)
    }

    /// First used partition of the given type, e.g. the EFI system partition
    pub fn find_by_type(
        &mut self,
        partition_type: GptPartitionType,
    ) -> Result<PartitionHandle<P::Handle>> {
        self.build()?;
        self.find_cached(|entry| matches_type(entry, partition_type))
            .ok_or(CatalogError::NotFound)
    }

    /// Every used partition that has a name
    pub fn list_all(&mut self) -> Result<Vec<PartitionHandle<P::Handle>>> {
        self.build()?;

        let mut parts = Vec::new();
        parts
            .try_reserve_exact(self.named_partitions)
            .map_err(|_| CatalogError::OutOfMemory)?;
        parts.extend(self.used_entries().filter(|part| is_named(&part.entry)));
        Ok(parts)
    }
}
