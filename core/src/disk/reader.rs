// GPT table reader
//
// One device in, either a validated header + entry array or a rejection.
// Capability and whole-disk checks come before any I/O, and the header is
// validated before its fields size the entry array read.

use super::gpt::{is_named, parse_entry, parse_header};
use crate::config::CatalogConfig;
use crate::error::{Rejected, SkipReason};
use crate::platform::{BootDevice, Platform};
use crate::log_warn;
use alloc::vec::Vec;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{
    Crc32, GptHeader, GptPartitionEntry, GptPartitionEntryArrayLayout, Lba, U32Le,
};

/// Raw partition entry array, read verbatim from disk
///
/// Holds exactly `num_entries * entry_size` bytes as described by the
/// header's layout. Entries are decoded on access using that stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryArray {
    raw: Vec<u8>,
    layout: GptPartitionEntryArrayLayout,
}

impl EntryArray {
    /// `raw` must be exactly the layout's size
    pub(crate) fn from_raw(raw: Vec<u8>, layout: GptPartitionEntryArrayLayout) -> Option<Self> {
        if layout.num_bytes_exact_as_usize() != Some(raw.len()) {
            return None;
        }

        Some(Self { raw, layout })
    }

    /// Number of slots (used or not)
    pub fn len(&self) -> usize {
        self.layout.num_entries as usize
    }

    pub fn is_empty(&self) -> bool {
        self.layout.num_entries == 0
    }

    /// Stride in bytes
    pub fn entry_size(&self) -> usize {
        self.layout.entry_size.to_u32() as usize
    }

    pub fn layout(&self) -> &GptPartitionEntryArrayLayout {
        &self.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Decode slot `index`, used or not
    pub fn get(&self, index: u32) -> Option<GptPartitionEntry> {
        if index >= self.layout.num_entries {
            return None;
        }

        let offset = index as usize * self.entry_size();
        parse_entry(&self.raw[offset..])
    }

    /// Every slot in array order, with its index
    pub fn iter(&self) -> impl Iterator<Item = (u32, GptPartitionEntry)> + '_ {
        self.raw
            .chunks_exact(self.entry_size())
            .enumerate()
            .filter_map(|(i, slot)| parse_entry(slot).map(|e| (i as u32, e)))
    }

    /// Slots with a partition type other than unused
    pub fn used(&self) -> impl Iterator<Item = (u32, GptPartitionEntry)> + '_ {
        self.iter().filter(|(_, e)| e.is_used())
    }

    pub fn used_count(&self) -> usize {
        self.used().count()
    }

    /// Used slots that also have a name
    pub fn named_count(&self) -> usize {
        self.iter().filter(|(_, e)| is_named(e)).count()
    }

    /// CRC32 of the whole array, comparable with the header's
    /// `partition_entry_array_crc32`
    pub fn crc32(&self) -> Crc32 {
        Crc32(U32Le::from_u32(crc32fast::hash(&self.raw)))
    }
}

/// One GPT disk found during a scan
#[derive(Debug, Clone)]
pub struct DiskRecord<H> {
    handle: H,
    header: GptHeader,
    block_size: u32,
    entries: EntryArray,
}

impl<H: Copy> DiskRecord<H> {
    /// Device handle; owned by the platform, not by this record
    pub fn handle(&self) -> H {
        self.handle
    }

    pub fn header(&self) -> &GptHeader {
        &self.header
    }

    /// Logical block size of the device in bytes
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn entries(&self) -> &EntryArray {
        &self.entries
    }
}

fn alloc_zeroed(len: usize) -> Result<Vec<u8>, Rejected> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Rejected::OutOfMemory)?;
    buf.resize(len, 0u8);
    Ok(buf)
}

/// Read and validate the GPT of an opened device
///
/// # Arguments
/// * `device` - Opened block device
/// * `config` - Header location, size limit, checksum mode
///
/// # Returns
/// The parsed header and the entry array bytes
pub fn read_table<D: BootDevice>(
    device: &mut D,
    config: &CatalogConfig,
) -> Result<(GptHeader, EntryArray), Rejected> {
    if !device.supports_disk_io() {
        return Err(Rejected::NotApplicable(SkipReason::NoDiskIo));
    }

    // Only whole disks; firmware already exposes each partition separately
    if device.is_logical_partition() {
        return Err(Rejected::NotApplicable(SkipReason::LogicalPartition));
    }

    let block_size = u64::from(device.block_size().to_u32());
    let mut block = alloc_zeroed(block_size as usize)?;

    device
        .read_blocks(Lba(config.header_lba), &mut block)
        .map_err(|_| {
            log_warn!("gpt: header read failed");
            Rejected::Io
        })?;

    let header = parse_header(&block).ok_or(Rejected::Malformed)?;
    if !header.is_signature_valid() {
        return Err(Rejected::NotApplicable(SkipReason::NoSignature));
    }

    if config.verify_crc32 && header.calculate_header_crc32() != header.header_crc32 {
        log_warn!("gpt: header CRC32 mismatch");
        return Err(Rejected::ChecksumMismatch);
    }

    // Entry size must be 128 * 2^n
    let layout = header.get_partition_entry_array_layout().map_err(|_| {
        log_warn!("gpt: invalid partition entry size");
        Rejected::Malformed
    })?;

    let size = layout
        .num_bytes_exact_as_usize()
        .filter(|&len| len <= config.max_entry_array_bytes)
        .ok_or_else(|| {
            log_warn!("gpt: partition entry array too large");
            Rejected::Malformed
        })?;

    let offset = layout
        .start_lba
        .to_u64()
        .checked_mul(block_size)
        .ok_or(Rejected::Malformed)?;

    let device_bytes = device
        .num_blocks()
        .map_err(|_| Rejected::Io)?
        .saturating_mul(block_size);

    match offset.checked_add(size as u64) {
        Some(end) if end <= device_bytes => {}
        _ => {
            log_warn!("gpt: partition entry array beyond end of disk");
            return Err(Rejected::Malformed);
        }
    }

    let mut raw = alloc_zeroed(size)?;
    if let Err(err) = device.read_disk(offset, &mut raw) {
        log_warn!("gpt: partition entry array read failed");
        return Err(err.into());
    }

    let entries = EntryArray::from_raw(raw, layout).ok_or(Rejected::Malformed)?;

    if config.verify_crc32 && entries.crc32() != header.partition_entry_array_crc32 {
        log_warn!("gpt: partition entry array CRC32 mismatch");
        return Err(Rejected::ChecksumMismatch);
    }

    Ok((header, entries))
}

/// Probe one handle and, if it is a whole GPT disk, read its partition table
///
/// `NotApplicable` is the common case and is not an error for the scan.
pub fn probe_and_read<P: Platform>(
    platform: &mut P,
    handle: P::Handle,
    config: &CatalogConfig,
) -> Result<DiskRecord<P::Handle>, Rejected> {
    let mut device = platform
        .open_block_io(handle)
        .ok_or(Rejected::NotApplicable(SkipReason::NoBlockIo))?;

    let block_size = device.block_size().to_u32();
    let (header, entries) = read_table(&mut device, config)?;

    Ok(DiskRecord {
        handle,
        header,
        block_size,
        entries,
    })
}
