//! Common test utilities: in-memory disks, a mock platform and a GPT image builder

#![allow(dead_code)]

use gpt_disk_io::BlockIo;
use gpt_disk_types::{
    BlockSize, Crc32, GptHeader, GptHeaderRevision, GptHeaderSignature, GptPartitionAttributes,
    GptPartitionEntry, GptPartitionType, Lba, LbaLe, U32Le, U64Le,
};
use morpheus_bootpart::{BootDevice, Platform};
use std::cell::Cell;
use std::io;
use std::rc::Rc;
use uguid::{guid, Guid};

pub const TYPE_BOOT: GptPartitionType = GptPartitionType(guid!("11111111-1111-1111-1111-111111111111"));
pub const TYPE_DATA: GptPartitionType = GptPartitionType(guid!("22222222-2222-2222-2222-222222222222"));

/// In-memory block device
///
/// Clones share the image and the read counter, so a platform can hand out
/// a fresh device per open and still count every read.
#[derive(Debug, Clone)]
pub struct MemoryDisk {
    data: Rc<Vec<u8>>,
    block_size: u32,
    logical_partition: bool,
    disk_io: bool,
    fail_from_lba: Option<u64>,
    reads: Rc<Cell<usize>>,
}

impl MemoryDisk {
    pub fn new(data: Vec<u8>, block_size: u32) -> Self {
        Self {
            data: Rc::new(data),
            block_size,
            logical_partition: false,
            disk_io: true,
            fail_from_lba: None,
            reads: Rc::new(Cell::new(0)),
        }
    }

    /// Device that firmware reports as a partition
    pub fn logical_partition(mut self) -> Self {
        self.logical_partition = true;
        self
    }

    /// Device without the disk I/O capability
    pub fn without_disk_io(mut self) -> Self {
        self.disk_io = false;
        self
    }

    /// Every read touching `lba` or later fails
    pub fn failing_from_lba(mut self, lba: u64) -> Self {
        self.fail_from_lba = Some(lba);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl BlockIo for MemoryDisk {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::new(self.block_size).expect("valid block size")
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok((self.data.len() / self.block_size as usize) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        self.reads.set(self.reads.get() + 1);

        let block_size = self.block_size as usize;
        if dst.len() % block_size != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "buffer is not a whole number of blocks",
            ));
        }

        let last_lba = start_lba.0 + (dst.len() / block_size) as u64;
        if let Some(fail) = self.fail_from_lba {
            if last_lba > fail {
                return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
            }
        }

        let offset = start_lba.0 as usize * block_size;
        if offset + dst.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read beyond end of device",
            ));
        }
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> Result<(), Self::Error> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "read-only test device",
        ))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl BootDevice for MemoryDisk {
    fn is_logical_partition(&self) -> bool {
        self.logical_partition
    }

    fn supports_disk_io(&self) -> bool {
        self.disk_io
    }
}

/// Opaque handle handed out by [`MockPlatform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId(pub usize);

/// Platform with a fixed list of handles
#[derive(Debug, Default)]
pub struct MockPlatform {
    devices: Vec<Option<MemoryDisk>>,
    reads: Rc<Cell<usize>>,
    pub locate_calls: usize,
    pub open_calls: usize,
    pub fail_locate: bool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device; its reads count towards [`MockPlatform::reads`]
    pub fn add(&mut self, mut disk: MemoryDisk) -> DeviceId {
        disk.reads = Rc::clone(&self.reads);
        self.devices.push(Some(disk));
        DeviceId(self.devices.len() - 1)
    }

    /// Register a GPT image as a whole disk
    pub fn add_image(&mut self, image: Vec<u8>, block_size: u32) -> DeviceId {
        self.add(MemoryDisk::new(image, block_size))
    }

    /// Register a handle that has no block I/O protocol
    pub fn add_without_block_io(&mut self) -> DeviceId {
        self.devices.push(None);
        DeviceId(self.devices.len() - 1)
    }

    /// Block reads across all devices
    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl Platform for MockPlatform {
    type Handle = DeviceId;
    type Device = MemoryDisk;
    type Error = io::Error;

    fn locate_block_io_handles(&mut self) -> Result<Vec<DeviceId>, io::Error> {
        self.locate_calls += 1;
        if self.fail_locate {
            return Err(io::Error::new(io::ErrorKind::NotFound, "LocateHandle failed"));
        }
        Ok((0..self.devices.len()).map(DeviceId).collect())
    }

    fn open_block_io(&mut self, handle: DeviceId) -> Option<MemoryDisk> {
        self.open_calls += 1;
        self.devices.get(handle.0).cloned().flatten()
    }
}

/// One partition slot to write
#[derive(Debug, Clone)]
pub struct PartitionDef {
    pub slot: u32,
    pub partition_type: GptPartitionType,
    pub unique_guid: Guid,
    pub first_lba: u64,
    pub last_lba: u64,
    pub attributes: u64,
    pub name: Vec<u16>,
}

impl PartitionDef {
    pub fn new(slot: u32, partition_type: GptPartitionType, name: &str) -> Self {
        let first_lba = 64 + u64::from(slot) * 8;
        let mut unique = [0u8; 16];
        unique[0] = 0xA0;
        unique[4..8].copy_from_slice(&slot.to_le_bytes());
        unique[15] = 0x5A;

        Self {
            slot,
            partition_type,
            unique_guid: Guid::from_bytes(unique),
            first_lba,
            last_lba: first_lba + 7,
            attributes: 0,
            name: name.encode_utf16().collect(),
        }
    }

    pub fn unique_guid(mut self, guid: Guid) -> Self {
        self.unique_guid = guid;
        self
    }

    pub fn extent(mut self, first_lba: u64, last_lba: u64) -> Self {
        self.first_lba = first_lba;
        self.last_lba = last_lba;
        self
    }

    pub fn raw_name(mut self, units: &[u16]) -> Self {
        self.name = units.to_vec();
        self
    }
}

/// Builds a disk image with a protective MBR, primary GPT header at LBA 1
/// and an entry array. Checksums are correct unless told otherwise.
#[derive(Debug, Clone)]
pub struct GptImageBuilder {
    block_size: u32,
    num_blocks: u64,
    entry_count: u32,
    entry_size: u32,
    declared_count: Option<u32>,
    entries_lba: u64,
    disk_guid: Guid,
    signature: [u8; 8],
    partitions: Vec<PartitionDef>,
    bad_header_crc: bool,
    bad_entries_crc: bool,
}

impl GptImageBuilder {
    pub fn new(block_size: u32) -> Self {
        Self {
            block_size,
            num_blocks: 256,
            entry_count: 128,
            entry_size: 128,
            declared_count: None,
            entries_lba: 2,
            disk_guid: guid!("57a7b7e2-0b35-4b5c-9c3e-3b0f8a6d1c42"),
            signature: *b"EFI PART",
            partitions: Vec::new(),
            bad_header_crc: false,
            bad_entries_crc: false,
        }
    }

    pub fn num_blocks(mut self, num_blocks: u64) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    pub fn entries(mut self, count: u32, size: u32) -> Self {
        self.entry_count = count;
        self.entry_size = size;
        self
    }

    /// Header advertises `count` entries; the array on disk is unchanged
    pub fn declared_entry_count(mut self, count: u32) -> Self {
        self.declared_count = Some(count);
        self
    }

    pub fn entries_lba(mut self, lba: u64) -> Self {
        self.entries_lba = lba;
        self
    }

    pub fn signature(mut self, signature: &[u8; 8]) -> Self {
        self.signature = *signature;
        self
    }

    pub fn partition(self, slot: u32, partition_type: GptPartitionType, name: &str) -> Self {
        self.with(PartitionDef::new(slot, partition_type, name))
    }

    pub fn with(mut self, def: PartitionDef) -> Self {
        self.partitions.push(def);
        self
    }

    pub fn bad_header_crc(mut self) -> Self {
        self.bad_header_crc = true;
        self
    }

    pub fn bad_entries_crc(mut self) -> Self {
        self.bad_entries_crc = true;
        self
    }

    /// The raw entry array as it lands on disk
    pub fn entry_array(&self) -> Vec<u8> {
        let stride = self.entry_size as usize;
        let mut raw = vec![0u8; self.entry_count as usize * stride];

        for part in &self.partitions {
            let mut entry = GptPartitionEntry {
                partition_type_guid: part.partition_type,
                unique_partition_guid: part.unique_guid,
                starting_lba: LbaLe::from_u64(part.first_lba),
                ending_lba: LbaLe::from_u64(part.last_lba),
                attributes: GptPartitionAttributes(U64Le::from_u64(part.attributes)),
                ..GptPartitionEntry::default()
            };
            for (i, unit) in part.name.iter().take(36).enumerate() {
                entry.name.0[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
            }

            let base = part.slot as usize * stride;
            let entry_bytes = bytemuck::bytes_of(&entry);
            raw[base..base + entry_bytes.len()].copy_from_slice(entry_bytes);
        }

        raw
    }

    pub fn build(&self) -> Vec<u8> {
        let bs = self.block_size as usize;
        let mut data = vec![0u8; bs * self.num_blocks as usize];

        // Protective MBR
        data[446 + 4] = 0xEE;
        data[510] = 0x55;
        data[511] = 0xAA;

        let entries = self.entry_array();
        let mut entries_crc = crc32fast::hash(&entries);
        if self.bad_entries_crc {
            entries_crc ^= 0xDEAD_BEEF;
        }

        // Arrays that run off the end of the image are clipped
        let start = self.entries_lba as usize * bs;
        if start < data.len() {
            let len = entries.len().min(data.len() - start);
            data[start..start + len].copy_from_slice(&entries[..len]);
        }

        let array_blocks = (entries.len() as u64 + u64::from(self.block_size) - 1)
            / u64::from(self.block_size);

        let mut header = GptHeader {
            signature: GptHeaderSignature(U64Le(self.signature)),
            revision: GptHeaderRevision::VERSION_1_0,
            header_size: U32Le::from_u32(92),
            header_crc32: Crc32::default(),
            reserved: U32Le::from_u32(0),
            my_lba: LbaLe::from_u64(1),
            alternate_lba: LbaLe::from_u64(self.num_blocks - 1),
            first_usable_lba: LbaLe::from_u64(self.entries_lba + array_blocks),
            last_usable_lba: LbaLe::from_u64(self.num_blocks.saturating_sub(34)),
            disk_guid: self.disk_guid,
            partition_entry_lba: LbaLe::from_u64(self.entries_lba),
            number_of_partition_entries: U32Le::from_u32(
                self.declared_count.unwrap_or(self.entry_count),
            ),
            size_of_partition_entry: U32Le::from_u32(self.entry_size),
            partition_entry_array_crc32: Crc32(U32Le::from_u32(entries_crc)),
        };
        header.update_header_crc32();
        if self.bad_header_crc {
            let stored = header.header_crc32.0.to_u32();
            header.header_crc32 = Crc32(U32Le::from_u32(stored ^ 0x0BAD_F00D));
        }

        data[bs..bs + 92].copy_from_slice(bytemuck::bytes_of(&header));
        data
    }
}

/// Blank device of `num_blocks` 512-byte blocks
pub fn blank_disk(num_blocks: usize) -> Vec<u8> {
    vec![0u8; num_blocks * 512]
}
