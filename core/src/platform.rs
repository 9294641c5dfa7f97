//! Firmware device services
//!
//! The catalog never talks to firmware directly. It sees a [`Platform`] that
//! hands out block I/O handles, and a [`BootDevice`] per opened handle. On
//! UEFI these map to `LocateHandle(ByProtocol, BLOCK_IO)`, the Block I/O
//! protocol (media + `ReadBlocks`) and the Disk I/O protocol (`ReadDisk`).

use crate::error::DiskIoError;
use alloc::vec::Vec;
use core::fmt;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

/// Device enumeration service
pub trait Platform {
    /// Opaque device reference. Owned by the platform; the catalog only
    /// copies it around.
    type Handle: Copy + PartialEq + fmt::Debug;

    /// Opened device
    type Device: BootDevice;

    /// Enumeration error
    type Error: fmt::Debug + fmt::Display;

    /// Every handle exposing block I/O, in platform order.
    fn locate_block_io_handles(&mut self) -> Result<Vec<Self::Handle>, Self::Error>;

    /// Open block I/O on `handle`. `None` if the handle does not support it.
    fn open_block_io(&mut self, handle: Self::Handle) -> Option<Self::Device>;
}

impl<P: Platform + ?Sized> Platform for &mut P {
    type Handle = P::Handle;
    type Device = P::Device;
    type Error = P::Error;

    fn locate_block_io_handles(&mut self) -> Result<Vec<Self::Handle>, Self::Error> {
        (**self).locate_block_io_handles()
    }

    fn open_block_io(&mut self, handle: Self::Handle) -> Option<Self::Device> {
        (**self).open_block_io(handle)
    }
}

/// Block device with media information and byte-addressed reads
///
/// Block size and extent come from [`BlockIo`]; this trait adds the media
/// flag and the disk I/O capability.
pub trait BootDevice: BlockIo {
    /// The device is a partition exposed by firmware, not a whole disk.
    fn is_logical_partition(&self) -> bool;

    /// Whether byte-addressed reads are available.
    fn supports_disk_io(&self) -> bool {
        true
    }

    /// Read `dst.len()` bytes starting at byte `offset`.
    ///
    /// The default goes through [`BlockIo::read_blocks`]: block-aligned
    /// requests land directly in `dst`, anything else through a bounce buffer
    /// covering the touched blocks.
    fn read_disk(&mut self, offset: u64, dst: &mut [u8]) -> Result<(), DiskIoError> {
        if dst.is_empty() {
            return Ok(());
        }

        let block_size = u64::from(self.block_size().to_u32());
        let len = dst.len() as u64;
        let end = offset.checked_add(len).ok_or(DiskIoError::OutOfRange)?;

        if offset % block_size == 0 && len % block_size == 0 {
            return self
                .read_blocks(Lba(offset / block_size), dst)
                .map_err(|_| DiskIoError::Device);
        }

        let first_block = offset / block_size;
        let last_block = (end - 1) / block_size;
        let span = (last_block - first_block + 1)
            .checked_mul(block_size)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(DiskIoError::OutOfRange)?;

        let mut bounce = Vec::new();
        bounce
            .try_reserve_exact(span)
            .map_err(|_| DiskIoError::OutOfMemory)?;
        bounce.resize(span, 0u8);

        self.read_blocks(Lba(first_block), &mut bounce)
            .map_err(|_| DiskIoError::Device)?;

        let skip = (offset - first_block * block_size) as usize;
        dst.copy_from_slice(&bounce[skip..skip + dst.len()]);
        Ok(())
    }
}
