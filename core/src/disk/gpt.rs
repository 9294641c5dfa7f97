// GPT layout helpers on top of gpt_disk_types
//
// The on-disk structs are `repr(C, packed)`, so GUID fields are copied out
// before comparing instead of borrowed.

use core::mem;
use gpt_disk_types::{GptHeader, GptPartitionEntry, GptPartitionName, GptPartitionType};
use uguid::Guid;

/// Smallest legal partition entry stride; also the bytes one entry decodes from
pub const MIN_PARTITION_ENTRY_SIZE: usize = mem::size_of::<GptPartitionEntry>();

/// UCS-2 code units in a partition name
pub const PARTITION_NAME_LEN: usize = 36;

/// Decode the header at the start of a block. No validation is done.
///
/// # Arguments
/// * `block` - Raw header block, at least 92 bytes
pub fn parse_header(block: &[u8]) -> Option<GptHeader> {
    let bytes = block.get(..mem::size_of::<GptHeader>())?;
    Some(*bytemuck::from_bytes(bytes))
}

/// Decode one entry from the first 128 bytes of a slot
pub fn parse_entry(slot: &[u8]) -> Option<GptPartitionEntry> {
    let bytes = slot.get(..MIN_PARTITION_ENTRY_SIZE)?;
    Some(*bytemuck::from_bytes(bytes))
}

/// Slot holds a partition and the partition has a name
pub fn is_named(entry: &GptPartitionEntry) -> bool {
    entry.is_used() && !entry.name.is_empty()
}

pub fn matches_type(entry: &GptPartitionEntry, partition_type: GptPartitionType) -> bool {
    let entry_type = entry.partition_type_guid;
    entry_type == partition_type
}

pub fn matches_unique_guid(entry: &GptPartitionEntry, guid: Guid) -> bool {
    let unique = entry.unique_partition_guid;
    unique == guid
}

/// Encode `label` as a zero-padded UTF-16LE name field.
/// `None` if it needs more than 36 code units.
pub fn encode_label(label: &str) -> Option<GptPartitionName> {
    let mut name = GptPartitionName::default();
    let mut units = label.encode_utf16();

    for slot in name.0.chunks_exact_mut(2) {
        match units.next() {
            Some(unit) => slot.copy_from_slice(&unit.to_le_bytes()),
            None => return Some(name),
        }
    }

    match units.next() {
        Some(_) => None,
        None => Some(name),
    }
}

/// Compare the whole 72-byte name field against `label`, padding included.
/// Bytes left after a terminator make the names differ.
pub fn label_matches(name: &GptPartitionName, label: &str) -> bool {
    match encode_label(label) {
        Some(encoded) => encoded == *name,
        None => false,
    }
}

/// Swap the byte order of the first three GUID fields.
///
/// Some installers wrote GUID strings in the wrong endianness; swapping turns
/// such a GUID back into the one the firmware stored.
pub fn swap_guid_endianness(guid: Guid) -> Guid {
    let mut bytes = guid.to_bytes();
    bytes[0..4].reverse();
    bytes[4..6].reverse();
    bytes[6..8].reverse();
    Guid::from_bytes(bytes)
}
