//! GPT disk discovery
//!
//! - `gpt` - on-disk header and entry layout
//! - `reader` - validate and read one device's partition table
//! - `catalog` - scan all devices once and answer lookups

pub mod catalog;
pub mod gpt;
pub mod reader;
