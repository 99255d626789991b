use serde::Serialize;

/// First free byte after the bootloader and partition-table region.
pub const DEFAULT_START_OFFSET: u64 = 0x9000;

/// One row of the partition table as written by the table author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRecord {
    pub name: String,
    pub kind: String,
    pub subtype: String,
    pub offset: Option<u64>,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPartition {
    pub offset: u64,
    pub size: u64,
}

/// A record placed at its effective offset.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PartitionEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: String,
    pub offset: u64,
    pub size: u64,
}
