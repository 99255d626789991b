mod table;
mod types;

pub use table::PartitionTable;
pub use types::{DEFAULT_START_OFFSET, PartitionEntry, PartitionRecord, ResolvedPartition};
