use std::fmt;

/// One half of the A/B data partition pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::A, Slot::B];

    pub fn partition_name(self) -> &'static str {
        match self {
            Slot::A => "partitions_a",
            Slot::B => "partitions_b",
        }
    }

    pub fn data_dir_name(self) -> &'static str {
        match self {
            Slot::A => "data_a",
            Slot::B => "data_b",
        }
    }

    pub fn image_file_name(self) -> &'static str {
        match self {
            Slot::A => "littlefs_a.bin",
            Slot::B => "littlefs_b.bin",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Slot::A => "a",
            Slot::B => "b",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::A => "A",
            Slot::B => "B",
        })
    }
}

/// Which slots a target covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    One(Slot),
    All,
}

impl Selection {
    pub fn slots(self) -> &'static [Slot] {
        match self {
            Selection::One(Slot::A) => &[Slot::A],
            Selection::One(Slot::B) => &[Slot::B],
            Selection::All => &[Slot::A, Slot::B],
        }
    }

    pub(super) fn suffix(self) -> &'static str {
        match self {
            Selection::One(slot) => slot.suffix(),
            Selection::All => "all",
        }
    }
}
