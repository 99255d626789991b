//! The six filesystem targets: `buildfs_{a,b,all}` and `uploadfs_{a,b,all}`.
//!
//! Every target is the same slot operation (resolve the partition, check the
//! data directory, build the image, optionally flash it) applied to one or
//! both slots. Slots fail independently.

mod slot;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::FlashConfig;
use crate::error::{FlashError, FlashResult};
use crate::partition::ResolvedPartition;
use crate::size::{format_hex, format_size};
use crate::source::{self, SourceSummary};
use crate::tool::{BuildRequest, Runner, UploadRequest};

pub use slot::{Selection, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Build,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub action: Action,
    pub selection: Selection,
}

impl Target {
    pub const BUILDFS_A: Target = Target::new(Action::Build, Selection::One(Slot::A));
    pub const BUILDFS_B: Target = Target::new(Action::Build, Selection::One(Slot::B));
    pub const BUILDFS_ALL: Target = Target::new(Action::Build, Selection::All);
    pub const UPLOADFS_A: Target = Target::new(Action::Upload, Selection::One(Slot::A));
    pub const UPLOADFS_B: Target = Target::new(Action::Upload, Selection::One(Slot::B));
    pub const UPLOADFS_ALL: Target = Target::new(Action::Upload, Selection::All);

    pub const ALL: [Target; 6] = [
        Target::BUILDFS_A,
        Target::BUILDFS_B,
        Target::BUILDFS_ALL,
        Target::UPLOADFS_A,
        Target::UPLOADFS_B,
        Target::UPLOADFS_ALL,
    ];

    pub const fn new(action: Action, selection: Selection) -> Self {
        Self { action, selection }
    }

    pub fn description(&self) -> String {
        let what = match self.selection {
            Selection::One(slot) => format!("LittleFS image for partition {slot}"),
            Selection::All => "all LittleFS images".to_string(),
        };
        match self.action {
            Action::Build => format!("Build {what}"),
            Action::Upload => format!("Build and upload {what}"),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.action {
            Action::Build => "buildfs",
            Action::Upload => "uploadfs",
        };
        write!(f, "{}_{}", prefix, self.selection.suffix())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .into_iter()
            .find(|t| t.to_string() == s)
            .ok_or_else(|| format!("unknown target: {s}"))
    }
}

/// What one slot produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotReport {
    pub partition: ResolvedPartition,
    pub image_path: PathBuf,
    pub uploaded: bool,
}

#[derive(Debug)]
pub struct SlotOutcome {
    pub slot: Slot,
    pub result: FlashResult<SlotReport>,
}

#[derive(Debug)]
pub struct TargetReport {
    pub target: Target,
    pub outcomes: Vec<SlotOutcome>,
}

impl TargetReport {
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (Slot, &FlashError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.slot, e)))
    }
}

/// Run every slot of `target` in order. Failures are logged and collected,
/// never propagated, so slot B still runs when slot A fails.
pub fn run_target(target: Target, config: &FlashConfig, runner: &dyn Runner) -> TargetReport {
    info!("{}: {}", target, target.description());

    let outcomes = target
        .selection
        .slots()
        .iter()
        .map(|&slot| {
            let result = run_slot(slot, target.action, config, runner);
            if let Err(e) = &result {
                error!("{} partition {}: {}", target, slot, e);
            }
            SlotOutcome { slot, result }
        })
        .collect();

    TargetReport { target, outcomes }
}

pub fn run_slot(
    slot: Slot,
    action: Action,
    config: &FlashConfig,
    runner: &dyn Runner,
) -> FlashResult<SlotReport> {
    let table = config.partition_table()?;
    let partition = table.resolve_required(slot.partition_name())?;
    info!(
        "Partition {}: offset={}, size={}",
        slot,
        format_hex(partition.offset),
        partition.size
    );

    let source_dir = config.data_dir(slot);
    if !source_dir.is_dir() {
        return Err(FlashError::MissingSourceDirectory(source_dir));
    }

    inspect_source(&source_dir, slot, partition.size);

    let image_path = config.image_path(slot);
    config.image_builder().build(
        runner,
        &BuildRequest {
            source_dir,
            image_path: image_path.clone(),
            size_bytes: partition.size,
        },
    )?;

    let uploaded = match action {
        Action::Build => false,
        Action::Upload => {
            let baud = config.upload_baud()?;
            config.flasher().upload(
                runner,
                &UploadRequest {
                    image_path: image_path.clone(),
                    offset: partition.offset,
                    port: config.upload_port.clone(),
                    baud,
                },
            )?;
            true
        }
    };

    Ok(SlotReport {
        partition,
        image_path,
        uploaded,
    })
}

/// Log what is about to be packed. Walk errors only warn; mklittlefs decides.
fn inspect_source(source_dir: &Path, slot: Slot, partition_size: u64) -> Option<SourceSummary> {
    let summary = match source::summarize(source_dir) {
        Ok(summary) => summary,
        Err(e) => {
            warn!("could not inspect {}: {}", source_dir.display(), e);
            return None;
        }
    };
    info!(
        "Packing {} files in {} directories ({}) from {}",
        summary.files,
        summary.dirs,
        format_size(summary.bytes),
        source_dir.display()
    );
    if summary.bytes > partition_size {
        warn!(
            "{} holds {} but partition {} is only {}",
            source_dir.display(),
            format_size(summary.bytes),
            slot.partition_name(),
            format_size(partition_size)
        );
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_names_round_trip() {
        let names: Vec<_> = Target::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            names,
            [
                "buildfs_a",
                "buildfs_b",
                "buildfs_all",
                "uploadfs_a",
                "uploadfs_b",
                "uploadfs_all"
            ]
        );
        for name in names {
            assert_eq!(name.parse::<Target>().unwrap().to_string(), name);
        }
        assert!("flashfs_a".parse::<Target>().is_err());
    }

    #[test]
    fn selections_cover_the_right_slots() {
        assert_eq!(Target::BUILDFS_A.selection.slots(), [Slot::A]);
        assert_eq!(Target::UPLOADFS_B.selection.slots(), [Slot::B]);
        assert_eq!(Target::BUILDFS_ALL.selection.slots(), [Slot::A, Slot::B]);
    }

    #[test]
    fn descriptions_name_the_partition() {
        assert_eq!(
            Target::UPLOADFS_A.description(),
            "Build and upload LittleFS image for partition A"
        );
        assert_eq!(Target::BUILDFS_ALL.description(), "Build all LittleFS images");
    }

    #[test]
    fn unreadable_source_only_skips_the_summary() {
        let missing = Path::new("/nonexistent/data_a");
        assert_eq!(inspect_source(missing, Slot::A, 4096), None);
    }

    #[test]
    fn source_summary_counts_directories() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        std::fs::create_dir_all(temp.path().join("www")).unwrap();
        std::fs::write(temp.path().join("www/app.js"), b"//").unwrap();
        let summary = inspect_source(temp.path(), Slot::B, 1).unwrap();
        assert_eq!((summary.files, summary.dirs, summary.bytes), (1, 1, 2));
    }
}
