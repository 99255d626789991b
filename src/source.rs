use std::path::Path;

use walkdir::WalkDir;

use crate::error::{FlashError, FlashResult};

/// What `mklittlefs` is about to pack from a source directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
}

/// Walk `dir` recursively and total regular file sizes. Symlinks are not
/// followed.
pub fn summarize(dir: &Path) -> FlashResult<SourceSummary> {
    let mut summary = SourceSummary::default();
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            FlashError::io(path, e.into())
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            summary.dirs += 1;
        } else if file_type.is_file() {
            let meta = entry
                .metadata()
                .map_err(|e| FlashError::io(entry.path(), e.into()))?;
            summary.files += 1;
            summary.bytes += meta.len();
        }
    }
    Ok(summary)
}
