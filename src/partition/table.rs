use std::path::{Path, PathBuf};

use super::types::{DEFAULT_START_OFFSET, PartitionEntry, PartitionRecord, ResolvedPartition};
use crate::error::{FlashError, FlashResult};
use crate::size::parse_size;

const COL_NAME: usize = 0;
const COL_TYPE: usize = 1;
const COL_SUBTYPE: usize = 2;
const COL_OFFSET: usize = 3;
const COL_SIZE: usize = 4;

/// ESP-IDF style partition table: `name, type, subtype, offset, size[, flags]`.
///
/// Numeric columns are only parsed while walking the table, so a lookup stops
/// at the first matching row and never sees anything below it.
#[derive(Debug, Clone)]
pub struct PartitionTable {
    source: PathBuf,
    rows: Vec<Vec<String>>,
}

impl PartitionTable {
    pub fn load(path: &Path) -> FlashResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FlashError::io(path, e))?;
        Ok(Self::parse(path, &content))
    }

    /// `source` only names the table in error messages.
    pub fn parse(source: impl Into<PathBuf>, content: &str) -> Self {
        let rows = content
            .lines()
            .map(|line| line.split(',').map(|f| f.trim().to_string()).collect())
            .collect();
        Self {
            source: source.into(),
            rows,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Look up `name`; the first row with that name wins.
    pub fn resolve(&self, name: &str) -> FlashResult<Option<ResolvedPartition>> {
        for entry in self.layout() {
            let entry = entry?;
            if entry.name == name {
                return Ok(Some(ResolvedPartition {
                    offset: entry.offset,
                    size: entry.size,
                }));
            }
        }
        Ok(None)
    }

    pub fn resolve_required(&self, name: &str) -> FlashResult<ResolvedPartition> {
        self.resolve(name)?
            .ok_or_else(|| FlashError::PartitionNotFound {
                name: name.to_string(),
                table: self.source.clone(),
            })
    }

    /// Every usable row placed at its effective offset.
    pub fn entries(&self) -> FlashResult<Vec<PartitionEntry>> {
        self.layout().collect()
    }

    fn layout(&self) -> Layout<'_> {
        Layout {
            rows: self.rows.iter(),
            offset: Some(DEFAULT_START_OFFSET),
        }
    }
}

struct Layout<'a> {
    rows: std::slice::Iter<'a, Vec<String>>,
    // `None` once the running offset has overflowed.
    offset: Option<u64>,
}

impl Iterator for Layout<'_> {
    type Item = FlashResult<PartitionEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = self.rows.next()?;
            let record = match parse_record(row) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            };

            let offset = match record.offset.or(self.offset) {
                Some(offset) => offset,
                None => {
                    return Some(Err(FlashError::parse(
                        &record.name,
                        "running offset overflows u64",
                    )));
                }
            };
            self.offset = offset.checked_add(record.size);

            return Some(Ok(PartitionEntry {
                name: record.name,
                kind: record.kind,
                subtype: record.subtype,
                offset,
                size: record.size,
            }));
        }
    }
}

/// `Ok(None)` for blank rows, comments and rows without a size.
fn parse_record(row: &[String]) -> FlashResult<Option<PartitionRecord>> {
    let field = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");

    let name = field(COL_NAME);
    if row.iter().all(|f| f.is_empty()) || name.starts_with('#') {
        return Ok(None);
    }

    let size = field(COL_SIZE);
    if size.is_empty() {
        return Ok(None);
    }
    let size = parse_size(size)?;

    let offset = match field(COL_OFFSET) {
        "" => None,
        token => Some(parse_size(token)?),
    };

    Ok(Some(PartitionRecord {
        name: name.to_string(),
        kind: field(COL_TYPE).to_string(),
        subtype: field(COL_SUBTYPE).to_string(),
        offset,
        size,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUAL_TABLE: &str = "\
# Name,   Type, SubType, Offset,  Size, Flags
nvs,      data, nvs,     ,        20K,
partitions_a, data, spiffs, ,     2M,
partitions_b, data, spiffs, 0x210000, 2M,
";

    fn table(content: &str) -> PartitionTable {
        PartitionTable::parse("partitions.csv", content)
    }

    #[test]
    fn accumulates_offsets_from_default_start() {
        let t = table(DUAL_TABLE);
        let a = t.resolve("partitions_a").unwrap().unwrap();
        assert_eq!(a.offset, 0x9000 + 20 * 1024);
        assert_eq!(a.offset, 0xE000);
        assert_eq!(a.size, 2 * 1024 * 1024);

        let nvs = t.resolve("nvs").unwrap().unwrap();
        assert_eq!(nvs.offset, DEFAULT_START_OFFSET);
    }

    #[test]
    fn explicit_offset_overrides_accumulation() {
        let t = table(DUAL_TABLE);
        let b = t.resolve("partitions_b").unwrap().unwrap();
        assert_eq!(b.offset, 0x210000);
        assert_eq!(b.size, 2 * 1024 * 1024);
    }

    #[test]
    fn explicit_offset_resets_the_running_offset() {
        let t = table("first, data, spiffs, 0x100000, 64K\nsecond, data, spiffs, , 4K\n");
        let second = t.resolve("second").unwrap().unwrap();
        assert_eq!(second.offset, 0x100000 + 64 * 1024);
    }

    #[test]
    fn missing_name_is_none() {
        let t = table(DUAL_TABLE);
        assert_eq!(t.resolve("coredump").unwrap(), None);
        let err = t.resolve_required("coredump").unwrap_err();
        assert!(matches!(err, FlashError::PartitionNotFound { ref name, .. } if name == "coredump"));
    }

    #[test]
    fn comments_and_blank_rows_do_not_move_offset() {
        let t = table("\n# skipped, data, nvs, , 1M\n   \nnvs, data, nvs, , 20K\n,,,,\napp, app, factory, , 1M\n");
        let app = t.resolve("app").unwrap().unwrap();
        assert_eq!(app.offset, 0xE000);
    }

    #[test]
    fn indented_comment_is_skipped() {
        let t = table("   #nvs, data, nvs, , bogus\nnvs, data, nvs, , 4K\n");
        assert_eq!(t.resolve("nvs").unwrap().unwrap().offset, 0x9000);
    }

    #[test]
    fn row_without_size_is_skipped() {
        let t = table("terminator, data, nvs, 0x400000,\nshort, data\nnvs, data, nvs, , 4K\n");
        let nvs = t.resolve("nvs").unwrap().unwrap();
        assert_eq!(nvs.offset, DEFAULT_START_OFFSET);
        assert_eq!(t.resolve("terminator").unwrap(), None);
    }

    #[test]
    fn first_match_wins() {
        let t = table("dup, data, nvs, , 4K\ndup, data, nvs, 0x300000, 8K\n");
        let dup = t.resolve("dup").unwrap().unwrap();
        assert_eq!(dup.offset, 0x9000);
        assert_eq!(dup.size, 4096);
    }

    #[test]
    fn malformed_size_before_match_aborts() {
        let t = table("nvs, data, nvs, , 20Q\napp, app, factory, , 1M\n");
        let err = t.resolve("app").unwrap_err();
        assert!(matches!(err, FlashError::Parse { ref token, .. } if token == "20Q"));
    }

    #[test]
    fn malformed_offset_before_match_aborts() {
        let t = table("nvs, data, nvs, 0xnope, 20K\napp, app, factory, , 1M\n");
        assert!(t.resolve("app").is_err());
    }

    #[test]
    fn rows_after_match_are_not_parsed() {
        let t = table("nvs, data, nvs, , 20K\nbroken, data, nvs, , ???\n");
        assert!(t.resolve("nvs").unwrap().is_some());
        assert!(t.entries().is_err());
    }

    #[test]
    fn entries_lay_out_the_whole_table() {
        let entries = table(DUAL_TABLE).entries().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["nvs", "partitions_a", "partitions_b"]);
        assert_eq!(entries[1].kind, "data");
        assert_eq!(entries[1].subtype, "spiffs");
        assert_eq!(entries[2].offset, 0x210000);
    }

    #[test]
    fn accepts_space_before_size_suffix() {
        let t = table("partitions_a, data, spiffs, 0x10000, 2 M\n");
        let a = t.resolve("partitions_a").unwrap().unwrap();
        assert_eq!((a.offset, a.size), (0x10000, 2 * 1024 * 1024));
    }

    #[test]
    fn handles_crlf_line_endings() {
        let t = table("nvs, data, nvs, , 20K\r\napp, app, factory, , 1M\r\n");
        assert_eq!(t.resolve("app").unwrap().unwrap().size, 1024 * 1024);
    }
}
