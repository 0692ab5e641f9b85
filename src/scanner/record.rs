use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Cleanup category of a scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Temp,
    Cache,
    Backup,
    Old,
    /// Old files that matched nothing else; kept for operator review.
    UncategorizedOld,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Temp,
        Category::Cache,
        Category::Backup,
        Category::Old,
        Category::UncategorizedOld,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Temp => "temp",
            Category::Cache => "cache",
            Category::Backup => "backup",
            Category::Old => "old",
            Category::UncategorizedOld => "uncategorized_old",
        }
    }

    /// Whether a whole category may be selected for deletion at once.
    pub fn is_bulk_eligible(&self) -> bool {
        !matches!(self, Category::UncategorizedOld)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified regular file, as seen at scan time.
///
/// `(path, size, mtime)` is the identity checked again before deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Canonical absolute path
    pub path: PathBuf,

    /// Size in bytes
    pub size: u64,

    /// Last modification time
    pub mtime: SystemTime,

    pub category: Category,

    /// Position in walk-discovery order across the whole scan
    pub ordinal: usize,

    /// Reported for visibility but guarded against deletion
    pub protected: bool,
}

/// Immutable result of a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Classified records, each list in discovery order
    pub categories: BTreeMap<Category, Vec<FileRecord>>,

    /// Empty directories that may be removed
    pub empty_dirs: Vec<PathBuf>,

    /// Regular files counted by the walk
    pub total_files: u64,

    /// Bytes in counted files
    pub total_size: u64,

    /// Scan roots that existed and were walked
    pub roots: Vec<PathBuf>,

    /// The file cap stopped the walk early
    pub truncated: bool,
}

impl ScanReport {
    /// Records of one category, in discovery order.
    pub fn records(&self, category: Category) -> &[FileRecord] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn category_size(&self, category: Category) -> u64 {
        self.records(category).iter().map(|r| r.size).sum()
    }

    /// Records of the given categories merged back into discovery order.
    pub fn records_in_order(&self, categories: &[Category]) -> Vec<&FileRecord> {
        let mut records: Vec<_> = categories
            .iter()
            .flat_map(|c| self.records(*c))
            .collect();
        records.sort_by_key(|r| r.ordinal);
        records
    }

    /// Number of classified files across all categories.
    pub fn classified_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}
