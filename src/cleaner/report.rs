use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::backup::BackupRecord;

/// What went wrong with a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The guard protects the path.
    ProtectionViolation,
    /// The path resolves outside the boundary root.
    OutsideBoundary,
    /// Removal failed; the item is still on disk.
    DeletionFailed,
    /// The copy into quarantine failed, so the item was not deleted.
    BackupFailed,
    /// Already gone.
    Missing,
    /// Size, modification time or identity differ from the scan.
    Changed,
    /// Directory gained entries since the scan.
    NotEmpty,
}

impl IssueKind {
    /// Failures count against the run; the rest are skips.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            IssueKind::ProtectionViolation
                | IssueKind::OutsideBoundary
                | IssueKind::DeletionFailed
                | IssueKind::BackupFailed
        )
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueKind::ProtectionViolation => "protected",
            IssueKind::OutsideBoundary => "outside boundary",
            IssueKind::DeletionFailed => "deletion failed",
            IssueKind::BackupFailed => "backup failed",
            IssueKind::Missing => "missing",
            IssueKind::Changed => "changed",
            IssueKind::NotEmpty => "not empty",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemIssue {
    pub path: PathBuf,
    pub kind: IssueKind,
    pub reason: String,
}

/// Outcome of one cleaning run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub dry_run: bool,
    /// Items examined
    pub processed: usize,
    /// Items removed (or that would be, in a dry run)
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_freed: u64,
    /// Removed paths in processing order
    pub removed: Vec<PathBuf>,
    pub issues: Vec<ItemIssue>,
    pub backups: Vec<BackupRecord>,
}

impl CleanReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub(crate) fn record_removed(&mut self, path: PathBuf, size: u64) {
        self.deleted += 1;
        self.bytes_freed += size;
        self.removed.push(path);
    }

    pub(crate) fn record_issue(&mut self, path: PathBuf, kind: IssueKind, reason: impl ToString) {
        if kind.is_failure() {
            self.failed += 1;
        } else {
            self.skipped += 1;
        }
        self.issues.push(ItemIssue {
            path,
            kind,
            reason: reason.to_string(),
        });
    }
}
