//! Deletion of scanned candidates.
//!
//! Every item is re-validated against the filesystem and the guard right
//! before it is touched. Nothing the scan reported is trusted blindly.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::backup::BackupStore;
use crate::duplicates::DuplicateGroup;
use crate::error::{Result, SweepError};
use crate::guard::PathGuard;
use crate::scanner::{Category, FileRecord, ScanReport};

use super::report::{CleanReport, IssueKind};

/// Deletes files and empty directories, optionally backing files up first.
pub struct Cleaner<'a> {
    guard: &'a PathGuard,
    backups: Option<&'a BackupStore>,
    dry_run: bool,
}

impl<'a> Cleaner<'a> {
    pub fn new(guard: &'a PathGuard) -> Self {
        Self {
            guard,
            backups: None,
            dry_run: false,
        }
    }

    /// Run every check but leave the filesystem untouched.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Copy each file into `store` before deleting it.
    pub fn with_backups(mut self, store: &'a BackupStore) -> Self {
        self.backups = Some(store);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Delete the given files.
    pub fn clean_files(&self, records: &[FileRecord]) -> CleanReport {
        let mut report = CleanReport::new(self.dry_run);
        for record in records {
            self.clean_file(record, &mut report);
        }
        self.log_summary("files", &report);
        report
    }

    /// Delete every file of one category.
    ///
    /// Categories kept for manual review are rejected before anything is
    /// touched.
    pub fn clean_category(&self, scan: &ScanReport, category: Category) -> Result<CleanReport> {
        if !category.is_bulk_eligible() {
            return Err(SweepError::NotBulkEligible(category));
        }
        Ok(self.clean_files(scan.records(category)))
    }

    /// Delete all but the first member of each group.
    pub fn clean_duplicates(&self, groups: &[DuplicateGroup]) -> CleanReport {
        let mut report = CleanReport::new(self.dry_run);
        for group in groups {
            for record in group.redundant() {
                self.clean_file(record, &mut report);
            }
        }
        self.log_summary("duplicates", &report);
        report
    }

    /// Remove directories that are still empty.
    pub fn clean_empty_dirs(&self, dirs: &[PathBuf]) -> CleanReport {
        let mut report = CleanReport::new(self.dry_run);
        for dir in dirs {
            self.clean_dir(dir, &mut report);
        }
        self.log_summary("empty directories", &report);
        report
    }

    fn clean_file(&self, record: &FileRecord, report: &mut CleanReport) {
        report.processed += 1;
        let path = &record.path;

        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                report.record_issue(path.clone(), IssueKind::Missing, "no longer exists");
                return;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "Cannot stat file");
                report.record_issue(path.clone(), IssueKind::DeletionFailed, err);
                return;
            }
        };
        if !metadata.is_file() {
            report.record_issue(path.clone(), IssueKind::Changed, "no longer a regular file");
            return;
        }

        let canonical = match path.canonicalize() {
            Ok(c) => c,
            Err(err) => {
                report.record_issue(path.clone(), IssueKind::Missing, err);
                return;
            }
        };
        if canonical != *path {
            report.record_issue(
                path.clone(),
                IssueKind::Changed,
                format!("now resolves to {}", canonical.display()),
            );
            return;
        }
        if !self.guard.contains(&canonical) {
            tracing::warn!(path = %path.display(), "Refusing path outside boundary");
            report.record_issue(path.clone(), IssueKind::OutsideBoundary, "outside boundary root");
            return;
        }
        if let Some(reason) = self.guard.protection(&canonical) {
            tracing::warn!(path = %path.display(), %reason, "Refusing protected file");
            report.record_issue(path.clone(), IssueKind::ProtectionViolation, reason);
            return;
        }

        let unchanged = metadata.len() == record.size
            && metadata.modified().map(|t| t == record.mtime).unwrap_or(false);
        if !unchanged {
            report.record_issue(path.clone(), IssueKind::Changed, "modified since scan");
            return;
        }

        if self.dry_run {
            report.record_removed(path.clone(), record.size);
            return;
        }

        let backup = match self.backups {
            Some(store) => match store.backup(path) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "Backup failed, keeping file");
                    report.record_issue(path.clone(), IssueKind::BackupFailed, err);
                    return;
                }
            },
            None => None,
        };

        if let Err(err) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), %err, "Failed to delete file");
            report.record_issue(path.clone(), IssueKind::DeletionFailed, err);
            // the backup of a file that survived is still a valid copy
            report.backups.extend(backup);
            return;
        }

        tracing::info!(
            path = %path.display(),
            size = record.size,
            category = %record.category,
            backup = %backup.as_ref().map(|b| b.blob_name()).unwrap_or_default(),
            "Deleted file"
        );
        report.record_removed(path.clone(), record.size);
        report.backups.extend(backup);
    }

    fn clean_dir(&self, dir: &Path, report: &mut CleanReport) {
        report.processed += 1;

        let metadata = match fs::symlink_metadata(dir) {
            Ok(m) => m,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                report.record_issue(dir.to_path_buf(), IssueKind::Missing, "no longer exists");
                return;
            }
            Err(err) => {
                report.record_issue(dir.to_path_buf(), IssueKind::DeletionFailed, err);
                return;
            }
        };
        if !metadata.is_dir() {
            report.record_issue(dir.to_path_buf(), IssueKind::Changed, "no longer a directory");
            return;
        }

        let inside = dir
            .canonicalize()
            .map(|c| self.guard.contains(&c))
            .unwrap_or(false);
        if !inside {
            report.record_issue(dir.to_path_buf(), IssueKind::OutsideBoundary, "outside boundary root");
            return;
        }
        if self.guard.is_protected_directory(dir) {
            tracing::warn!(path = %dir.display(), "Refusing protected directory");
            report.record_issue(
                dir.to_path_buf(),
                IssueKind::ProtectionViolation,
                "protected directory",
            );
            return;
        }

        let still_empty = fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !still_empty {
            report.record_issue(dir.to_path_buf(), IssueKind::NotEmpty, "directory has entries");
            return;
        }

        if self.dry_run {
            report.record_removed(dir.to_path_buf(), 0);
            return;
        }

        match fs::remove_dir(dir) {
            Ok(()) => {
                tracing::info!(path = %dir.display(), "Removed empty directory");
                report.record_removed(dir.to_path_buf(), 0);
            }
            Err(err) => {
                tracing::warn!(path = %dir.display(), %err, "Failed to remove directory");
                report.record_issue(dir.to_path_buf(), IssueKind::DeletionFailed, err);
            }
        }
    }

    fn log_summary(&self, what: &str, report: &CleanReport) {
        tracing::info!(
            dry_run = self.dry_run,
            deleted = report.deleted,
            skipped = report.skipped,
            failed = report.failed,
            bytes = report.bytes_freed,
            "Cleaned {what}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::DuplicateDetector;
    use crate::scanner::{ScanOptions, TreeScanner};
    use filetime::FileTime;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const DAY: u64 = 86_400;

    fn write_aged(path: &Path, content: &str, days: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        let when = SystemTime::now() - Duration::from_secs(days * DAY);
        filetime::set_file_mtime(path, FileTime::from_system_time(when)).unwrap();
    }

    fn create_test_site() -> (TempDir, PathGuard) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_aged(&root.join("wp-includes/version.php"), "<?php", 400);
        write_aged(&root.join("wp-content/upgrade/one.dat"), "0123456789", 60);
        write_aged(&root.join("wp-content/upgrade/two.dat"), "0123456789", 60);
        write_aged(&root.join("wp-content/upgrade/three.dat"), "0123456789", 60);
        write_aged(&root.join("wp-content/upgrade/scratch.tmp"), "tmp", 1);
        fs::create_dir_all(root.join("wp-content/upgrade/hollow")).unwrap();

        let guard = PathGuard::new(root).unwrap();
        (tmp, guard)
    }

    fn scan(guard: &PathGuard) -> ScanReport {
        let options = ScanOptions::new()
            .with_roots(vec![PathBuf::from("wp-content/upgrade")])
            .with_min_age(Duration::from_secs(30 * DAY));
        TreeScanner::new(guard, options).scan()
    }

    fn open_store(tmp: &TempDir) -> BackupStore {
        BackupStore::open(&tmp.path().join("wp-content/quarantine"), tmp.path()).unwrap()
    }

    #[test]
    fn test_duplicates_deleted_with_backup() {
        let (tmp, guard) = create_test_site();
        let store = open_store(&tmp);
        let report = scan(&guard);
        let dupes = DuplicateDetector::new(1024).detect(&report);
        assert_eq!(dupes.groups.len(), 1);
        assert_eq!(dupes.groups[0].members().len(), 3);

        let keep = dupes.groups[0].keep().path.clone();
        let result = Cleaner::new(&guard)
            .with_backups(&store)
            .clean_duplicates(&dupes.groups);

        assert_eq!(result.deleted, 2);
        assert_eq!(result.bytes_freed, 20);
        assert_eq!(result.backups.len(), 2);
        assert!(keep.exists());
        for path in &result.removed {
            assert!(!path.exists());
        }
        for backup in &result.backups {
            assert_eq!(fs::read(&backup.blob_path).unwrap(), b"0123456789");
        }
    }

    #[test]
    fn test_dry_run_leaves_files() {
        let (_tmp, guard) = create_test_site();
        let report = scan(&guard);
        let records = report.records(Category::Temp);

        let dry = Cleaner::new(&guard).dry_run(true).clean_files(records);
        assert!(dry.dry_run);
        assert_eq!(dry.deleted, 1);
        assert!(records[0].path.exists());

        let live = Cleaner::new(&guard).clean_files(records);
        assert_eq!(dry.removed, live.removed);
        assert_eq!(dry.bytes_freed, live.bytes_freed);
        assert!(!records[0].path.exists());
    }

    #[test]
    fn test_clean_category_rejects_uncategorized() {
        let (_tmp, guard) = create_test_site();
        let report = scan(&guard);

        let result = Cleaner::new(&guard).clean_category(&report, Category::UncategorizedOld);
        assert!(matches!(
            result,
            Err(SweepError::NotBulkEligible(Category::UncategorizedOld))
        ));
    }

    #[test]
    fn test_clean_category_old() {
        let (_tmp, guard) = create_test_site();
        let report = scan(&guard);

        let result = Cleaner::new(&guard)
            .clean_category(&report, Category::Old)
            .unwrap();
        assert_eq!(result.deleted, 3);
        assert_eq!(result.failed, 0);
    }

    #[test]
    fn test_missing_and_changed_files_are_skipped() {
        let (_tmp, guard) = create_test_site();
        let report = scan(&guard);
        let records = report.records(Category::Old).to_vec();

        fs::remove_file(&records[0].path).unwrap();
        fs::write(&records[1].path, "different length").unwrap();

        let result = Cleaner::new(&guard).clean_files(&records);
        assert_eq!(result.processed, 3);
        assert_eq!(result.deleted, 1);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.failed, 0);
        assert_eq!(result.issues[0].kind, IssueKind::Missing);
        assert_eq!(result.issues[1].kind, IssueKind::Changed);
        assert!(records[1].path.exists());
    }

    #[test]
    fn test_protected_file_is_refused() {
        let (tmp, guard) = create_test_site();
        let path = tmp.path().join("wp-includes/version.php");
        let metadata = fs::metadata(&path).unwrap();
        let record = FileRecord {
            path: path.canonicalize().unwrap(),
            size: metadata.len(),
            mtime: metadata.modified().unwrap(),
            category: Category::Old,
            ordinal: 0,
            protected: false,
        };

        let result = Cleaner::new(&guard).clean_files(&[record]);
        assert_eq!(result.failed, 1);
        assert_eq!(result.issues[0].kind, IssueKind::ProtectionViolation);
        assert!(path.exists());
    }

    #[test]
    fn test_outside_boundary_is_refused() {
        let outer = TempDir::new().unwrap();
        let site = outer.path().join("site");
        fs::create_dir(&site).unwrap();
        let stray = outer.path().join("stray.tmp");
        write_aged(&stray, "x", 60);
        let guard = PathGuard::new(&site).unwrap();
        let metadata = fs::metadata(&stray).unwrap();
        let record = FileRecord {
            path: stray.canonicalize().unwrap(),
            size: 1,
            mtime: metadata.modified().unwrap(),
            category: Category::Temp,
            ordinal: 0,
            protected: false,
        };

        let result = Cleaner::new(&guard).clean_files(&[record]);
        assert_eq!(result.issues[0].kind, IssueKind::OutsideBoundary);
        assert!(stray.exists());
    }

    #[test]
    fn test_backup_failure_keeps_file() {
        let (tmp, guard) = create_test_site();
        let store = open_store(&tmp);
        let report = scan(&guard);
        let records = report.records(Category::Temp);

        // a non-directory where the quarantine should be makes every copy fail
        fs::remove_dir_all(store.dir()).unwrap();
        fs::write(store.dir(), "not a directory").unwrap();

        let result = Cleaner::new(&guard).with_backups(&store).clean_files(records);
        assert_eq!(result.failed, 1);
        assert_eq!(result.issues[0].kind, IssueKind::BackupFailed);
        assert!(records[0].path.exists());
    }

    #[test]
    fn test_empty_dirs_removed_only_when_still_empty() {
        let (_tmp, guard) = create_test_site();
        let report = scan(&guard);
        assert_eq!(report.empty_dirs.len(), 1);

        let dir = report.empty_dirs[0].clone();
        fs::write(dir.join("late.txt"), "arrived").unwrap();
        let result = Cleaner::new(&guard).clean_empty_dirs(&report.empty_dirs);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.issues[0].kind, IssueKind::NotEmpty);
        assert!(dir.exists());

        fs::remove_file(dir.join("late.txt")).unwrap();
        let result = Cleaner::new(&guard).clean_empty_dirs(&report.empty_dirs);
        assert_eq!(result.deleted, 1);
        assert!(!dir.exists());
    }

    #[test]
    fn test_protected_directory_is_refused() {
        let (tmp, guard) = create_test_site();
        let dir = tmp.path().join("wp-includes/empty");
        fs::create_dir(&dir).unwrap();

        let result = Cleaner::new(&guard).clean_empty_dirs(&[dir.clone()]);
        assert_eq!(result.issues[0].kind, IssueKind::ProtectionViolation);
        assert!(dir.exists());
    }
}
