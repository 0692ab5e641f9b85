use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

use crate::guard::{resolve_best_effort, slash_relative, PathGuard};

use super::classify::classify;
use super::options::ScanOptions;
use super::record::{Category, FileRecord, ScanReport};

/// Walks the configured roots and classifies what it finds.
pub struct TreeScanner<'g> {
    guard: &'g PathGuard,
    options: ScanOptions,
    skip_dirs: Vec<PathBuf>,
}

/// Working state of a single scan, folded into a `ScanReport` at the end.
#[derive(Default)]
struct Tally {
    categories: BTreeMap<Category, Vec<FileRecord>>,
    empty_dirs: Vec<PathBuf>,
    files_seen: usize,
    total_files: u64,
    total_size: u64,
    next_ordinal: usize,
}

impl Tally {
    fn push(&mut self, mut record: FileRecord) {
        record.ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.categories.entry(record.category).or_default().push(record);
    }

    fn into_report(self, roots: Vec<PathBuf>, truncated: bool) -> ScanReport {
        ScanReport {
            categories: self.categories,
            empty_dirs: self.empty_dirs,
            total_files: self.total_files,
            total_size: self.total_size,
            roots,
            truncated,
        }
    }
}

impl<'g> TreeScanner<'g> {
    pub fn new(guard: &'g PathGuard, options: ScanOptions) -> Self {
        let skip_dirs = options
            .skip_dirs
            .iter()
            .map(|d| {
                if d.is_absolute() {
                    resolve_best_effort(d)
                } else {
                    resolve_best_effort(&guard.boundary().join(d))
                }
            })
            .collect();

        Self {
            guard,
            options,
            skip_dirs,
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Walk every root and return an immutable snapshot.
    ///
    /// Unreadable entries are skipped. Hitting the file cap returns a partial
    /// report with `truncated` set.
    pub fn scan(&self) -> ScanReport {
        let now = SystemTime::now();
        let mut tally = Tally::default();
        let mut roots = Vec::new();
        let mut truncated = false;

        for rel in &self.options.roots {
            let Some(root) = self.resolve_root(rel) else {
                continue;
            };
            roots.push(root.clone());

            if !self.walk_root(&root, now, &mut tally) {
                tracing::warn!(
                    limit = self.options.max_files,
                    root = %root.display(),
                    "File limit reached, returning partial scan"
                );
                truncated = true;
                break;
            }
        }

        tracing::info!(
            files = tally.total_files,
            bytes = tally.total_size,
            empty_dirs = tally.empty_dirs.len(),
            truncated,
            "Scan complete"
        );
        tally.into_report(roots, truncated)
    }

    fn resolve_root(&self, rel: &Path) -> Option<PathBuf> {
        let root = match self.guard.boundary().join(rel).canonicalize() {
            Ok(r) => r,
            Err(err) => {
                tracing::debug!(root = %rel.display(), %err, "Scan root not available");
                return None;
            }
        };
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "Scan root is not a directory");
            return None;
        }
        // the boundary itself may be walked; its entries are checked one by one
        if root != self.guard.boundary() {
            if !self.guard.contains(&root) {
                tracing::warn!(root = %root.display(), "Scan root resolves outside boundary");
                return None;
            }
            if let Some(reason) = self.guard.protection(&root).filter(|p| p.is_critical()) {
                tracing::warn!(root = %root.display(), %reason, "Scan root is protected");
                return None;
            }
        }
        if self.is_skipped(&root) {
            return None;
        }
        Some(root)
    }

    /// Walk one root. Returns false when the file cap stopped the walk.
    fn walk_root(&self, root: &Path, now: SystemTime, tally: &mut Tally) -> bool {
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.options.max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.admits(entry));

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!(path = ?err.path(), %err, "Skipping unreadable entry");
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                self.visit_dir(entry.path(), tally);
            } else if file_type.is_file() {
                if tally.files_seen >= self.options.max_files {
                    return false;
                }
                tally.files_seen += 1;
                self.visit_file(&entry, now, tally);
            }
        }
        true
    }

    /// Whether the walk may enter `entry` (and, for directories, its subtree).
    fn admits(&self, entry: &DirEntry) -> bool {
        let path = entry.path();
        if self.options.is_excluded(&path.to_string_lossy()) {
            tracing::debug!(path = %path.display(), "Excluded");
            return false;
        }
        if self.is_skipped(path) {
            return false;
        }
        if entry.file_type().is_dir() {
            if let Some(reason) = self.guard.protection(path).filter(|p| p.is_critical()) {
                tracing::debug!(path = %path.display(), %reason, "Skipping protected directory");
                return false;
            }
        }
        true
    }

    fn is_skipped(&self, path: &Path) -> bool {
        self.skip_dirs.iter().any(|d| path.starts_with(d))
    }

    fn visit_dir(&self, path: &Path, tally: &mut Tally) {
        let is_empty = match fs::read_dir(path) {
            Ok(mut entries) => entries.next().is_none(),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "Cannot read directory");
                return;
            }
        };
        if is_empty && !self.guard.is_protected_directory(path) {
            tally.empty_dirs.push(path.to_path_buf());
        }
    }

    fn visit_file(&self, entry: &DirEntry, now: SystemTime, tally: &mut Tally) {
        let path = entry.path();

        if self.guard.is_content_protected(path) {
            tracing::debug!(path = %path.display(), "Skipping protected content");
            return;
        }

        let protection = self.guard.protection(path);
        if let Some(reason) = protection.as_ref().filter(|p| p.is_critical()) {
            tracing::debug!(path = %path.display(), %reason, "Skipping protected file");
            return;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "Cannot stat file");
                return;
            }
        };
        let mtime = match metadata.modified() {
            Ok(t) => t,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "No modification time");
                return;
            }
        };
        let size = metadata.len();

        tally.total_files += 1;
        tally.total_size += size;

        let Some(relative) = slash_relative(path, self.guard.boundary()) else {
            return;
        };
        let age = now.duration_since(mtime).unwrap_or_default();

        if let Some(category) = classify(&relative, size, age, self.options.min_age) {
            tally.push(FileRecord {
                path: path.to_path_buf(),
                size,
                mtime,
                category,
                ordinal: 0,
                protected: protection.is_some(),
            });
        }
    }
}
