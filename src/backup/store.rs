use chrono::Utc;
use filetime::FileTime;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::Config;
use crate::duplicates::to_hex;
use crate::error::{Result, SweepError};
use crate::guard::{normalize_lexically, slash_relative};

use super::record::{blob_path_for, meta_path_for, BackupRecord};

/// Web-server deny file dropped into a new quarantine directory.
pub const DENY_FILE: &str = ".htaccess";

const DENY_CONTENT: &str = "deny from all\n";

/// Hex digits of the relative-path hash in blob names.
const PATH_HASH_LEN: usize = 16;

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PurgeReport {
    /// Blobs and orphaned files removed
    pub removed: usize,
    pub bytes: u64,
    pub failures: Vec<(PathBuf, String)>,
}

/// Quarantine directory holding copies of deleted files.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
    boundary: PathBuf,
}

impl BackupStore {
    /// Open the quarantine at `dir`, creating it owner-only if missing.
    pub fn open(dir: &Path, boundary: &Path) -> Result<Self> {
        let boundary = canonical_boundary(boundary)?;

        if !dir.exists() {
            create_private_dir(dir).map_err(|e| SweepError::io(dir, e))?;
            fs::write(dir.join(DENY_FILE), DENY_CONTENT)
                .map_err(|e| SweepError::io(dir.join(DENY_FILE), e))?;
            tracing::info!(dir = %dir.display(), "Created backup quarantine");
        }

        Self::attach(dir, boundary)
    }

    /// Open the quarantine at `dir` only if it already exists.
    pub fn existing(dir: &Path, boundary: &Path) -> Result<Option<Self>> {
        let boundary = canonical_boundary(boundary)?;
        if !dir.is_dir() {
            return Ok(None);
        }
        Self::attach(dir, boundary).map(Some)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(
            &config.resolve(&config.backup.dir),
            &config.paths.boundary_root,
        )
    }

    /// Like `from_config`, but never creates the quarantine.
    pub fn existing_from_config(config: &Config) -> Result<Option<Self>> {
        Self::existing(
            &config.resolve(&config.backup.dir),
            &config.paths.boundary_root,
        )
    }

    fn attach(dir: &Path, boundary: PathBuf) -> Result<Self> {
        let dir = dir.canonicalize().map_err(|e| SweepError::io(dir, e))?;
        Ok(Self { dir, boundary })
    }

    /// Canonical quarantine directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `path` into quarantine and write its sidecar.
    ///
    /// The backup is confirmed only when both blob and sidecar are on disk;
    /// on any failure partial artifacts are removed and an error returned.
    pub fn backup(&self, path: &Path) -> Result<BackupRecord> {
        let canonical = path
            .canonicalize()
            .map_err(|e| SweepError::backup(path, e))?;
        if canonical == self.boundary || !canonical.starts_with(&self.boundary) {
            return Err(SweepError::OutsideBoundary(canonical));
        }
        if canonical.starts_with(&self.dir) {
            return Err(SweepError::backup(&canonical, "file is already in quarantine"));
        }

        let metadata = fs::metadata(&canonical).map_err(|e| SweepError::backup(&canonical, e))?;
        if !metadata.is_file() {
            return Err(SweepError::backup(&canonical, "not a regular file"));
        }
        let mtime = metadata
            .modified()
            .map_err(|e| SweepError::backup(&canonical, e))?;

        let relative = slash_relative(&canonical, &self.boundary).unwrap_or_default();
        let file_name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let created_at = Utc::now();
        let stem = format!(
            "{}_{}",
            created_at.format("%Y%m%d-%H%M%S"),
            path_hash(&relative)
        );

        let (blob_path, mut blob) =
            self.create_blob(&stem, &file_name)
                .map_err(|e| SweepError::backup(&canonical, e))?;

        let record = BackupRecord {
            original_path: canonical.clone(),
            relative_path: PathBuf::from(&relative),
            blob_path: blob_path.clone(),
            created_at,
            size: metadata.len(),
            mtime,
        };

        let written = copy_into(&canonical, &mut blob)
            .and_then(|copied| {
                if copied == record.size {
                    Ok(())
                } else {
                    Err(io::Error::new(
                        ErrorKind::Other,
                        format!("copied {copied} of {} bytes", record.size),
                    ))
                }
            })
            .and_then(|()| write_sidecar(&record));

        if let Err(err) = written {
            let _ = fs::remove_file(&blob_path);
            let _ = fs::remove_file(record.meta_path());
            return Err(SweepError::backup(&canonical, err));
        }

        tracing::info!(
            path = %canonical.display(),
            blob = %blob_path.display(),
            size = record.size,
            "Backed up file"
        );
        Ok(record)
    }

    /// Backups newest first, at most `limit` when given.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<BackupRecord>> {
        let mut records = Vec::new();

        for meta in self.sidecars()? {
            match read_sidecar(&meta) {
                Ok(record) if record.blob_path.exists() => records.push(record),
                Ok(_) => {
                    tracing::debug!(meta = %meta.display(), "Sidecar without blob");
                }
                Err(err) => {
                    tracing::debug!(meta = %meta.display(), %err, "Unreadable sidecar");
                }
            }
        }

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.blob_path.cmp(&b.blob_path))
        });
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Look a backup up by blob file name.
    pub fn find(&self, blob_name: &str) -> Result<BackupRecord> {
        self.list(None)?
            .into_iter()
            .find(|r| r.blob_name() == blob_name)
            .ok_or_else(|| SweepError::BackupNotFound(blob_name.to_string()))
    }

    /// Copy a blob back to its original location and restore its mtime.
    ///
    /// Never overwrites an existing file.
    pub fn restore(&self, record: &BackupRecord) -> Result<PathBuf> {
        let target = normalize_lexically(&record.original_path);
        if target == self.boundary || !target.starts_with(&self.boundary) {
            return Err(SweepError::OutsideBoundary(target));
        }
        if normalize_lexically(&record.blob_path).parent() != Some(self.dir.as_path()) {
            return Err(restore_error(&target, "blob is not in the quarantine directory"));
        }

        let blob_len = fs::metadata(&record.blob_path)
            .map_err(|e| restore_error(&target, e))?
            .len();
        if blob_len != record.size {
            return Err(restore_error(
                &target,
                format!("blob holds {blob_len} bytes, expected {}", record.size),
            ));
        }
        if fs::symlink_metadata(&target).is_ok() {
            return Err(restore_error(&target, "a file already exists at this path"));
        }

        let parent = target
            .parent()
            .ok_or_else(|| restore_error(&target, "no parent directory"))?;
        fs::create_dir_all(parent).map_err(|e| restore_error(&target, e))?;
        let parent = parent
            .canonicalize()
            .map_err(|e| restore_error(&target, e))?;
        if !parent.starts_with(&self.boundary) {
            return Err(SweepError::OutsideBoundary(parent));
        }

        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| restore_error(&target, e))?;
        let copied = copy_into(&record.blob_path, &mut out);
        drop(out);

        match copied {
            Ok(n) if n == record.size => {}
            Ok(n) => {
                let _ = fs::remove_file(&target);
                return Err(restore_error(
                    &target,
                    format!("copied {n} of {} bytes", record.size),
                ));
            }
            Err(err) => {
                let _ = fs::remove_file(&target);
                return Err(restore_error(&target, err));
            }
        }

        filetime::set_file_mtime(&target, FileTime::from_system_time(record.mtime))
            .map_err(|e| restore_error(&target, e))?;

        tracing::info!(
            path = %target.display(),
            blob = %record.blob_path.display(),
            "Restored file"
        );
        Ok(target)
    }

    /// Delete backups created more than `older_than` ago.
    pub fn purge(&self, older_than: Duration) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();
        let Some(cutoff) = SystemTime::now().checked_sub(older_than) else {
            return Ok(report);
        };

        let mut claimed: Vec<PathBuf> = Vec::new();
        for meta in self.sidecars()? {
            let blob = blob_path_for(&meta).unwrap_or_default();
            claimed.push(blob.clone());

            let created = match read_sidecar(&meta) {
                Ok(record) => SystemTime::from(record.created_at),
                Err(_) => match file_mtime(&meta) {
                    Some(t) => t,
                    None => continue,
                },
            };
            if created >= cutoff {
                continue;
            }

            let size = fs::metadata(&blob).map(|m| m.len()).unwrap_or(0);
            match remove_if_present(&blob).and_then(|()| remove_if_present(&meta)) {
                Ok(()) => {
                    report.removed += 1;
                    report.bytes += size;
                }
                Err(err) => report.failures.push((blob, err.to_string())),
            }
        }

        let entries = self.entries()?;
        for path in &entries {
            if is_deny_file(path) || is_sidecar(path, &entries) || claimed.contains(path) {
                continue;
            }
            if file_mtime(path).is_some_and(|t| t < cutoff) {
                let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                match fs::remove_file(path) {
                    Ok(()) => {
                        report.removed += 1;
                        report.bytes += size;
                    }
                    Err(err) => report.failures.push((path.clone(), err.to_string())),
                }
            }
        }

        tracing::info!(
            removed = report.removed,
            bytes = report.bytes,
            failures = report.failures.len(),
            "Purged old backups"
        );
        Ok(report)
    }

    /// Bytes held in blobs.
    pub fn total_size(&self) -> Result<u64> {
        let entries = self.entries()?;
        Ok(entries
            .iter()
            .filter(|p| !is_deny_file(p) && !is_sidecar(p, &entries))
            .map(|p| fs::metadata(p).map(|m| m.len()).unwrap_or(0))
            .sum())
    }

    fn create_blob(&self, stem: &str, file_name: &str) -> io::Result<(PathBuf, File)> {
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{stem}_{file_name}")
            } else {
                format!("{stem}-{attempt}_{file_name}")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists && attempt < 1000 => {
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Regular files directly inside the quarantine, sorted by name.
    fn entries(&self) -> Result<Vec<PathBuf>> {
        let read_dir = fs::read_dir(&self.dir).map_err(|e| SweepError::io(&self.dir, e))?;
        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn sidecars(&self) -> Result<Vec<PathBuf>> {
        let entries = self.entries()?;
        Ok(entries
            .iter()
            .filter(|p| is_sidecar(p, &entries))
            .cloned()
            .collect())
    }
}

fn canonical_boundary(boundary: &Path) -> Result<PathBuf> {
    boundary
        .canonicalize()
        .map_err(|source| SweepError::BoundaryUnresolvable {
            path: boundary.to_path_buf(),
            source,
        })
}

fn create_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

/// Whether `path` is a sidecar rather than a blob.
///
/// A blob whose own name ends in the sidecar suffix still has a sidecar of
/// its own beside it, which tells the two apart. `entries` must be sorted.
fn is_sidecar(path: &Path, entries: &[PathBuf]) -> bool {
    blob_path_for(path).is_some() && entries.binary_search(&meta_path_for(path)).is_err()
}

fn is_deny_file(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == DENY_FILE)
}

fn path_hash(relative: &str) -> String {
    let digest = Sha256::digest(relative.as_bytes());
    to_hex(&digest)[..PATH_HASH_LEN].to_string()
}

fn copy_into(src: &Path, dst: &mut File) -> io::Result<u64> {
    let mut input = File::open(src)?;
    let copied = io::copy(&mut input, dst)?;
    dst.flush()?;
    dst.sync_all()?;
    Ok(copied)
}

fn write_sidecar(record: &BackupRecord) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(record)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(record.meta_path())?;
    file.write_all(&json)?;
    file.sync_all()
}

fn read_sidecar(meta: &Path) -> io::Result<BackupRecord> {
    let content = fs::read(meta)?;
    Ok(serde_json::from_slice(&content)?)
}

fn file_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn restore_error(path: &Path, reason: impl ToString) -> SweepError {
    SweepError::Restore {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DAY: u64 = 86_400;

    fn setup() -> (TempDir, BackupStore) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("site/uploads")).unwrap();
        let store = BackupStore::open(&tmp.path().join("site/quarantine"), &tmp.path().join("site"))
            .unwrap();
        (tmp, store)
    }

    fn aged_file(path: &Path, content: &str, days: u64) {
        fs::write(path, content).unwrap();
        let when = SystemTime::now() - Duration::from_secs(days * DAY);
        filetime::set_file_mtime(path, FileTime::from_system_time(when)).unwrap();
    }

    #[test]
    fn open_creates_restricted_quarantine() {
        let (_tmp, store) = setup();
        assert!(store.dir().is_dir());
        assert_eq!(
            fs::read_to_string(store.dir().join(DENY_FILE)).unwrap(),
            DENY_CONTENT
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.dir()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn backup_copies_bytes_and_writes_sidecar() {
        let (tmp, store) = setup();
        let file = tmp.path().join("site/uploads/photo.jpg");
        aged_file(&file, "jpeg bytes", 40);

        let record = store.backup(&file).unwrap();

        assert_eq!(fs::read(&record.blob_path).unwrap(), b"jpeg bytes");
        assert!(record.meta_path().exists());
        assert_eq!(record.relative_path, PathBuf::from("uploads/photo.jpg"));
        assert_eq!(record.size, 10);
        assert!(record.blob_name().ends_with("_photo.jpg"));
        // the original is untouched
        assert!(file.exists());
    }

    #[test]
    fn blob_names_are_unique_per_backup() {
        let (tmp, store) = setup();
        let file = tmp.path().join("site/uploads/a.tmp");
        fs::write(&file, "x").unwrap();

        let first = store.backup(&file).unwrap();
        let second = store.backup(&file).unwrap();
        assert_ne!(first.blob_path, second.blob_path);
    }

    #[test]
    fn backup_rejects_outside_boundary() {
        let (tmp, store) = setup();
        let outside = tmp.path().join("elsewhere.txt");
        fs::write(&outside, "x").unwrap();

        assert!(matches!(
            store.backup(&outside),
            Err(SweepError::OutsideBoundary(_))
        ));
    }

    #[test]
    fn backup_of_missing_file_fails() {
        let (tmp, store) = setup();
        assert!(matches!(
            store.backup(&tmp.path().join("site/uploads/gone")),
            Err(SweepError::Backup { .. })
        ));
    }

    #[test]
    fn restore_reproduces_content_and_mtime() {
        let (tmp, store) = setup();
        let file = tmp.path().join("site/uploads/2019/photo.jpg");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        aged_file(&file, "original bytes", 400);
        let before = fs::metadata(&file).unwrap().modified().unwrap();

        let record = store.backup(&file).unwrap();
        fs::remove_file(&file).unwrap();
        fs::remove_dir(file.parent().unwrap()).unwrap();

        let restored = store.restore(&record).unwrap();
        assert_eq!(fs::read(&restored).unwrap(), b"original bytes");
        assert_eq!(fs::metadata(&restored).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn restore_refuses_to_overwrite() {
        let (tmp, store) = setup();
        let file = tmp.path().join("site/uploads/keep.txt");
        fs::write(&file, "v1").unwrap();
        let record = store.backup(&file).unwrap();
        fs::write(&file, "v2").unwrap();

        assert!(matches!(store.restore(&record), Err(SweepError::Restore { .. })));
        assert_eq!(fs::read_to_string(&file).unwrap(), "v2");
    }

    #[test]
    fn restore_rejects_tampered_destination() {
        let (tmp, store) = setup();
        let file = tmp.path().join("site/uploads/a.txt");
        fs::write(&file, "x").unwrap();
        let mut record = store.backup(&file).unwrap();
        record.original_path = tmp.path().join("site/../escaped.txt");

        assert!(matches!(
            store.restore(&record),
            Err(SweepError::OutsideBoundary(_))
        ));
    }

    #[test]
    fn list_and_find() {
        let (tmp, store) = setup();
        for name in ["a.tmp", "b.tmp", "c.tmp"] {
            let file = tmp.path().join("site/uploads").join(name);
            fs::write(&file, name).unwrap();
            store.backup(&file).unwrap();
        }

        let all = store.list(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(store.list(Some(2)).unwrap().len(), 2);

        let name = all[0].blob_name();
        assert_eq!(store.find(&name).unwrap(), all[0]);
        assert!(matches!(
            store.find("nope"),
            Err(SweepError::BackupNotFound(_))
        ));
    }

    #[test]
    fn purge_respects_retention() {
        let (tmp, store) = setup();
        let file = tmp.path().join("site/uploads/a.tmp");
        fs::write(&file, "abc").unwrap();
        let record = store.backup(&file).unwrap();

        let kept = store.purge(Duration::from_secs(30 * DAY)).unwrap();
        assert_eq!(kept.removed, 0);
        assert!(record.blob_path.exists());

        let mut old = record.clone();
        old.created_at = Utc::now() - chrono::Duration::days(45);
        fs::write(record.meta_path(), serde_json::to_vec(&old).unwrap()).unwrap();

        let purged = store.purge(Duration::from_secs(30 * DAY)).unwrap();
        assert_eq!(purged.removed, 1);
        assert_eq!(purged.bytes, 3);
        assert!(!record.blob_path.exists());
        assert!(!record.meta_path().exists());
        assert!(store.dir().join(DENY_FILE).exists());
    }

    #[test]
    fn purge_removes_old_orphans() {
        let (_tmp, store) = setup();
        let orphan = store.dir().join("stray.bin");
        aged_file(&orphan, "zz", 60);

        let report = store.purge(Duration::from_secs(30 * DAY)).unwrap();
        assert_eq!(report.removed, 1);
        assert!(!orphan.exists());
    }

    #[test]
    fn existing_never_creates_the_quarantine() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        fs::create_dir_all(&site).unwrap();
        let dir = site.join("quarantine");

        assert!(BackupStore::existing(&dir, &site).unwrap().is_none());
        assert!(!dir.exists());

        BackupStore::open(&dir, &site).unwrap();
        let store = BackupStore::existing(&dir, &site).unwrap().unwrap();
        assert_eq!(store.dir(), dir.canonicalize().unwrap());
    }

    #[test]
    fn blobs_named_like_sidecars_are_still_blobs() {
        let (tmp, store) = setup();
        let file = tmp.path().join("site/uploads/export.meta.json");
        fs::write(&file, "{}").unwrap();
        let record = store.backup(&file).unwrap();
        assert!(record.blob_name().ends_with("_export.meta.json"));

        let listed = store.list(None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].blob_path, record.blob_path);
        assert_eq!(store.total_size().unwrap(), 2);

        let mut old = record.clone();
        old.created_at = Utc::now() - chrono::Duration::days(45);
        fs::write(record.meta_path(), serde_json::to_vec(&old).unwrap()).unwrap();

        let purged = store.purge(Duration::from_secs(30 * DAY)).unwrap();
        assert_eq!(purged.removed, 1);
        assert_eq!(purged.bytes, 2);
        assert!(!record.blob_path.exists());
        assert!(!record.meta_path().exists());
    }

    #[test]
    fn total_size_counts_blobs_only() {
        let (tmp, store) = setup();
        let file = tmp.path().join("site/uploads/a.tmp");
        fs::write(&file, "12345").unwrap();
        store.backup(&file).unwrap();

        assert_eq!(store.total_size().unwrap(), 5);
    }
}
