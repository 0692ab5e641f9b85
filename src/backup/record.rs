use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Suffix of the sidecar metadata file written beside each blob.
pub const META_SUFFIX: &str = ".meta.json";

/// A file copied into quarantine before deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Where the file lived
    pub original_path: PathBuf,

    /// Original path below the boundary root
    pub relative_path: PathBuf,

    /// Copy inside the quarantine directory
    pub blob_path: PathBuf,

    pub created_at: DateTime<Utc>,

    pub size: u64,

    /// Modification time of the original, restored on restore
    pub mtime: SystemTime,
}

impl BackupRecord {
    /// File name of the blob, used to address a backup from the CLI.
    pub fn blob_name(&self) -> String {
        self.blob_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn meta_path(&self) -> PathBuf {
        meta_path_for(&self.blob_path)
    }
}

/// Sidecar path for a blob.
pub fn meta_path_for(blob: &Path) -> PathBuf {
    let mut os: OsString = blob.as_os_str().to_owned();
    os.push(META_SUFFIX);
    PathBuf::from(os)
}

/// Blob path for a sidecar, if `meta` is one.
pub fn blob_path_for(meta: &Path) -> Option<PathBuf> {
    let name = meta.file_name()?.to_str()?;
    let blob = name.strip_suffix(META_SUFFIX)?;
    (!blob.is_empty()).then(|| meta.with_file_name(blob))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_paths_round_trip() {
        let blob = Path::new("/q/20240101-000000_abcd_photo.jpg");
        let meta = meta_path_for(blob);
        assert_eq!(
            meta,
            PathBuf::from("/q/20240101-000000_abcd_photo.jpg.meta.json")
        );
        assert_eq!(blob_path_for(&meta).as_deref(), Some(blob));
    }

    #[test]
    fn non_sidecar_has_no_blob() {
        assert!(blob_path_for(Path::new("/q/photo.jpg")).is_none());
        assert!(blob_path_for(Path::new("/q/.meta.json")).is_none());
    }

    #[test]
    fn record_serializes_to_json() {
        let record = BackupRecord {
            original_path: PathBuf::from("/site/a.tmp"),
            relative_path: PathBuf::from("a.tmp"),
            blob_path: PathBuf::from("/q/x_a.tmp"),
            created_at: Utc::now(),
            size: 3,
            mtime: SystemTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: BackupRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.blob_name(), "x_a.tmp");
        assert_eq!(back.original_path, record.original_path);
    }
}
