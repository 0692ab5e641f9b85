use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::guard::{normalize_lexically, resolve_best_effort};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub scan: ScanConfig,
    pub protection: ProtectionConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory tree outside of which nothing is ever touched
    pub boundary_root: PathBuf,
    /// Directories to scan, relative to the boundary root
    pub scan_roots: Vec<PathBuf>,
    /// Substrings that exclude a path (and its subtree) from the walk
    pub exclude_patterns: Vec<String>,
    /// Installation directory of this tool, never scanned
    pub self_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum age in days before a file counts as old
    pub min_age_days: u32,
    /// Hard cap on directory nesting below each scan root
    pub max_depth: usize,
    /// Soft cap on files visited per scan
    pub max_files: usize,
    /// Files above this size (MiB) are not fingerprinted
    pub max_duplicate_size_mb: u64,
    /// Run duplicate detection after the walk
    pub detect_duplicates: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Additional protected paths, relative to the boundary root or absolute
    pub extra_paths: Vec<PathBuf>,
    /// Additional protected regex patterns
    pub extra_patterns: Vec<String>,
    /// Directories of currently active deployment units (plugins, themes)
    pub active_units: Vec<PathBuf>,
    /// Uploads area subject to the recency window
    pub uploads_dir: PathBuf,
    /// Uploads modified within this many days are protected
    pub recent_upload_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Copy files into quarantine before deleting them
    pub enabled: bool,
    /// Quarantine directory, relative to the boundary root or absolute
    pub dir: PathBuf,
    /// Backups older than this many days are purged
    pub retention_days: u32,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            boundary_root: PathBuf::from("."),
            scan_roots: vec![
                PathBuf::from("wp-content/uploads"),
                PathBuf::from("wp-content/cache"),
                PathBuf::from("wp-content/backups"),
                PathBuf::from("wp-content/upgrade"),
            ],
            exclude_patterns: vec![],
            self_dir: None,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_age_days: 30,
            max_depth: 20,
            max_files: 100_000,
            max_duplicate_size_mb: 10,
            detect_duplicates: true,
        }
    }
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            extra_paths: vec![],
            extra_patterns: vec![],
            active_units: vec![],
            uploads_dir: PathBuf::from("wp-content/uploads"),
            recent_upload_days: 30,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("wp-content/rootsweep-backups"),
            retention_days: 30,
        }
    }
}

impl ScanConfig {
    pub fn min_age(&self) -> Duration {
        Duration::from_secs(u64::from(self.min_age_days) * SECS_PER_DAY)
    }

    pub fn max_duplicate_size(&self) -> u64 {
        self.max_duplicate_size_mb.saturating_mul(1024 * 1024)
    }
}

impl ProtectionConfig {
    pub fn recent_window(&self) -> Duration {
        Duration::from_secs(u64::from(self.recent_upload_days) * SECS_PER_DAY)
    }
}

impl BackupConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_days) * SECS_PER_DAY)
    }
}

impl Config {
    /// Load configuration from `path`, or from the user config directory.
    ///
    /// An explicit path must exist. Without one, a missing default file
    /// yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ParseError {
                path: path.clone(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Default config file location (`~/.config/rootsweep/config.toml` on Linux)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("rootsweep").join("config.toml"))
    }

    /// Resolve a configured path against the boundary root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.boundary_root.join(path)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.scan_roots.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one scan root is required".into(),
            ));
        }
        let boundary = self
            .paths
            .boundary_root
            .canonicalize()
            .unwrap_or_else(|_| normalize_lexically(&self.paths.boundary_root));
        let anchor = |path: &Path| {
            if path.is_absolute() {
                resolve_best_effort(path)
            } else {
                resolve_best_effort(&boundary.join(path))
            }
        };
        let backup_dir = anchor(self.backup.dir.as_path());

        for root in &self.paths.scan_roots {
            if root.is_absolute() || escapes(root) {
                return Err(ConfigError::Invalid(format!(
                    "scan root '{}' must be relative to the boundary root",
                    root.display()
                )));
            }
            // a boundary-wide root is fine, the walker skips the quarantine
            let scan_root = anchor(root.as_path());
            if scan_root != boundary && backup_dir.starts_with(&scan_root) {
                return Err(ConfigError::Invalid(format!(
                    "backup dir '{}' must not be inside scan root '{}'",
                    self.backup.dir.display(),
                    root.display()
                )));
            }
        }
        if self.scan.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if self.scan.max_files == 0 {
            return Err(ConfigError::Invalid("max_files must be at least 1".into()));
        }
        for pattern in &self.protection.extra_patterns {
            regex::Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

fn escapes(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}
