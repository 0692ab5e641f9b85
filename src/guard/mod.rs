//! Protection rules deciding what may never be deleted.
//!
//! The guard fails safe: a path that cannot be resolved, or that resolves
//! outside the boundary root, is always protected.

mod paths;
pub mod rules;

pub use paths::{normalize_lexically, resolve_best_effort, slash_relative};

use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::Config;
use crate::error::{ConfigError, Result, SweepError};

/// Why a path is protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protection {
    /// The path does not canonicalize.
    Unresolvable,
    /// The canonical path is not strictly inside the boundary root.
    OutsideBoundary,
    /// Equal to or nested under a protected path.
    ProtectedPath(PathBuf),
    /// Part of a currently active deployment unit.
    ActiveUnit(PathBuf),
    /// Matches a protected pattern.
    Pattern(String),
    /// Inside the uploads area and modified within the recency window.
    RecentUpload,
}

impl Protection {
    /// Critical protection hides a path from classification altogether.
    pub fn is_critical(&self) -> bool {
        !matches!(self, Protection::RecentUpload)
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protection::Unresolvable => write!(f, "path cannot be resolved"),
            Protection::OutsideBoundary => write!(f, "path is outside the boundary root"),
            Protection::ProtectedPath(p) => write!(f, "protected path {}", p.display()),
            Protection::ActiveUnit(p) => write!(f, "active deployment unit {}", p.display()),
            Protection::Pattern(p) => write!(f, "matches protected pattern {p}"),
            Protection::RecentUpload => write!(f, "recent upload"),
        }
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    compiled: Regex,
}

impl Pattern {
    fn compile(source: &str) -> std::result::Result<Self, ConfigError> {
        let compiled = Regex::new(source).map_err(|e| ConfigError::Pattern {
            pattern: source.to_string(),
            source: e,
        })?;
        Ok(Self {
            source: source.to_string(),
            compiled,
        })
    }
}

/// Decides whether files and directories may be deleted.
#[derive(Debug, Clone)]
pub struct PathGuard {
    boundary: PathBuf,
    protected_paths: Vec<PathBuf>,
    active_units: Vec<PathBuf>,
    patterns: Vec<Pattern>,
    content_patterns: Vec<Pattern>,
    uploads_dir: Option<PathBuf>,
    recent_window: Duration,
}

impl PathGuard {
    /// Create a guard with the built-in rules for `boundary`.
    ///
    /// Fails only if the boundary root itself cannot be resolved.
    pub fn new(boundary: &Path) -> Result<Self> {
        let boundary = boundary
            .canonicalize()
            .map_err(|source| SweepError::BoundaryUnresolvable {
                path: boundary.to_path_buf(),
                source,
            })?;

        let mut guard = Self {
            protected_paths: Vec::new(),
            active_units: Vec::new(),
            patterns: Vec::new(),
            content_patterns: Vec::new(),
            uploads_dir: None,
            recent_window: Duration::ZERO,
            boundary,
        };

        for rel in rules::RUNTIME_PATHS {
            guard = guard.with_protected_path(Path::new(rel));
        }
        for pattern in rules::PROTECTED_PATTERNS {
            guard = guard.with_pattern(pattern)?;
        }
        for pattern in rules::CONTENT_PATTERNS {
            guard.content_patterns.push(Pattern::compile(pattern)?);
        }
        Ok(guard)
    }

    /// Build the guard described by `config`, including the backup quarantine.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut guard = Self::new(&config.paths.boundary_root)?;
        let protection = &config.protection;

        for path in &protection.extra_paths {
            guard = guard.with_protected_path(path);
        }
        for unit in &protection.active_units {
            guard = guard.with_active_unit(unit);
        }
        for pattern in &protection.extra_patterns {
            guard = guard.with_pattern(pattern)?;
        }
        guard = guard
            .with_protected_path(&config.backup.dir)
            .with_uploads(&protection.uploads_dir, protection.recent_window());

        tracing::debug!(
            boundary = %guard.boundary.display(),
            paths = guard.protected_paths.len(),
            units = guard.active_units.len(),
            patterns = guard.patterns.len(),
            "Protection rules loaded"
        );
        Ok(guard)
    }

    /// Add a protected path (relative to the boundary root, or absolute).
    pub fn with_protected_path(mut self, path: &Path) -> Self {
        let anchored = self.anchor(path);
        self.protected_paths.push(anchored);
        self
    }

    /// Add an active deployment unit directory.
    pub fn with_active_unit(mut self, path: &Path) -> Self {
        let anchored = self.anchor(path);
        self.active_units.push(anchored);
        self
    }

    /// Add a protected regex pattern.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.patterns.push(Pattern::compile(pattern)?);
        Ok(self)
    }

    /// Protect files under `dir` modified within `window`.
    pub fn with_uploads(mut self, dir: &Path, window: Duration) -> Self {
        self.uploads_dir = Some(self.anchor(dir));
        self.recent_window = window;
        self
    }

    /// Canonical boundary root.
    pub fn boundary(&self) -> &Path {
        &self.boundary
    }

    pub fn protected_paths(&self) -> &[PathBuf] {
        &self.protected_paths
    }

    pub fn active_units(&self) -> &[PathBuf] {
        &self.active_units
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.source.as_str())
    }

    /// True if `canonical` lies strictly inside the boundary root.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical != self.boundary && canonical.starts_with(&self.boundary)
    }

    pub fn is_protected(&self, path: &Path) -> bool {
        self.protection(path).is_some()
    }

    /// First rule that protects `path`, critical reasons first.
    pub fn protection(&self, path: &Path) -> Option<Protection> {
        let Ok(canonical) = path.canonicalize() else {
            return Some(Protection::Unresolvable);
        };
        if !self.contains(&canonical) {
            return Some(Protection::OutsideBoundary);
        }
        if let Some(p) = self.protected_paths.iter().find(|p| canonical.starts_with(p)) {
            return Some(Protection::ProtectedPath(p.clone()));
        }
        if let Some(unit) = self.active_units.iter().find(|u| canonical.starts_with(u)) {
            return Some(Protection::ActiveUnit(unit.clone()));
        }
        if let Some(pattern) = self.matching_pattern(&canonical) {
            return Some(Protection::Pattern(pattern.to_string()));
        }
        if self.is_recent_upload(&canonical) {
            return Some(Protection::RecentUpload);
        }
        None
    }

    /// True if the directory is, contains, or is contained by a protected path.
    pub fn is_protected_directory(&self, dir: &Path) -> bool {
        let Ok(canonical) = dir.canonicalize() else {
            return true;
        };
        if !self.contains(&canonical) {
            return true;
        }
        self.protected_paths
            .iter()
            .chain(&self.active_units)
            .any(|p| canonical.starts_with(p) || p.starts_with(&canonical))
    }

    /// True if the file name marks content that is never a cleanup candidate.
    pub fn is_content_protected(&self, path: &Path) -> bool {
        let name = file_name(path);
        self.content_patterns
            .iter()
            .any(|p| p.compiled.is_match(&name))
    }

    fn matching_pattern(&self, canonical: &Path) -> Option<&str> {
        let name = file_name(canonical);
        let relative = slash_relative(canonical, &self.boundary).unwrap_or_default();
        self.patterns
            .iter()
            .find(|p| p.compiled.is_match(&name) || p.compiled.is_match(&relative))
            .map(|p| p.source.as_str())
    }

    fn is_recent_upload(&self, canonical: &Path) -> bool {
        let Some(uploads) = &self.uploads_dir else {
            return false;
        };
        if !canonical.starts_with(uploads) {
            return false;
        }
        let Ok(metadata) = fs::metadata(canonical) else {
            return true;
        };
        if !metadata.is_file() {
            return false;
        }
        match metadata.modified().map(|m| SystemTime::now().duration_since(m)) {
            Ok(Ok(age)) => age < self.recent_window,
            // unreadable or future mtime
            _ => true,
        }
    }

    fn anchor(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            resolve_best_effort(path)
        } else {
            resolve_best_effort(&self.boundary.join(path))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
