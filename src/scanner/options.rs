use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Default hard cap on nesting below each scan root.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Default soft cap on files visited per scan.
pub const DEFAULT_MAX_FILES: usize = 100_000;

/// Configuration options for a tree scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Roots to walk, relative to the boundary root
    pub roots: Vec<PathBuf>,

    /// Substrings that exclude a path and its subtree
    pub exclude_patterns: Vec<String>,

    /// Directories never walked (own install dir, backup quarantine)
    pub skip_dirs: Vec<PathBuf>,

    /// Files must be older than this to count as old
    pub min_age: Duration,

    /// Maximum depth to recurse below each root
    pub max_depth: usize,

    /// Stop after visiting this many files
    pub max_files: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            exclude_patterns: vec![],
            skip_dirs: vec![],
            min_age: Duration::from_secs(30 * 86_400),
            max_depth: DEFAULT_MAX_DEPTH,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

impl ScanOptions {
    /// Create a new ScanOptions with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Options described by `config`.
    ///
    /// Skip dirs stay as configured; the scanner anchors relative ones at
    /// the canonical boundary root.
    pub fn from_config(config: &Config) -> Self {
        let mut skip_dirs = vec![config.backup.dir.clone()];
        skip_dirs.extend(config.paths.self_dir.clone());

        Self {
            roots: config.paths.scan_roots.clone(),
            exclude_patterns: config.paths.exclude_patterns.clone(),
            skip_dirs,
            min_age: config.scan.min_age(),
            max_depth: config.scan.max_depth,
            max_files: config.scan.max_files,
        }
    }

    /// Set scan roots
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    /// Set exclusion substrings
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Add a directory that is never walked
    pub fn with_skip_dir(mut self, dir: PathBuf) -> Self {
        self.skip_dirs.push(dir);
        self
    }

    /// Set minimum age
    pub fn with_min_age(mut self, age: Duration) -> Self {
        self.min_age = age;
        self
    }

    /// Set maximum recursion depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set soft file cap
    pub fn with_max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    /// Check if a path string contains an exclusion substring
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|p| !p.is_empty() && path.contains(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = ScanOptions::default();
        assert_eq!(opts.max_depth, 20);
        assert_eq!(opts.max_files, 100_000);
        assert!(opts.exclude_patterns.is_empty());
        assert!(opts.skip_dirs.is_empty());
    }

    #[test]
    fn test_scan_options_builder() {
        let opts = ScanOptions::new()
            .with_max_depth(5)
            .with_max_files(10)
            .with_min_age(Duration::from_secs(60));

        assert_eq!(opts.max_depth, 5);
        assert_eq!(opts.max_files, 10);
        assert_eq!(opts.min_age, Duration::from_secs(60));
    }

    #[test]
    fn test_exclusion_is_substring() {
        let opts = ScanOptions::new().with_exclude(vec!["node_modules".into(), String::new()]);
        assert!(opts.is_excluded("/site/uploads/node_modules/x.js"));
        assert!(!opts.is_excluded("/site/uploads/photo.jpg"));
    }

    #[test]
    fn test_from_config_skips_quarantine() {
        let mut config = Config::default();
        config.paths.boundary_root = PathBuf::from("./site");
        config.paths.self_dir = Some(PathBuf::from("tools/rootsweep"));

        let opts = ScanOptions::from_config(&config);
        assert_eq!(opts.roots.len(), 4);
        // relative to the boundary, never joined onto it here
        assert_eq!(
            opts.skip_dirs,
            vec![
                PathBuf::from("wp-content/rootsweep-backups"),
                PathBuf::from("tools/rootsweep"),
            ]
        );
    }

    #[test]
    fn test_from_config_keeps_absolute_skip_dirs() {
        let mut config = Config::default();
        config.backup.dir = PathBuf::from("/var/quarantine");

        let opts = ScanOptions::from_config(&config);
        assert_eq!(opts.skip_dirs, vec![PathBuf::from("/var/quarantine")]);
    }
}
